//! The slice of a host page the typing core touches.
//!
//! A real host (wasm glue over the DOM, a terminal, ...) implements
//! [`PageElement`] and [`Page`]. [`MemoryElement`] and [`MemoryPage`] are the
//! in-process implementations used by the simulator and tests.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Search,
    Email,
    Url,
    Tel,
    Password,
    Number,
    Checkbox,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Input(InputType),
    TextArea,
    ContentEditable,
    /// Buttons, links, the overlay itself.
    Other,
}

impl ElementKind {
    pub fn is_eligible(self) -> bool {
        match self {
            ElementKind::Input(ty) => matches!(
                ty,
                InputType::Text
                    | InputType::Search
                    | InputType::Email
                    | InputType::Url
                    | InputType::Tel
                    | InputType::Password
            ),
            ElementKind::TextArea | ElementKind::ContentEditable => true,
            ElementKind::Other => false,
        }
    }

    /// Plain fields are edited through their value; rich regions through the caret.
    pub fn is_value_based(self) -> bool {
        matches!(self, ElementKind::Input(_) | ElementKind::TextArea)
    }
}

/// Synthetic notifications fired after a programmatic edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Input,
    Change,
}

pub trait PageElement {
    fn kind(&self) -> ElementKind;

    fn is_connected(&self) -> bool {
        true
    }

    /// Current value (plain fields) or text content (rich regions).
    fn value(&self) -> String;

    fn set_value(&self, value: &str);

    /// Insert at the current selection and collapse it after the text.
    /// Returns `false` when the region has no selection.
    fn insert_at_caret(&self, text: &str) -> bool;

    /// Delete one character before the caret. Returns `false` without a selection.
    fn delete_before_caret(&self) -> bool;

    /// Append through the host's own editing command (the no-selection fallback).
    fn append_text(&self, text: &str);

    /// Observer hook so page code bound to the field sees the edit.
    fn notify(&self, event: ChangeEvent);
}

pub type ElementRef = Rc<dyn PageElement>;
pub type WeakElementRef = Weak<dyn PageElement>;

pub fn same_element(a: &ElementRef, b: &WeakElementRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), b.as_ptr())
}

/// Source of the currently focused element.
pub trait Page {
    fn active_element(&self) -> Option<ElementRef>;
}

#[derive(Debug, Default)]
struct Field {
    buf: Vec<char>,
    caret: Option<usize>,
}

/// An in-memory field that records the notifications it receives.
#[derive(Debug)]
pub struct MemoryElement {
    kind: ElementKind,
    field: RefCell<Field>,
    connected: Cell<bool>,
    events: RefCell<Vec<ChangeEvent>>,
}

impl MemoryElement {
    pub fn new(kind: ElementKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            field: RefCell::new(Field::default()),
            connected: Cell::new(true),
            events: RefCell::new(Vec::new()),
        })
    }

    pub fn text_input() -> Rc<Self> {
        Self::new(ElementKind::Input(InputType::Text))
    }

    pub fn textarea() -> Rc<Self> {
        Self::new(ElementKind::TextArea)
    }

    /// A rich editable region with the caret placed at the end of its content.
    pub fn content_editable() -> Rc<Self> {
        let el = Self::new(ElementKind::ContentEditable);
        el.field.borrow_mut().caret = Some(0);
        el
    }

    pub fn button() -> Rc<Self> {
        Self::new(ElementKind::Other)
    }

    pub fn with_value(self: Rc<Self>, value: &str) -> Rc<Self> {
        {
            let mut field = self.field.borrow_mut();
            field.buf = value.chars().collect();
            if field.caret.is_some() {
                field.caret = Some(field.buf.len());
            }
        }
        self
    }

    pub fn set_caret(&self, caret: Option<usize>) {
        let mut field = self.field.borrow_mut();
        field.caret = caret.map(|c| c.min(field.buf.len()));
    }

    pub fn caret(&self) -> Option<usize> {
        self.field.borrow().caret
    }

    pub fn detach(&self) {
        self.connected.set(false);
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.borrow().clone()
    }
}

impl PageElement for MemoryElement {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn value(&self) -> String {
        self.field.borrow().buf.iter().collect()
    }

    fn set_value(&self, value: &str) {
        let mut field = self.field.borrow_mut();
        field.buf = value.chars().collect();
        if field.caret.is_some() {
            field.caret = Some(field.buf.len());
        }
    }

    fn insert_at_caret(&self, text: &str) -> bool {
        let mut field = self.field.borrow_mut();
        let Some(mut caret) = field.caret else {
            return false;
        };
        for c in text.chars() {
            field.buf.insert(caret, c);
            caret += 1;
        }
        field.caret = Some(caret);
        true
    }

    fn delete_before_caret(&self) -> bool {
        let mut field = self.field.borrow_mut();
        let Some(caret) = field.caret else {
            return false;
        };
        if caret > 0 {
            field.buf.remove(caret - 1);
            field.caret = Some(caret - 1);
        }
        true
    }

    fn append_text(&self, text: &str) {
        let mut field = self.field.borrow_mut();
        field.buf.extend(text.chars());
        field.caret = Some(field.buf.len());
    }

    fn notify(&self, event: ChangeEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// A page whose focus is moved explicitly.
#[derive(Clone, Default)]
pub struct MemoryPage {
    focused: Rc<RefCell<Option<ElementRef>>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus, returning the element that lost it.
    pub fn set_focus(&self, element: Option<ElementRef>) -> Option<ElementRef> {
        std::mem::replace(&mut *self.focused.borrow_mut(), element)
    }
}

impl Page for MemoryPage {
    fn active_element(&self) -> Option<ElementRef> {
        self.focused.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_matches_text_like_fields() {
        for ty in [
            InputType::Text,
            InputType::Search,
            InputType::Email,
            InputType::Url,
            InputType::Tel,
            InputType::Password,
        ] {
            assert!(ElementKind::Input(ty).is_eligible(), "{ty:?}");
        }
        assert!(!ElementKind::Input(InputType::Number).is_eligible());
        assert!(!ElementKind::Input(InputType::Checkbox).is_eligible());
        assert!(ElementKind::TextArea.is_eligible());
        assert!(ElementKind::ContentEditable.is_eligible());
        assert!(!ElementKind::Other.is_eligible());
    }

    #[test]
    fn identity_is_by_allocation() {
        let a: ElementRef = MemoryElement::text_input();
        let b: ElementRef = MemoryElement::text_input();
        let weak_a = Rc::downgrade(&a);
        assert!(same_element(&a, &weak_a));
        assert!(!same_element(&b, &weak_a));
    }

    #[test]
    fn caret_edits_in_the_middle() {
        let el = MemoryElement::content_editable().with_value("held");
        el.set_caret(Some(3));
        assert!(el.insert_at_caret("l"));
        assert_eq!(el.value(), "helld");
        assert_eq!(el.caret(), Some(4));
        assert!(el.delete_before_caret());
        assert_eq!(el.value(), "held");
    }

    #[test]
    fn page_reports_focus() {
        let page = MemoryPage::new();
        assert!(page.active_element().is_none());
        let el: ElementRef = MemoryElement::textarea();
        assert!(page.set_focus(Some(el.clone())).is_none());
        let active = page.active_element().unwrap();
        assert!(same_element(&active, &Rc::downgrade(&el)));
    }
}
