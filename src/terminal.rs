use std::cell::RefCell;
use std::io::Write;

use tracing::debug;

use crate::page::{ChangeEvent, ElementKind, PageElement};

/// A plain field that echoes every edit to a terminal-like writer.
pub struct TerminalField<W: Write> {
    value: RefCell<String>,
    out: RefCell<W>,
}

impl<W: Write> TerminalField<W> {
    pub fn new(out: W) -> Self {
        Self {
            value: RefCell::new(String::new()),
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, bytes: &[u8]) {
        let mut out = self.out.borrow_mut();
        if let Err(err) = out.write_all(bytes).and_then(|_| out.flush()) {
            debug!(%err, "terminal write failed");
        }
    }
}

impl<W: Write> PageElement for TerminalField<W> {
    fn kind(&self) -> ElementKind {
        ElementKind::TextArea
    }

    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: &str) {
        let mut current = self.value.borrow_mut();
        if let Some(added) = value.strip_prefix(current.as_str()) {
            self.emit(added.as_bytes());
        } else if let Some(removed) = current.strip_prefix(value) {
            // Erase in place; a line break cannot be taken back.
            if !removed.contains('\n') {
                self.emit("\x08 \x08".repeat(removed.chars().count()).as_bytes());
            }
        } else {
            self.emit(format!("\n{value}").as_bytes());
        }
        *current = value.to_string();
    }

    fn insert_at_caret(&self, _text: &str) -> bool {
        false
    }

    fn delete_before_caret(&self) -> bool {
        false
    }

    fn append_text(&self, text: &str) {
        let value = format!("{}{text}", self.value.borrow());
        self.set_value(&value);
    }

    fn notify(&self, _event: ChangeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{insert_char, remove_last_char};
    use pretty_assertions::assert_eq;

    #[test]
    fn echoes_inserts_and_erases() {
        let field = TerminalField::new(Vec::new());
        insert_char(&field, 'h');
        insert_char(&field, 'x');
        remove_last_char(&field);
        insert_char(&field, 'i');
        assert_eq!(field.value(), "hi");
        assert_eq!(
            String::from_utf8(field.into_inner()).unwrap(),
            "hx\x08 \x08i"
        );
    }

    #[test]
    fn line_breaks_are_not_erased() {
        let field = TerminalField::new(Vec::new());
        field.set_value("a\n");
        field.set_value("a");
        assert_eq!(field.value(), "a");
        assert_eq!(String::from_utf8(field.into_inner()).unwrap(), "a\n");
    }
}
