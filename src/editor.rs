use tracing::trace;

use crate::page::{ChangeEvent, PageElement};

fn announce(target: &dyn PageElement) {
    target.notify(ChangeEvent::Input);
    target.notify(ChangeEvent::Change);
}

/// Append one character to `target` as if it had been typed.
///
/// Returns `false` (and touches nothing) when the target is detached.
pub fn insert_char(target: &dyn PageElement, c: char) -> bool {
    if !target.is_connected() {
        return false;
    }

    if target.kind().is_value_based() {
        let mut value = target.value();
        value.push(c);
        target.set_value(&value);
    } else {
        let mut buf = [0u8; 4];
        let text = c.encode_utf8(&mut buf);
        if !target.insert_at_caret(text) {
            trace!("no selection in editable region; appending");
            target.append_text(text);
        }
    }

    announce(target);
    true
}

/// Delete exactly one trailing character from `target`.
pub fn remove_last_char(target: &dyn PageElement) -> bool {
    if !target.is_connected() {
        return false;
    }

    if target.kind().is_value_based() || !target.delete_before_caret() {
        let mut value = target.value();
        value.pop();
        target.set_value(&value);
    }

    announce(target);
    true
}
