//! # Ports
//!
//! The index stores no text. Callers that want the order-preservation bonus
//! hand in a `LineProvider` that returns the text behind a pointer.

use crate::domain::line_pointer::LinePointer;

pub trait LineProvider {
    /// Text of the pointed line, `None` when the document is gone.
    fn line(&self, pointer: &LinePointer) -> Option<String>;
}

impl<F> LineProvider for F
where
    F: Fn(&LinePointer) -> Option<String>,
{
    fn line(&self, pointer: &LinePointer) -> Option<String> {
        self(pointer)
    }
}
