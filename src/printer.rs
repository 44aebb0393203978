//! The Rust seam for the external `print_stella_object` collaborator.
//!
//! The generated mutator owns object shapes and therefore knows how to
//! render them meaningfully (constructor tags, unboxed payloads, and so on);
//! this crate only knows field counts. `HeapManager` is generic over an
//! `ObjectPrinter` rather than calling a hardcoded free function, since Rust
//! has no equivalent of a weakly-linked external C symbol.

use crate::object::ObjectHandle;
use std::fmt;

pub trait ObjectPrinter {
    /// Renders one heap object for `print_gc_state`'s dump.
    fn print_stella_object(&self, obj: ObjectHandle, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Fallback printer used when no mutator-supplied printer is configured:
/// renders an object as its address, tag byte, and raw field words. Good
/// enough for tests and for embedding a heap before a real object model
/// exists; not meant to replace a real `print_stella_object`.
pub struct RawFieldPrinter;

impl ObjectPrinter for RawFieldPrinter {
    fn print_stella_object(&self, obj: ObjectHandle, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "<obj tag={} fields=[", obj.header().tag())?;
        for i in 0..obj.field_count() {
            if i > 0 {
                write!(out, ", ")?;
            }
            write!(out, "{:#x}", obj.field(i))?;
        }
        write!(out, "]>")
    }
}
