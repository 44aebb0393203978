//! Object header encoding.
//!
//! A Stella heap object is a header word followed by `field_count` reference-
//! sized slots (see [`crate::object`]). The header packs the field count the
//! mutator wrote at allocation time alongside a spare tag byte the object
//! printer is free to use to distinguish shapes; the collector itself never
//! looks at the tag.
//!
//! +-----------------+------+------------------------------------------+
//! | name            | bits |                                          |
//! +-----------------+------+------------------------------------------+
//! | padding         |   32 | Only present on 64-bit platforms.        |
//! +-----------------+------+------------------------------------------+
//! | field_count     |   24 | Bounded by [`ObjectHeader::MAX_FIELDS`]. |
//! | tag             |    8 | Free for the mutator/object printer.     |
//! +-----------------+------+------------------------------------------+

use modular_bitfield::prelude::*;

#[bitfield(bits = 32)]
#[derive(Clone, Copy)]
struct EncodedHeader {
    field_count: B24,
    tag: B8,
}

/// A one-word object header. Same width as a reference slot on the target
/// pointer width, so `size_of::<ObjectHeader>()` can stand in for "header
/// size" in [`crate::object::ObjectHandle::size_of`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ObjectHeader {
    #[cfg(target_pointer_width = "64")]
    _padding: u32,
    encoded: EncodedHeader,
}

impl ObjectHeader {
    /// Largest field count a header can represent. A mutator-produced object
    /// exceeding this is a code-generation bug, not a runtime condition.
    pub const MAX_FIELDS: u32 = (1 << 24) - 1;

    pub fn new(field_count: u32, tag: u8) -> Self {
        assert!(
            field_count <= Self::MAX_FIELDS,
            "stella-gc: object field count {} exceeds header capacity",
            field_count
        );
        let mut encoded = EncodedHeader::new();
        encoded.set_field_count(field_count);
        encoded.set_tag(tag);
        Self {
            #[cfg(target_pointer_width = "64")]
            _padding: 0,
            encoded,
        }
    }

    #[inline(always)]
    pub fn field_count(self) -> u32 {
        self.encoded.field_count()
    }

    #[inline(always)]
    pub fn tag(self) -> u8 {
        self.encoded.tag()
    }
}
