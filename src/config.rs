//! Build-time configuration, made runtime-constructible.
//!
//! `gc.c` names three knobs as build-time constants (`MAX_HEAP_SIZE`,
//! `MAX_GC_ROOTS`, `DUMP_GC_STATE_ON_GC`). This crate keeps their defaults
//! but exposes them through a plain-data config struct instead, so more than
//! one independent heap can exist in a process with different settings.

/// Per-region heap capacity in bytes. Both `from` and `to` are this size.
pub const DEFAULT_HEAP_SIZE: usize = 1600;

/// Maximum number of simultaneously-live roots.
pub const DEFAULT_MAX_ROOTS: usize = 1024;

#[derive(Clone, Copy, Debug)]
pub struct GcConfig {
    /// Capacity in bytes of each of `from` and `to`.
    pub heap_size: usize,
    /// Maximum depth of the root stack.
    pub max_roots: usize,
    /// When set, [`crate::heap::HeapManager`] dumps heap state at the start
    /// and end of every collection, mirroring `gc.c`'s
    /// `STELLA_DUMP_GC_STATE_ON_GC` compile-time toggle.
    pub dump_state_on_gc: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            heap_size: DEFAULT_HEAP_SIZE,
            max_roots: DEFAULT_MAX_ROOTS,
            dump_state_on_gc: false,
        }
    }
}

impl GcConfig {
    pub fn with_heap_size(mut self, heap_size: usize) -> Self {
        self.heap_size = heap_size;
        self
    }

    pub fn with_max_roots(mut self, max_roots: usize) -> Self {
        self.max_roots = max_roots;
        self
    }

    pub fn with_dump_state_on_gc(mut self, dump: bool) -> Self {
        self.dump_state_on_gc = dump;
        self
    }

    /// An upper bound on a single object's field count: no well-formed
    /// object can have more fields than would fill the entire region by
    /// itself. Used only for the debug-build corrupted-heap-walk check in
    /// [`crate::heap::HeapManager`]; not a hard limit enforced at
    /// allocation time.
    pub fn max_fields_per_object(&self) -> usize {
        self.heap_size / std::mem::size_of::<crate::object::Word>()
    }
}
