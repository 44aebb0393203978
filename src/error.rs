//! Fatal heap conditions.
//!
//! Both variants are mutator-side contract violations with no recoverable
//! meaning at the point they occur, but both are surfaced as a `Result`
//! rather than a bare panic so an embedder gets to decide how to react
//! (log and abort, translate to its own error type, ...); the crate's own
//! demo binaries map either one to the documented `exit(12)` at the process
//! boundary via [`GcError::exit_fatal`]. `RootRegistry::push` still panics
//! directly when called through the convenience `push` entry point — use
//! `RootRegistry::try_push` (and `HeapManager::try_push_root`) to get the
//! `RootStackOverflow` variant back as a value instead.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GcError {
    /// The requested allocation did not fit even after a collection ran.
    HeapExhausted {
        requested: usize,
        residency: usize,
        heap_size: usize,
    },
    /// `push_root` was called with `max_roots` roots already registered.
    RootStackOverflow { capacity: usize },
}

impl fmt::Display for GcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcError::HeapExhausted {
                requested,
                residency,
                heap_size,
            } => write!(
                f,
                "out of memory: could not allocate {} bytes ({} bytes live of {} byte heap)",
                requested, residency, heap_size
            ),
            GcError::RootStackOverflow { capacity } => write!(
                f,
                "root stack overflow: more than {} simultaneously-live roots registered",
                capacity
            ),
        }
    }
}

impl std::error::Error for GcError {}

impl GcError {
    /// Prints a diagnostic line and exits the process with the documented
    /// code 12.
    ///
    /// This is the one place in the crate that terminates the process; it is
    /// never called internally by [`crate::heap::HeapManager::alloc`], which
    /// returns the error instead so embedders can choose their own policy.
    pub fn exit_fatal(&self) -> ! {
        eprintln!("[GC] {}", self);
        std::process::exit(12);
    }
}
