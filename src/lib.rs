//! Runtime heap manager for a small functional language evaluator.
//!
//! This crate implements the allocator and garbage collector consumed by
//! generated mutator code: a semi-space copying collector (Cheney's
//! algorithm with Wegbreit's "chase" optimization) with an explicit root
//! stack that the mutator pushes and pops around scopes.
//!
//! The object printer and the generated mutator itself are external
//! collaborators — this crate exposes [`printer::ObjectPrinter`] as the seam
//! for the former and a handful of address-based operations
//! ([`heap::HeapManager::alloc`], [`heap::HeapManager::push_root`], ...) for
//! the latter, but implements neither.
//!
//! ```
//! use stella_gc::{GcConfig, HeapManager};
//!
//! let mut heap = HeapManager::with_config(GcConfig::default().with_heap_size(256));
//! let addr = heap.alloc(16).unwrap();
//! // The mutator would now write a header and fields into `addr`.
//! let _ = addr;
//! ```

pub mod config;
pub mod error;
pub mod header;
pub mod heap;
pub mod object;
pub mod printer;
pub mod region;
pub mod roots;
pub mod stats;

pub use config::GcConfig;
pub use error::GcError;
pub use header::ObjectHeader;
pub use heap::HeapManager;
pub use object::{ObjectHandle, Word};
pub use printer::{ObjectPrinter, RawFieldPrinter};
pub use roots::RootSlot;
