//! Garbage collector module
//!
//! lilscheme uses a stop-the-world copying collector over a handle-indirected
//! heap. Code outside this module only ever holds handles, so objects are free
//! to move on every collection.
//!
//! What the collector needs from everyone else:
//! - anything reachable only from a Rust local must be retained across any
//!   call that may allocate (see [`Heap::protecting`])
//! - handle fields of heap objects always name live objects, which the typed
//!   setters in [`crate::object`] check

mod allocator;
mod collector;
mod roots;

pub use allocator::{DEFAULT_ARENA_CAPACITY, Heap, HeapConfig, MAX_HANDLES, MemoryStats};
pub use collector::GcStats;
pub use roots::RootSet;

use crate::error::Result;

impl Heap {
    /// Run garbage collection
    ///
    /// Returns `None` when collection is currently disabled.
    pub fn collect(&mut self) -> Result<Option<GcStats>> {
        collector::collect(self)
    }
}
