//! lilscheme - a small Scheme runtime core
//!
//! A handle-indirected heap with a copying collector, and a bytecode VM with
//! heap-allocated activation records and lexical closures. The reader and
//! compiler live outside this crate; they hand the VM function objects in the
//! format produced by [`vm::FunctionBuilder`].
//!
//! # Features
//! - Stable 16-bit handles; objects move on every collection
//! - Cheney copying collector with explicit retain/unretain roots
//! - Stack-based bytecode VM with one-byte operands
//! - Closures that capture their defining context by reference
//!
//! # Example
//! ```ignore
//! use lilscheme::{HeapConfig, Runtime};
//! use lilscheme::vm::FunctionBuilder;
//!
//! let mut rt = Runtime::new(HeapConfig::default())?;
//! let heap = rt.heap_mut();
//! let mut b = FunctionBuilder::new(heap, 0, 0)?;
//! let two = heap.create_integer(2)?;
//! b.literal(heap, two)?;
//! let one = heap.create_integer(1)?;
//! b.literal(heap, one)?;
//! b.global(heap, "+")?;
//! b.apply(heap, 2)?;
//! let f = b.finish(heap)?;
//! let result = rt.execute(f, &[])?;
//! assert_eq!(rt.heap().integer(result)?, 3);
//! ```

// Core modules
pub mod error;
pub mod value;

// Garbage collector
pub mod gc;

// Typed object operations
pub mod object;

// Virtual machine
pub mod vm;

// Primitive procedures
pub mod builtins;

// Runtime instance
pub mod runtime;

// Re-export main types
pub use error::{Error, Result};
pub use gc::{Heap, HeapConfig};
pub use runtime::Runtime;
pub use value::{Handle, Object, ObjectType};
