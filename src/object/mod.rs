//! Object layer
//!
//! Typed constructors and accessors over the raw heap:
//! - Numbers (integers, floats, mixed comparison)
//! - Pairs, proper lists and association lists
//! - Symbols and the global binding table
//! - Vectors and byte-buffers, including in-place growth
//! - Functions and primitives
//! - The printer and the heap object report
//!
//! Everything here is an `impl Heap` block. Setters that store a handle into
//! a field check that the handle names a live object, so the collector never
//! meets a dangling field.

pub mod display;
pub mod function;
pub mod number;
pub mod pair;
pub mod symbol;
pub mod vector;

pub use display::MAX_DISPLAY_DEPTH;
