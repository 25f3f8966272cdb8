//! Pair primitives, identity and type inspection

use crate::error::Result;
use crate::gc::Heap;
use crate::value::Handle;

fn two(heap: &Heap, argv: Handle) -> Result<(Handle, Handle)> {
    Ok((heap.vector_ref(argv, 0)?, heap.vector_ref(argv, 1)?))
}

/// `(eq? a b)`: same object
pub fn eq(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let (a, b) = two(heap, argv)?;
    heap.boolean(a == b)
}

/// `(eqv? a b)`: same object, or numerically equal numbers
pub fn eqv(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let (a, b) = two(heap, argv)?;
    let same = heap.equivalent(a, b)?;
    heap.boolean(same)
}

pub fn cons(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let (first, rest) = two(heap, argv)?;
    heap.cons(first, rest)
}

pub fn car(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let pair = heap.vector_ref(argv, 0)?;
    heap.first(pair)
}

pub fn cdr(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let pair = heap.vector_ref(argv, 0)?;
    heap.rest(pair)
}

/// `(set-car! pair value)`, returning the value
pub fn set_car(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let (pair, value) = two(heap, argv)?;
    heap.set_first(pair, value)?;
    Ok(value)
}

/// `(set-cdr! pair value)`, returning the value
pub fn set_cdr(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let (pair, value) = two(heap, argv)?;
    heap.set_rest(pair, value)?;
    Ok(value)
}

/// `(type-of x)`: the type name as a symbol
pub fn type_of(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let value = heap.vector_ref(argv, 0)?;
    let name = heap.type_of(value)?.name();
    heap.intern(name)
}
