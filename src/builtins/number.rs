//! Integer arithmetic and numeric comparison
//!
//! Arithmetic wraps on overflow.

use std::cmp::Ordering;

use super::arguments;
use crate::error::Result;
use crate::gc::Heap;
use crate::value::Handle;

fn integers(heap: &Heap, argv: Handle) -> Result<Vec<i64>> {
    arguments(heap, argv)?
        .into_iter()
        .map(|arg| heap.integer(arg))
        .collect()
}

/// `(+ n ...)`
pub fn add(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let sum = integers(heap, argv)?
        .into_iter()
        .fold(0i64, i64::wrapping_add);
    heap.create_integer(sum)
}

/// `(- n)` negates, `(- n m ...)` subtracts the rest from the first
pub fn subtract(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let values = integers(heap, argv)?;
    let result = match values.as_slice() {
        [n] => n.wrapping_neg(),
        [first, rest @ ..] => rest.iter().fold(*first, |acc, &n| acc.wrapping_sub(n)),
        [] => 0,
    };
    heap.create_integer(result)
}

/// `(* n ...)`
pub fn multiply(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let product = integers(heap, argv)?
        .into_iter()
        .fold(1i64, i64::wrapping_mul);
    heap.create_integer(product)
}

/// `(= a b ...)`: true when every argument is numerically equal to the first
pub fn numeric_equal(heap: &mut Heap, argv: Handle) -> Result<Handle> {
    let args = arguments(heap, argv)?;
    let mut equal = true;
    if let Some((&first, rest)) = args.split_first() {
        for &arg in rest {
            if heap.compare_numbers(first, arg)? != Ordering::Equal {
                equal = false;
                break;
            }
        }
        if rest.is_empty() {
            heap.compare_numbers(first, first)?;
        }
    }
    heap.boolean(equal)
}
