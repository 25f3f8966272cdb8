//! Built-in primitive procedures
//!
//! Each primitive receives its arguments as a vector in source order. Truth
//! is the symbol `t` and falsehood is nil.

pub mod list;
pub mod number;

use tracing::debug;

use crate::error::Result;
use crate::gc::Heap;
use crate::value::{Arity, Handle, PrimitiveFn};

/// Table entry for one primitive
#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    pub arity: Arity,
    pub procedure: PrimitiveFn,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, arity: Arity, procedure: PrimitiveFn) -> Self {
        Self {
            name,
            arity,
            procedure,
        }
    }
}

/// Every primitive installed into a fresh runtime
pub const PRIMITIVES: &[PrimitiveDesc] = &[
    PrimitiveDesc::new("+", Arity::AtLeast(0), number::add),
    PrimitiveDesc::new("-", Arity::AtLeast(1), number::subtract),
    PrimitiveDesc::new("*", Arity::AtLeast(0), number::multiply),
    PrimitiveDesc::new("=", Arity::AtLeast(1), number::numeric_equal),
    PrimitiveDesc::new("eq?", Arity::Exact(2), list::eq),
    PrimitiveDesc::new("eqv?", Arity::Exact(2), list::eqv),
    PrimitiveDesc::new("cons", Arity::Exact(2), list::cons),
    PrimitiveDesc::new("car", Arity::Exact(1), list::car),
    PrimitiveDesc::new("cdr", Arity::Exact(1), list::cdr),
    PrimitiveDesc::new("set-car!", Arity::Exact(2), list::set_car),
    PrimitiveDesc::new("set-cdr!", Arity::Exact(2), list::set_cdr),
    PrimitiveDesc::new("type-of", Arity::Exact(1), list::type_of),
];

/// Bind every primitive in [`PRIMITIVES`] as a global
pub fn install(heap: &mut Heap) -> Result<()> {
    for desc in PRIMITIVES {
        let primitive = heap.create_primitive(desc.name, desc.arity, desc.procedure)?;
        heap.define_global(desc.name, primitive)?;
    }
    debug!(count = PRIMITIVES.len(), "primitives installed");
    Ok(())
}

/// Collect the arguments of a primitive call
pub(crate) fn arguments(heap: &Heap, argv: Handle) -> Result<Vec<Handle>> {
    let count = heap.vector_length(argv)?;
    (0..count).map(|i| heap.vector_ref(argv, i)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gc::HeapConfig;

    /// Call an installed primitive by name
    pub(crate) fn call(heap: &mut Heap, name: &str, args: &[Handle]) -> Result<Handle> {
        let symbol = heap.intern(name)?;
        let primitive = heap.global(symbol)?.expect("primitive installed");
        let argv = heap.vector_from(args)?;
        heap.call_primitive(primitive, argv)
    }

    pub(crate) fn heap() -> Heap {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        install(&mut heap).unwrap();
        heap
    }

    #[test]
    fn test_install_binds_every_primitive() {
        let heap = heap();
        for desc in PRIMITIVES {
            let symbol = heap.find_symbol(desc.name).unwrap().unwrap();
            let value = heap.global(symbol).unwrap().unwrap();
            let primitive = heap.primitive(value).unwrap();
            assert_eq!(primitive.name, desc.name);
            assert_eq!(primitive.arity, desc.arity);
        }
    }

    #[test]
    fn test_arity_checked_before_call() {
        let mut heap = heap();
        let err = call(&mut heap, "car", &[]).unwrap_err();
        assert_eq!(
            err,
            crate::Error::ArityMismatch {
                expected: Arity::Exact(1),
                found: 0
            }
        );
    }
}
