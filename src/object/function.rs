//! Functions and primitives

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Arity, Function, Handle, Object, ObjectType, Primitive, PrimitiveFn};

impl Heap {
    /// Allocate a function object
    ///
    /// The bytecode must be a byte-buffer, the literal pool a vector, and the
    /// closure nil or a context.
    pub fn create_function(&mut self, function: Function) -> Result<Handle> {
        if function.arg_count > function.local_count {
            return Err(Error::MalformedFunction("more arguments than locals"));
        }
        self.expect_type(function.bytecode, ObjectType::Bytes, "bytevector")?;
        self.expect_type(function.literals, ObjectType::Vector, "vector")?;
        if !function.closure.is_nil() {
            self.expect_type(function.closure, ObjectType::Context, "continuation")?;
        }
        self.allocate(Object::Function(function))
    }

    /// Read a function's metadata
    pub fn function(&self, handle: Handle) -> Result<Function> {
        match self.dereference(handle)? {
            Object::Function(function) => Ok(*function),
            other => Err(Error::expected("procedure", other.object_type())),
        }
    }

    pub(crate) fn function_mut(&mut self, handle: Handle) -> Result<&mut Function> {
        match self.dereference_mut(handle)? {
            Object::Function(function) => Ok(function),
            other => Err(Error::expected("procedure", other.object_type())),
        }
    }

    /// Allocate a primitive
    pub fn create_primitive(
        &mut self,
        name: &'static str,
        arity: Arity,
        procedure: PrimitiveFn,
    ) -> Result<Handle> {
        self.allocate(Object::Primitive(Primitive {
            name,
            arity,
            procedure,
        }))
    }

    /// Read a primitive
    pub fn primitive(&self, handle: Handle) -> Result<Primitive> {
        match self.dereference(handle)? {
            Object::Primitive(primitive) => Ok(*primitive),
            other => Err(Error::expected("primitive-procedure", other.object_type())),
        }
    }

    /// Invoke a primitive on an argument vector
    ///
    /// The argument vector stays protected for the duration of the call.
    pub fn call_primitive(&mut self, primitive: Handle, argv: Handle) -> Result<Handle> {
        let Primitive {
            arity, procedure, ..
        } = self.primitive(primitive)?;
        let count = self.vector_length(argv)?;
        if !arity.accepts(count) {
            return Err(Error::ArityMismatch {
                expected: arity,
                found: count,
            });
        }
        self.protecting(&[primitive, argv], |heap| procedure(heap, argv))
    }

    /// Check if an object can be applied
    pub fn is_procedure(&self, handle: Handle) -> Result<bool> {
        Ok(matches!(
            self.dereference(handle)?,
            Object::Function(_) | Object::Primitive(_)
        ))
    }

    fn expect_type(&self, handle: Handle, ty: ObjectType, expected: &'static str) -> Result<()> {
        let found = self.type_of(handle)?;
        if found == ty {
            Ok(())
        } else {
            Err(Error::expected(expected, found))
        }
    }
}
