//! Activation records
//!
//! A context is a heap object holding one invocation's locals, operand stack
//! and saved program counter. Two links leave a context:
//! - `prior`, the dynamic caller, followed by `return`
//! - the function's `closure`, the lexical parent, followed when a closure
//!   variable is resolved
//!
//! Closure variable `n` is counted outward: the lexical parent's locals come
//! first, then its parent's, and so on.

use tracing::debug;

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Context, Function, Handle, Object};

impl Heap {
    /// Create a context for running `function`, returning into `prior`
    ///
    /// Locals and the operand stack are sized from the function's metadata
    /// and start out nil. The new context is not rooted.
    pub fn create_context(&mut self, function: Handle, prior: Handle) -> Result<Handle> {
        let meta = self.function(function)?;
        self.protecting(&[function, prior], |heap| {
            let locals = heap.create_vector(meta.local_count)?;
            let stack = heap.protecting(&[locals], |heap| heap.create_vector(meta.stack_size))?;
            let context = heap.allocate(Object::Context(Context {
                function,
                locals,
                stack,
                prior,
                pc: 0,
                sp: 0,
            }))?;
            debug!(%context, %function, %prior, "context created");
            Ok(context)
        })
    }

    /// Read a context record
    pub fn context(&self, handle: Handle) -> Result<Context> {
        match self.dereference(handle)? {
            Object::Context(context) => Ok(*context),
            other => Err(Error::expected("continuation", other.object_type())),
        }
    }

    /// Save the program counter and stack pointer of a suspended context
    pub(crate) fn save_context(&mut self, handle: Handle, pc: usize, sp: usize) -> Result<()> {
        match self.dereference_mut(handle)? {
            Object::Context(context) => {
                context.pc = pc;
                context.sp = sp;
                Ok(())
            }
            other => Err(Error::expected("continuation", other.object_type())),
        }
    }

    /// Find the locals vector and slot holding closure variable `index`
    fn resolve_closure(&self, function: Handle, index: usize) -> Result<(Handle, usize)> {
        let mut offset = index;
        let mut context = self.function(function)?.closure;
        while !context.is_nil() {
            let record = self.context(context)?;
            let count = self.vector_length(record.locals)?;
            if offset < count {
                return Ok((record.locals, offset));
            }
            offset -= count;
            context = self.function(record.function)?.closure;
        }
        Err(Error::UnresolvedClosureVariable(index))
    }

    /// Read closure variable `index` of a function
    pub fn closure_ref(&self, function: Handle, index: usize) -> Result<Handle> {
        let (locals, slot) = self.resolve_closure(function, index)?;
        self.vector_ref(locals, slot)
    }

    /// Write closure variable `index` of a function
    pub fn closure_set(&mut self, function: Handle, index: usize, value: Handle) -> Result<()> {
        let (locals, slot) = self.resolve_closure(function, index)?;
        self.vector_set(locals, slot, value)
    }

    /// Bind a function to the context it was created in
    ///
    /// An unbound function is stamped in place. A function already bound to
    /// a different context is left alone and a copy bound to `context` is
    /// returned instead, so every activation gets its own closure.
    pub fn bind_closure(&mut self, function: Handle, context: Handle) -> Result<Handle> {
        let meta = self.function(function)?;
        if meta.closure == context {
            return Ok(function);
        }
        self.context(context)?;
        if meta.closure.is_nil() {
            self.function_mut(function)?.closure = context;
            return Ok(function);
        }
        self.create_function(Function {
            closure: context,
            ..meta
        })
    }
}
