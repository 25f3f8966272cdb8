//! Operand stack for the VM
//!
//! Each context owns a fixed-size vector used as its operand stack. This
//! type caches the vector's handle, length and stack pointer while a context
//! is executing; the pointer is written back to the context record whenever
//! the interpreter switches away from it.

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::Handle;

/// Operand stack view over a context's stack vector
#[derive(Debug, Clone, Copy)]
pub struct Stack {
    /// Stack vector
    slots: Handle,
    /// Number of slots in use
    sp: usize,
    /// Number of slots available
    depth: usize,
}

impl Stack {
    /// Attach to a stack vector with `sp` slots already in use
    pub fn new(heap: &Heap, slots: Handle, sp: usize) -> Result<Self> {
        let depth = heap.vector_length(slots)?;
        if sp > depth {
            return Err(Error::StackOverflow { depth });
        }
        Ok(Stack { slots, sp, depth })
    }

    /// Push a value onto the stack
    #[inline]
    pub fn push(&mut self, heap: &mut Heap, value: Handle) -> Result<()> {
        if self.sp >= self.depth {
            return Err(Error::StackOverflow { depth: self.depth });
        }
        heap.vector_set(self.slots, self.sp, value)?;
        self.sp += 1;
        Ok(())
    }

    /// Pop a value from the stack
    ///
    /// The slot is reset to nil, so the stack no longer keeps the value
    /// alive. The caller must link or protect it before allocating.
    #[inline]
    pub fn pop(&mut self, heap: &mut Heap) -> Result<Handle> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow);
        }
        let value = heap.vector_ref(self.slots, self.sp - 1)?;
        heap.vector_set(self.slots, self.sp - 1, Handle::NIL)?;
        self.sp -= 1;
        Ok(value)
    }

    /// Peek at the top value without removing it
    #[inline]
    pub fn peek(&self, heap: &Heap) -> Result<Handle> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow);
        }
        heap.vector_ref(self.slots, self.sp - 1)
    }

    /// Replace the top value
    pub fn replace_top(&mut self, heap: &mut Heap, value: Handle) -> Result<()> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow);
        }
        heap.vector_set(self.slots, self.sp - 1, value)
    }

    /// Duplicate the top value
    pub fn dup(&mut self, heap: &mut Heap) -> Result<()> {
        let value = self.peek(heap)?;
        self.push(heap, value)
    }

    /// Pop `count` values into slots `0..count` of `dest`, top first
    ///
    /// With arguments pushed last-to-first this leaves them in source order.
    pub fn pop_into(&mut self, heap: &mut Heap, dest: Handle, count: usize) -> Result<()> {
        for i in 0..count {
            let value = self.pop(heap)?;
            heap.vector_set(dest, i, value)?;
        }
        Ok(())
    }

    /// Get the current stack depth
    #[inline]
    pub fn len(&self) -> usize {
        self.sp
    }

    /// Check if the stack is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// Maximum depth of this stack
    #[inline]
    pub fn capacity(&self) -> usize {
        self.depth
    }
}
