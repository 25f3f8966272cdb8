//! Function assembler
//!
//! Produces function objects in the format the interpreter runs: a bytecode
//! byte-buffer, a literal pool vector deduplicated by identity in first-use
//! order, and the maximum operand-stack depth computed from the stack effect
//! of every emitted instruction.
//!
//! ```ignore
//! // (+ 1 2), arguments right to left
//! let mut b = FunctionBuilder::new(heap, 0, 0)?;
//! let two = heap.create_integer(2)?;
//! b.literal(heap, two)?;
//! let one = heap.create_integer(1)?;
//! b.literal(heap, one)?;
//! b.global(heap, "+")?;
//! b.apply(heap, 2)?;
//! let function = b.finish(heap)?;
//! ```
//!
//! The bytecode buffer and literal pool are retained until `finish` or
//! `abandon`. The function returned by `finish` is not rooted.

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Function, Handle};
use crate::vm::opcode::{OpCode, OpFormat};

/// Largest value an operand byte can hold
const MAX_OPERAND: usize = u8::MAX as usize;

/// A forward jump waiting for its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Label {
    /// Offset of the jump opcode
    at: usize,
}

/// Incremental builder for one function
#[derive(Debug)]
pub struct FunctionBuilder {
    bytecode: Handle,
    literals: Handle,
    arg_count: usize,
    local_count: usize,
    depth: usize,
    max_depth: usize,
}

impl FunctionBuilder {
    /// Start a function taking `arg_count` arguments with `local_count`
    /// local slots in total
    pub fn new(heap: &mut Heap, arg_count: usize, local_count: usize) -> Result<Self> {
        if arg_count > local_count {
            return Err(Error::MalformedFunction("more arguments than locals"));
        }
        let bytecode = heap.create_bytes(0)?;
        heap.retain(bytecode)?;
        let literals = match heap.create_vector(0) {
            Ok(literals) => literals,
            Err(err) => {
                heap.unretain(bytecode)?;
                return Err(err);
            }
        };
        heap.retain(literals)?;
        Ok(FunctionBuilder {
            bytecode,
            literals,
            arg_count,
            local_count,
            depth: 0,
            max_depth: 0,
        })
    }

    /// Current operand-stack depth at the end of the emitted code
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Offset the next instruction will be emitted at
    pub fn offset(&self, heap: &Heap) -> Result<usize> {
        heap.bytes_length(self.bytecode)
    }

    /// Add a value to the literal pool, returning its index
    pub fn add_literal(&mut self, heap: &mut Heap, value: Handle) -> Result<usize> {
        let index = heap.vector_add(self.literals, value)?;
        if index > MAX_OPERAND {
            return Err(Error::OperandTooLarge(index));
        }
        Ok(index)
    }

    /// Emit one instruction
    pub fn emit(&mut self, heap: &mut Heap, op: OpCode, operand: usize) -> Result<()> {
        let info = op.info();
        if op.has_operand() && operand > MAX_OPERAND {
            return Err(Error::OperandTooLarge(operand));
        }
        if info.format == OpFormat::Local && operand >= self.local_count {
            return Err(Error::BoundsViolation {
                index: operand,
                length: self.local_count,
            });
        }
        let pops = op.pops(operand);
        if self.depth < pops {
            return Err(Error::StackUnderflow);
        }

        heap.bytes_push(self.bytecode, op as u8)?;
        if op.has_operand() {
            heap.bytes_push(self.bytecode, operand as u8)?;
        }
        self.depth = self.depth - pops + info.n_push as usize;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    /// Correct the tracked depth where control flow merges
    ///
    /// After the consequent of an `if` jumps over the alternative, the
    /// alternative starts one value shallower than the tracked depth.
    pub fn adjust_depth(&mut self, delta: isize) -> Result<()> {
        self.depth = self
            .depth
            .checked_add_signed(delta)
            .ok_or(Error::StackUnderflow)?;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    pub fn nop(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::Nop, 0)
    }

    pub fn drop_value(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::Drop, 0)
    }

    pub fn dup(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::Dup, 0)
    }

    pub fn nil(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::Nil, 0)
    }

    /// Return the top of stack
    pub fn ret(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::Return, 0)
    }

    /// Bind the function on top of stack to the running context
    pub fn bind_closure(&mut self, heap: &mut Heap) -> Result<()> {
        self.emit(heap, OpCode::BindClosure, 0)
    }

    /// Push a constant
    pub fn literal(&mut self, heap: &mut Heap, value: Handle) -> Result<()> {
        let index = self.add_literal(heap, value)?;
        self.emit(heap, OpCode::Literal, index)
    }

    /// Push the value of a global
    pub fn global(&mut self, heap: &mut Heap, name: &str) -> Result<()> {
        let symbol = heap.intern(name)?;
        let index = self.add_literal(heap, symbol)?;
        self.emit(heap, OpCode::Global, index)
    }

    /// Pop a value into a global
    pub fn set_global(&mut self, heap: &mut Heap, name: &str) -> Result<()> {
        let symbol = heap.intern(name)?;
        let index = self.add_literal(heap, symbol)?;
        self.emit(heap, OpCode::SetGlobal, index)
    }

    pub fn local(&mut self, heap: &mut Heap, index: usize) -> Result<()> {
        self.emit(heap, OpCode::Local, index)
    }

    pub fn set_local(&mut self, heap: &mut Heap, index: usize) -> Result<()> {
        self.emit(heap, OpCode::SetLocal, index)
    }

    pub fn closure(&mut self, heap: &mut Heap, index: usize) -> Result<()> {
        self.emit(heap, OpCode::Closure, index)
    }

    pub fn set_closure(&mut self, heap: &mut Heap, index: usize) -> Result<()> {
        self.emit(heap, OpCode::SetClosure, index)
    }

    /// Apply the procedure on top of stack to the `argc` values below it
    pub fn apply(&mut self, heap: &mut Heap, argc: usize) -> Result<()> {
        self.emit(heap, OpCode::Apply, argc)
    }

    /// Emit a jump whose target is fixed later with [`place`](Self::place)
    pub fn jump(&mut self, heap: &mut Heap, op: OpCode) -> Result<Label> {
        if op.info().format != OpFormat::Label {
            return Err(Error::MalformedFunction("not a jump opcode"));
        }
        let at = self.offset(heap)?;
        self.emit(heap, op, 0)?;
        Ok(Label { at })
    }

    /// Point a jump at the next instruction to be emitted
    pub fn place(&mut self, heap: &mut Heap, label: Label) -> Result<()> {
        let target = self.offset(heap)?;
        self.patch(heap, label, target)
    }

    /// Point a jump at an explicit offset, which must not be behind it
    pub fn patch(&mut self, heap: &mut Heap, label: Label, target: usize) -> Result<()> {
        let from = label.at + 2;
        if target < from {
            return Err(Error::BackwardJump {
                from: label.at,
                to: target,
            });
        }
        let distance = target - from;
        if distance > MAX_OPERAND {
            return Err(Error::OperandTooLarge(distance));
        }
        heap.bytes_set(self.bytecode, label.at + 1, distance as u8)
    }

    /// Append `return` and `end` and create the function object
    ///
    /// The code must leave exactly the return value on the stack.
    pub fn finish(mut self, heap: &mut Heap) -> Result<Handle> {
        let result = self.seal(heap);
        self.release(heap)?;
        result
    }

    fn seal(&mut self, heap: &mut Heap) -> Result<Handle> {
        if self.depth != 1 {
            return Err(Error::MalformedFunction(
                "body must leave exactly one value on the stack",
            ));
        }
        self.ret(heap)?;
        heap.bytes_push(self.bytecode, OpCode::End as u8)?;
        heap.create_function(Function {
            stack_size: self.max_depth,
            local_count: self.local_count,
            arg_count: self.arg_count,
            bytecode: self.bytecode,
            literals: self.literals,
            closure: Handle::NIL,
        })
    }

    /// Drop the function under construction
    pub fn abandon(self, heap: &mut Heap) -> Result<()> {
        self.release(heap)
    }

    fn release(&self, heap: &mut Heap) -> Result<()> {
        heap.unretain(self.bytecode)?;
        heap.unretain(self.literals)
    }
}
