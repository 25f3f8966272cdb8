//! Bytecode interpreter
//!
//! Executes function bytecode one context at a time. All interpreter state
//! that must survive a collection lives in the heap: the executing context is
//! the current-context root, and everything a suspended caller needs hangs
//! off it through `prior`. The registers cached here are handles, which stay
//! valid while objects move.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Arity, Handle, ObjectType};
use crate::vm::opcode::OpCode;
use crate::vm::stack::Stack;

/// Interpreter statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    /// Instructions dispatched
    pub instructions: u64,
    /// Compiled functions applied
    pub calls: u64,
    /// Primitives applied
    pub primitive_calls: u64,
    /// Deepest chain of nested applications seen
    pub max_depth: usize,
}

/// Registers of the executing context
struct Frame {
    context: Handle,
    function: Handle,
    bytecode: Handle,
    literals: Handle,
    locals: Handle,
    prior: Handle,
    pc: usize,
    stack: Stack,
}

impl Frame {
    /// Make `context` the executing context
    fn enter(heap: &mut Heap, context: Handle) -> Result<Self> {
        let record = heap.context(context)?;
        let function = heap.function(record.function)?;
        let stack = Stack::new(heap, record.stack, record.sp)?;
        heap.roots_mut().set_current_context(context);
        Ok(Frame {
            context,
            function: record.function,
            bytecode: function.bytecode,
            literals: function.literals,
            locals: record.locals,
            prior: record.prior,
            pc: record.pc,
            stack,
        })
    }

    /// Write the program counter and stack pointer back to the context
    fn suspend(&self, heap: &mut Heap) -> Result<()> {
        heap.save_context(self.context, self.pc, self.stack.len())
    }

    /// Read the next instruction
    fn fetch(&mut self, heap: &Heap) -> Result<(OpCode, usize)> {
        let code = heap.bytes_contents(self.bytecode)?;
        let byte = *code
            .get(self.pc)
            .ok_or(Error::UnexpectedEndOfBytecode { pc: self.pc })?;
        let op = OpCode::try_from(byte)?;
        let mut operand = 0;
        if op.has_operand() {
            operand = *code
                .get(self.pc + 1)
                .ok_or(Error::UnexpectedEndOfBytecode { pc: self.pc + 1 })?
                as usize;
        }
        self.pc += op.info().size as usize;
        Ok((op, operand))
    }

    fn jump(&mut self, distance: usize) {
        self.pc += distance;
    }
}

/// Interpreter state
pub struct Interpreter {
    /// Maximum chain of nested applications
    max_depth: usize,
    stats: InterpreterStats,
}

impl Interpreter {
    /// Default max nesting of applications
    const DEFAULT_MAX_DEPTH: usize = 10_000;

    /// Create a new interpreter
    pub fn new() -> Self {
        Interpreter {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            stats: InterpreterStats::default(),
        }
    }

    /// Create an interpreter with a custom nesting limit
    pub fn with_config(max_depth: usize) -> Self {
        Interpreter {
            max_depth,
            stats: InterpreterStats::default(),
        }
    }

    /// Get the statistics gathered so far
    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    /// Run a function to completion and return its result
    ///
    /// The function runs in a fresh context with no caller. `args` are
    /// loaded into its first local slots. On error the current context is
    /// reset, so the heap can be reused.
    pub fn execute(&mut self, heap: &mut Heap, function: Handle, args: &[Handle]) -> Result<Handle> {
        let meta = heap.function(function)?;
        if meta.arg_count != args.len() {
            return Err(Error::ArityMismatch {
                expected: Arity::Exact(meta.arg_count),
                found: args.len(),
            });
        }
        for &arg in args {
            heap.type_of(arg)?;
        }

        let caller = heap.roots().current_context();
        let result = heap
            .protecting(args, |heap| heap.create_context(function, Handle::NIL))
            .and_then(|context| {
                let locals = heap.context(context)?.locals;
                for (i, &arg) in args.iter().enumerate() {
                    heap.vector_set(locals, i, arg)?;
                }
                self.run(heap, context)
            });
        heap.roots_mut().set_current_context(caller);
        result
    }

    /// Main interpreter loop
    fn run(&mut self, heap: &mut Heap, context: Handle) -> Result<Handle> {
        let mut frame = Frame::enter(heap, context)?;
        let mut depth = 0usize;

        loop {
            let at = frame.pc;
            let (op, arg) = frame.fetch(heap)?;
            self.stats.instructions += 1;
            trace!(pc = at, op = op.name(), arg, "dispatch");

            match op {
                OpCode::End => {
                    return Err(Error::UnexpectedEndOfBytecode { pc: at });
                }
                OpCode::Nop => {}
                OpCode::Drop => {
                    frame.stack.pop(heap)?;
                }
                OpCode::Dup => {
                    frame.stack.dup(heap)?;
                }
                OpCode::Nil => {
                    frame.stack.push(heap, Handle::NIL)?;
                }
                OpCode::Return => {
                    let value = frame.stack.pop(heap)?;
                    if frame.prior.is_nil() {
                        return Ok(value);
                    }
                    frame = Frame::enter(heap, frame.prior)?;
                    frame.stack.push(heap, value)?;
                    depth = depth.saturating_sub(1);
                }
                OpCode::BindClosure => {
                    let function = frame.stack.peek(heap)?;
                    let bound = heap.bind_closure(function, frame.context)?;
                    frame.stack.replace_top(heap, bound)?;
                }

                OpCode::Literal => {
                    let value = heap.vector_ref(frame.literals, arg)?;
                    frame.stack.push(heap, value)?;
                }
                OpCode::Global => {
                    let symbol = heap.vector_ref(frame.literals, arg)?;
                    let value = match heap.global(symbol)? {
                        Some(value) => value,
                        None => {
                            return Err(Error::UndefinedGlobal(
                                heap.symbol_name(symbol)?.to_string(),
                            ));
                        }
                    };
                    frame.stack.push(heap, value)?;
                }
                OpCode::SetGlobal => {
                    let symbol = heap.vector_ref(frame.literals, arg)?;
                    let value = frame.stack.pop(heap)?;
                    heap.set_global(symbol, value)?;
                }
                OpCode::Local => {
                    let value = heap.vector_ref(frame.locals, arg)?;
                    frame.stack.push(heap, value)?;
                }
                OpCode::SetLocal => {
                    let value = frame.stack.pop(heap)?;
                    heap.vector_set(frame.locals, arg, value)?;
                }
                OpCode::Closure => {
                    let value = heap.closure_ref(frame.function, arg)?;
                    frame.stack.push(heap, value)?;
                }
                OpCode::SetClosure => {
                    let value = frame.stack.pop(heap)?;
                    heap.closure_set(frame.function, arg, value)?;
                }

                OpCode::Apply => {
                    let callee = frame.stack.pop(heap)?;
                    match heap.type_of(callee)? {
                        ObjectType::Function => {
                            if depth >= self.max_depth {
                                return Err(Error::CallDepthExceeded {
                                    limit: self.max_depth,
                                });
                            }
                            let context = self.enter_function(heap, &mut frame, callee, arg)?;
                            frame = Frame::enter(heap, context)?;
                            depth += 1;
                            self.stats.max_depth = self.stats.max_depth.max(depth);
                        }
                        ObjectType::Primitive => {
                            let result = self.apply_primitive(heap, &mut frame, callee, arg)?;
                            frame.stack.push(heap, result)?;
                        }
                        other => return Err(Error::NotAProcedure(other)),
                    }
                }
                OpCode::TailApply => return Err(Error::TailApplyUnsupported),

                OpCode::JumpIfTrue => {
                    if !frame.stack.pop(heap)?.is_nil() {
                        frame.jump(arg);
                    }
                }
                OpCode::JumpIfFalse => {
                    if frame.stack.pop(heap)?.is_nil() {
                        frame.jump(arg);
                    }
                }
                OpCode::Jump => frame.jump(arg),
            }
        }
    }

    /// Create the callee's context and move the arguments into it
    ///
    /// The caller is suspended afterwards; the returned context is ready to
    /// be entered.
    fn enter_function(
        &mut self,
        heap: &mut Heap,
        frame: &mut Frame,
        callee: Handle,
        argc: usize,
    ) -> Result<Handle> {
        let meta = heap.function(callee)?;
        if meta.arg_count != argc {
            return Err(Error::ArityMismatch {
                expected: Arity::Exact(meta.arg_count),
                found: argc,
            });
        }
        // Arguments stay in the caller's stack vector, and so reachable,
        // until they are moved
        let context = heap.protecting(&[callee], |heap| heap.create_context(callee, frame.context))?;
        let locals = heap.context(context)?.locals;
        frame.stack.pop_into(heap, locals, argc)?;
        frame.suspend(heap)?;
        self.stats.calls += 1;
        debug!(%callee, argc, "apply");
        Ok(context)
    }

    fn apply_primitive(
        &mut self,
        heap: &mut Heap,
        frame: &mut Frame,
        callee: Handle,
        argc: usize,
    ) -> Result<Handle> {
        let argv = heap.protecting(&[callee], |heap| heap.create_vector(argc))?;
        frame.stack.pop_into(heap, argv, argc)?;
        self.stats.primitive_calls += 1;
        heap.call_primitive(callee, argv)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::HeapConfig;
    use crate::value::{Function, PrimitiveFn};

    fn make_function(
        heap: &mut Heap,
        code: &[u8],
        literals: &[Handle],
        arg_count: usize,
        local_count: usize,
        stack_size: usize,
    ) -> Handle {
        let literals = heap.vector_from(literals).unwrap();
        heap.retain(literals).unwrap();
        let bytecode = heap.bytes_from(code).unwrap();
        heap.retain(bytecode).unwrap();
        let f = heap
            .create_function(Function {
                stack_size,
                local_count,
                arg_count,
                bytecode,
                literals,
                closure: Handle::NIL,
            })
            .unwrap();
        heap.retain(f).unwrap();
        f
    }

    fn add(heap: &mut Heap, argv: Handle) -> Result<Handle> {
        let mut sum = 0;
        for i in 0..heap.vector_length(argv)? {
            sum += heap.integer(heap.vector_ref(argv, i)?)?;
        }
        heap.create_integer(sum)
    }

    fn define(heap: &mut Heap, name: &'static str, procedure: PrimitiveFn) {
        let p = heap
            .create_primitive(name, Arity::AtLeast(0), procedure)
            .unwrap();
        heap.define_global(name, p).unwrap();
    }

    fn heap() -> Heap {
        Heap::new(HeapConfig::default()).unwrap()
    }

    #[test]
    fn test_literal_return() {
        let mut heap = heap();
        let x = heap.create_integer(5).unwrap();
        let f = make_function(
            &mut heap,
            &[OpCode::Literal as u8, 0, OpCode::Return as u8, OpCode::End as u8],
            &[x],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&mut heap, f, &[]).unwrap(), x);
        assert!(heap.roots().current_context().is_nil());
    }

    #[test]
    fn test_primitive_application() {
        // (+ 1 2 3), arguments pushed right to left
        let mut heap = heap();
        define(&mut heap, "+", add);
        let plus = heap.intern("+").unwrap();
        let one = heap.create_integer(1).unwrap();
        let two = heap.create_integer(2).unwrap();
        let three = heap.create_integer(3).unwrap();
        let f = make_function(
            &mut heap,
            &[
                OpCode::Literal as u8, 3,
                OpCode::Literal as u8, 2,
                OpCode::Literal as u8, 1,
                OpCode::Global as u8, 0,
                OpCode::Apply as u8, 3,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[plus, one, two, three],
            0,
            0,
            4,
        );
        let mut interp = Interpreter::new();
        let result = interp.execute(&mut heap, f, &[]).unwrap();
        assert_eq!(heap.integer(result).unwrap(), 6);
        assert_eq!(interp.stats().primitive_calls, 1);
    }

    #[test]
    fn test_arguments_and_locals() {
        let mut heap = heap();
        let f = make_function(
            &mut heap,
            &[
                OpCode::Local as u8, 1,
                OpCode::SetLocal as u8, 2,
                OpCode::Local as u8, 2,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[],
            2,
            3,
            1,
        );
        let a = heap.create_integer(1).unwrap();
        let b = heap.create_integer(2).unwrap();
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&mut heap, f, &[a, b]).unwrap(), b);
        assert!(matches!(
            interp.execute(&mut heap, f, &[a]),
            Err(Error::ArityMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn test_call_restores_caller_stack() {
        // 7 stays below the call; after dropping the result it is returned
        let mut heap = heap();
        let identity = make_function(
            &mut heap,
            &[OpCode::Local as u8, 0, OpCode::Return as u8, OpCode::End as u8],
            &[],
            1,
            1,
            1,
        );
        let seven = heap.create_integer(7).unwrap();
        let five = heap.create_integer(5).unwrap();
        let f = make_function(
            &mut heap,
            &[
                OpCode::Literal as u8, 0,
                OpCode::Literal as u8, 1,
                OpCode::Literal as u8, 2,
                OpCode::Apply as u8, 1,
                OpCode::Drop as u8,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[seven, five, identity],
            0,
            0,
            3,
        );
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&mut heap, f, &[]).unwrap(), seven);
        assert_eq!(interp.stats().calls, 1);
        assert_eq!(interp.stats().max_depth, 1);
    }

    #[test]
    fn test_conditional_jump() {
        // (if arg 'yes 'no)
        let mut heap = heap();
        let yes = heap.intern("yes").unwrap();
        let no = heap.intern("no").unwrap();
        let f = make_function(
            &mut heap,
            &[
                OpCode::Local as u8, 0,
                OpCode::JumpIfFalse as u8, 4,
                OpCode::Literal as u8, 0,
                OpCode::Jump as u8, 2,
                OpCode::Literal as u8, 1,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[yes, no],
            1,
            1,
            1,
        );
        let zero = heap.create_integer(0).unwrap();
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&mut heap, f, &[Handle::NIL]).unwrap(), no);
        assert_eq!(interp.execute(&mut heap, f, &[zero]).unwrap(), yes);
    }

    #[test]
    fn test_globals() {
        let mut heap = heap();
        let x = heap.intern("x").unwrap();
        let v = heap.create_integer(3).unwrap();
        let f = make_function(
            &mut heap,
            &[
                OpCode::Literal as u8, 1,
                OpCode::SetGlobal as u8, 0,
                OpCode::Global as u8, 0,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[x, v],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(interp.execute(&mut heap, f, &[]).unwrap(), v);
        assert_eq!(heap.global(x).unwrap(), Some(v));
    }

    #[test]
    fn test_undefined_global() {
        let mut heap = heap();
        let y = heap.intern("y").unwrap();
        let f = make_function(
            &mut heap,
            &[OpCode::Global as u8, 0, OpCode::Return as u8, OpCode::End as u8],
            &[y],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.execute(&mut heap, f, &[]).unwrap_err(),
            Error::UndefinedGlobal("y".to_string())
        );
        assert!(heap.roots().current_context().is_nil());
    }

    #[test]
    fn test_stack_discipline_errors() {
        let mut heap = heap();
        let underflow = make_function(&mut heap, &[OpCode::Drop as u8], &[], 0, 0, 1);
        let overflow = make_function(
            &mut heap,
            &[OpCode::Nil as u8, OpCode::Nil as u8, OpCode::Return as u8],
            &[],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.execute(&mut heap, underflow, &[]).unwrap_err(),
            Error::StackUnderflow
        );
        assert_eq!(
            interp.execute(&mut heap, overflow, &[]).unwrap_err(),
            Error::StackOverflow { depth: 1 }
        );
    }

    #[test]
    fn test_end_of_bytecode() {
        let mut heap = heap();
        let at_end = make_function(&mut heap, &[OpCode::Nil as u8, OpCode::End as u8], &[], 0, 0, 1);
        let run_off = make_function(&mut heap, &[OpCode::Nop as u8], &[], 0, 0, 1);
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.execute(&mut heap, at_end, &[]).unwrap_err(),
            Error::UnexpectedEndOfBytecode { pc: 1 }
        );
        assert_eq!(
            interp.execute(&mut heap, run_off, &[]).unwrap_err(),
            Error::UnexpectedEndOfBytecode { pc: 1 }
        );
    }

    #[test]
    fn test_invalid_and_unsupported_opcodes() {
        let mut heap = heap();
        let invalid = make_function(&mut heap, &[0xff], &[], 0, 0, 1);
        let jump_back = make_function(&mut heap, &[21, 0], &[], 0, 0, 1);
        let tail = make_function(
            &mut heap,
            &[OpCode::Nil as u8, OpCode::TailApply as u8, 0],
            &[],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.execute(&mut heap, invalid, &[]).unwrap_err(),
            Error::InvalidOpcode(0xff)
        );
        assert_eq!(
            interp.execute(&mut heap, jump_back, &[]).unwrap_err(),
            Error::InvalidOpcode(21)
        );
        assert_eq!(
            interp.execute(&mut heap, tail, &[]).unwrap_err(),
            Error::TailApplyUnsupported
        );
    }

    #[test]
    fn test_apply_non_procedure() {
        let mut heap = heap();
        let x = heap.create_integer(1).unwrap();
        let f = make_function(
            &mut heap,
            &[OpCode::Literal as u8, 0, OpCode::Apply as u8, 0, OpCode::Return as u8],
            &[x],
            0,
            0,
            1,
        );
        let mut interp = Interpreter::new();
        assert_eq!(
            interp.execute(&mut heap, f, &[]).unwrap_err(),
            Error::NotAProcedure(ObjectType::Int)
        );
    }

    #[test]
    fn test_call_depth_limit() {
        // A function that applies the global `loop` forever
        let mut heap = heap();
        let name = heap.intern("loop").unwrap();
        let f = make_function(
            &mut heap,
            &[OpCode::Global as u8, 0, OpCode::Apply as u8, 0, OpCode::Return as u8],
            &[name],
            0,
            0,
            1,
        );
        heap.set_global(name, f).unwrap();
        let mut interp = Interpreter::with_config(16);
        assert_eq!(
            interp.execute(&mut heap, f, &[]).unwrap_err(),
            Error::CallDepthExceeded { limit: 16 }
        );
        assert_eq!(interp.stats().max_depth, 16);
    }

    #[test]
    fn test_execution_survives_constant_collection() {
        let mut heap = Heap::new(HeapConfig::default().with_collect_every(1)).unwrap();
        define(&mut heap, "+", add);
        let plus = heap.intern("+").unwrap();
        let one = heap.create_integer(1).unwrap();
        heap.retain(one).unwrap();
        let identity = make_function(
            &mut heap,
            &[OpCode::Local as u8, 0, OpCode::Return as u8, OpCode::End as u8],
            &[],
            1,
            1,
            1,
        );
        // (identity (+ 1 1))
        let f = make_function(
            &mut heap,
            &[
                OpCode::Literal as u8, 1,
                OpCode::Literal as u8, 1,
                OpCode::Global as u8, 0,
                OpCode::Apply as u8, 2,
                OpCode::Literal as u8, 2,
                OpCode::Apply as u8, 1,
                OpCode::Return as u8,
                OpCode::End as u8,
            ],
            &[plus, one, identity],
            0,
            0,
            3,
        );
        let mut interp = Interpreter::new();
        let result = interp.execute(&mut heap, f, &[]).unwrap();
        assert_eq!(heap.integer(result).unwrap(), 2);
        assert!(heap.collections() > 0);
    }
}
