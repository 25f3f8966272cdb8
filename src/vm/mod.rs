//! Virtual machine module
//!
//! The VM executes bytecode functions using a stack-based architecture.
//! Every invocation runs in a heap-allocated context, so closures can keep
//! their defining context alive after it returns.

pub mod builder;
pub mod disasm;
pub mod frame;
pub mod interpreter;
pub mod opcode;
pub mod stack;

pub use builder::{FunctionBuilder, Label};
pub use disasm::disassemble;
pub use interpreter::{Interpreter, InterpreterStats};
pub use opcode::OpCode;
pub use stack::Stack;
