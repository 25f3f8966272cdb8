//! Bytecode opcode definitions
//!
//! The bytecode is stack-based. Every instruction is one opcode byte, and
//! opcodes above [`ARGUMENT_THRESHOLD`] are followed by a single unsigned
//! operand byte. Each opcode has:
//! - A size in bytes
//! - Number of values popped from stack (n_pop)
//! - Number of values pushed to stack (n_push)
//! - An operand format
//!
//! Jump operands are forward distances measured from the end of the jump
//! instruction.

use crate::error::{Error, Result};

/// Opcodes above this value carry one operand byte
pub const ARGUMENT_THRESHOLD: u8 = 8;

/// Reserved for a wide-operand prefix, rejected on decode
pub const BIG_ARGUMENT: u8 = 7;

/// Reserved for backward jumps, rejected on decode
pub const JUMP_BACK: u8 = 21;

/// Never emitted
pub const INVALID: u8 = 0xff;

/// Opcode operand formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFormat {
    /// No operand
    None,
    /// Literal pool index
    Literal,
    /// Local variable index
    Local,
    /// Closure variable index, counted outward through enclosing contexts
    ClosureVar,
    /// Argument count of an application
    NPop,
    /// Forward jump distance
    Label,
}

/// Bytecode opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// End of bytecode, reaching it is an error
    End = 0,
    /// Do nothing
    Nop = 1,
    /// Discard the top of stack
    Drop = 2,
    /// Duplicate the top of stack
    Dup = 3,
    /// Push nil
    Nil = 4,
    /// Return the top of stack to the caller
    Return = 5,
    /// Bind the function on top of stack to the current context
    BindClosure = 6,

    /// Push a literal
    Literal = 9,
    /// Push the value of a global (operand: literal index of its symbol)
    Global = 10,
    /// Pop a value into a global (operand: literal index of its symbol)
    SetGlobal = 11,
    /// Push a local variable
    Local = 12,
    /// Pop a value into a local variable
    SetLocal = 13,
    /// Push a closure variable
    Closure = 14,
    /// Pop a value into a closure variable
    SetClosure = 15,
    /// Call: args... func -> ret
    Apply = 16,
    /// Tail call, not supported
    TailApply = 17,
    /// Pop, jump if not nil
    JumpIfTrue = 18,
    /// Pop, jump if nil
    JumpIfFalse = 19,
    /// Jump unconditionally
    Jump = 20,
}

/// Opcode metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCodeInfo {
    /// Opcode size in bytes
    pub size: u8,
    /// Number of values popped (for `NPop`, in addition to the operand)
    pub n_pop: u8,
    /// Number of values pushed
    pub n_push: u8,
    /// Operand format
    pub format: OpFormat,
}

impl OpCodeInfo {
    const fn new(size: u8, n_pop: u8, n_push: u8, format: OpFormat) -> Self {
        OpCodeInfo {
            size,
            n_pop,
            n_push,
            format,
        }
    }
}

impl OpCode {
    /// Every opcode, in encoding order
    pub const ALL: [OpCode; 19] = [
        OpCode::End,
        OpCode::Nop,
        OpCode::Drop,
        OpCode::Dup,
        OpCode::Nil,
        OpCode::Return,
        OpCode::BindClosure,
        OpCode::Literal,
        OpCode::Global,
        OpCode::SetGlobal,
        OpCode::Local,
        OpCode::SetLocal,
        OpCode::Closure,
        OpCode::SetClosure,
        OpCode::Apply,
        OpCode::TailApply,
        OpCode::JumpIfTrue,
        OpCode::JumpIfFalse,
        OpCode::Jump,
    ];

    /// Decode an opcode byte
    pub const fn from_u8(byte: u8) -> Option<OpCode> {
        Some(match byte {
            0 => OpCode::End,
            1 => OpCode::Nop,
            2 => OpCode::Drop,
            3 => OpCode::Dup,
            4 => OpCode::Nil,
            5 => OpCode::Return,
            6 => OpCode::BindClosure,
            9 => OpCode::Literal,
            10 => OpCode::Global,
            11 => OpCode::SetGlobal,
            12 => OpCode::Local,
            13 => OpCode::SetLocal,
            14 => OpCode::Closure,
            15 => OpCode::SetClosure,
            16 => OpCode::Apply,
            17 => OpCode::TailApply,
            18 => OpCode::JumpIfTrue,
            19 => OpCode::JumpIfFalse,
            20 => OpCode::Jump,
            _ => return None,
        })
    }

    /// Check if this opcode is followed by an operand byte
    #[inline]
    pub const fn has_operand(self) -> bool {
        self as u8 > ARGUMENT_THRESHOLD
    }

    /// Mnemonic used by the disassembler
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::End => "end",
            OpCode::Nop => "nop",
            OpCode::Drop => "drop",
            OpCode::Dup => "dup",
            OpCode::Nil => "nil",
            OpCode::Return => "return",
            OpCode::BindClosure => "bind-closure",
            OpCode::Literal => "literal",
            OpCode::Global => "global",
            OpCode::SetGlobal => "set-global",
            OpCode::Local => "local",
            OpCode::SetLocal => "set-local",
            OpCode::Closure => "closure",
            OpCode::SetClosure => "set-closure",
            OpCode::Apply => "apply",
            OpCode::TailApply => "tail-apply",
            OpCode::JumpIfTrue => "jump-true",
            OpCode::JumpIfFalse => "jump-false",
            OpCode::Jump => "jump",
        }
    }

    /// Size and stack effect of this opcode
    pub const fn info(self) -> OpCodeInfo {
        match self {
            OpCode::End | OpCode::Nop => OpCodeInfo::new(1, 0, 0, OpFormat::None),
            OpCode::Drop => OpCodeInfo::new(1, 1, 0, OpFormat::None),
            OpCode::Dup => OpCodeInfo::new(1, 1, 2, OpFormat::None),
            OpCode::Nil => OpCodeInfo::new(1, 0, 1, OpFormat::None),
            OpCode::Return => OpCodeInfo::new(1, 1, 0, OpFormat::None),
            OpCode::BindClosure => OpCodeInfo::new(1, 1, 1, OpFormat::None),
            OpCode::Literal | OpCode::Global => OpCodeInfo::new(2, 0, 1, OpFormat::Literal),
            OpCode::SetGlobal => OpCodeInfo::new(2, 1, 0, OpFormat::Literal),
            OpCode::Local => OpCodeInfo::new(2, 0, 1, OpFormat::Local),
            OpCode::SetLocal => OpCodeInfo::new(2, 1, 0, OpFormat::Local),
            OpCode::Closure => OpCodeInfo::new(2, 0, 1, OpFormat::ClosureVar),
            OpCode::SetClosure => OpCodeInfo::new(2, 1, 0, OpFormat::ClosureVar),
            OpCode::Apply | OpCode::TailApply => OpCodeInfo::new(2, 1, 1, OpFormat::NPop),
            OpCode::JumpIfTrue | OpCode::JumpIfFalse => OpCodeInfo::new(2, 1, 0, OpFormat::Label),
            OpCode::Jump => OpCodeInfo::new(2, 0, 0, OpFormat::Label),
        }
    }

    /// Number of values popped, given the operand
    #[inline]
    pub const fn pops(self, operand: usize) -> usize {
        let info = self.info();
        match info.format {
            OpFormat::NPop => info.n_pop as usize + operand,
            _ => info.n_pop as usize,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        OpCode::from_u8(byte).ok_or(Error::InvalidOpcode(byte))
    }
}
