//! Runtime error type

use thiserror::Error;

use crate::value::{Arity, Handle, ObjectType};

/// Errors raised by the heap, the object layer and the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid handle {0}")]
    InvalidHandle(Handle),

    #[error("out of handles: all {limit} object store slots are live")]
    OutOfHandles { limit: usize },

    #[error("out of memory: requested {requested} bytes, {available} available after collection")]
    OutOfMemory { requested: usize, available: usize },

    #[error("release of handle {0} that is not retained")]
    UnpairedRelease(Handle),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ObjectType,
    },

    #[error("index {index} out of bounds for length {length}")]
    BoundsViolation { index: usize, length: usize },

    #[error("closure variable {0} is not bound in any enclosing context")]
    UnresolvedClosureVariable(usize),

    #[error("undefined global: {0}")]
    UndefinedGlobal(String),

    #[error("attempt to apply a {0}, which is not a procedure")]
    NotAProcedure(ObjectType),

    #[error("arity mismatch: expected {expected} arguments, got {found}")]
    ArityMismatch { expected: Arity, found: usize },

    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),

    #[error("bytecode ended at offset {pc} without a return")]
    UnexpectedEndOfBytecode { pc: usize },

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("operand stack overflow (depth {depth})")]
    StackOverflow { depth: usize },

    #[error("nested applications exceeded the limit of {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("tail application is not supported")]
    TailApplyUnsupported,

    #[error("operand {0} does not fit in one byte")]
    OperandTooLarge(usize),

    #[error("jump at offset {from} cannot target earlier offset {to}")]
    BackwardJump { from: usize, to: usize },

    #[error("malformed function: {0}")]
    MalformedFunction(&'static str),

    #[error("a {0} object cannot be created without a native payload")]
    NotConstructible(ObjectType),
}

impl Error {
    /// Shorthand for a type mismatch against an object's actual type
    pub(crate) fn expected(expected: &'static str, found: ObjectType) -> Self {
        Error::TypeMismatch { expected, found }
    }

    /// Check if the error leaves the runtime unable to make progress
    ///
    /// User-level errors (undefined globals, type mismatches, bad arguments,
    /// runaway recursion) can be reported and the runtime reused. Exhaustion,
    /// dangling handles, corrupted bytecode and misbuilt functions cannot be
    /// recovered from by the program that caused them.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::TypeMismatch { .. }
            | Error::BoundsViolation { .. }
            | Error::UndefinedGlobal(_)
            | Error::NotAProcedure(_)
            | Error::ArityMismatch { .. }
            | Error::CallDepthExceeded { .. } => false,
            Error::InvalidHandle(_)
            | Error::OutOfHandles { .. }
            | Error::OutOfMemory { .. }
            | Error::UnpairedRelease(_)
            | Error::UnresolvedClosureVariable(_)
            | Error::InvalidOpcode(_)
            | Error::UnexpectedEndOfBytecode { .. }
            | Error::StackUnderflow
            | Error::StackOverflow { .. }
            | Error::TailApplyUnsupported
            | Error::OperandTooLarge(_)
            | Error::BackwardJump { .. }
            | Error::MalformedFunction(_)
            | Error::NotConstructible(_) => true,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OutOfMemory {
            requested: 64,
            available: 8,
        };
        assert_eq!(
            err.to_string(),
            "out of memory: requested 64 bytes, 8 available after collection"
        );
        assert_eq!(Error::InvalidHandle(Handle(3)).to_string(), "invalid handle #3");
        assert_eq!(Error::InvalidOpcode(0xff).to_string(), "invalid opcode 0xff");
        let err = Error::ArityMismatch {
            expected: Arity::Exact(1),
            found: 2,
        };
        assert_eq!(err.to_string(), "arity mismatch: expected exactly 1 arguments, got 2");
    }

    #[test]
    fn test_fatal_classification() {
        let fatal = [
            Error::InvalidHandle(Handle(7)),
            Error::OutOfHandles { limit: 4 },
            Error::OutOfMemory {
                requested: 64,
                available: 8,
            },
            Error::UnpairedRelease(Handle(2)),
            Error::UnresolvedClosureVariable(3),
            Error::InvalidOpcode(0xff),
            Error::UnexpectedEndOfBytecode { pc: 5 },
            Error::StackUnderflow,
            Error::StackOverflow { depth: 2 },
            Error::TailApplyUnsupported,
            Error::OperandTooLarge(300),
            Error::BackwardJump { from: 4, to: 0 },
            Error::MalformedFunction("more arguments than locals"),
            Error::NotConstructible(ObjectType::Primitive),
        ];
        for err in &fatal {
            assert!(err.is_fatal(), "{err} should be fatal");
        }

        let recoverable = [
            Error::expected("pair", ObjectType::Int),
            Error::BoundsViolation {
                index: 3,
                length: 2,
            },
            Error::UndefinedGlobal("foo".into()),
            Error::NotAProcedure(ObjectType::Int),
            Error::ArityMismatch {
                expected: Arity::Exact(1),
                found: 0,
            },
            Error::CallDepthExceeded { limit: 10_000 },
        ];
        for err in &recoverable {
            assert!(!err.is_fatal(), "{err} should be recoverable");
        }
    }
}
