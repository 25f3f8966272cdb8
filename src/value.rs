//! Heap object representation
//!
//! Every managed object is named by a [`Handle`], a small integer indexing the
//! object store. The store maps the handle to the arena cell currently holding
//! the object, so objects move during collection while their handles stay put.
//!
//! # Object layout
//! An object is a type tag, a total byte size (header included) and a payload
//! whose shape depends on the tag. Payloads live in ordinary Rust values, but
//! every object is charged a byte size so the arena can enforce its capacity
//! the way a raw memory region would:
//!
//! ```text
//! +--------+--------+---------------------------+
//! |  tag   |  size  |  payload (shape per tag)  |
//! +--------+--------+---------------------------+
//!  \____ HEADER_SIZE ____/
//! ```

use std::fmt;

use crate::error::Result;
use crate::gc::Heap;

/// Bytes charged for the tag and size fields of every object
pub const HEADER_SIZE: usize = 16;

/// Bytes charged for one handle field
pub const HANDLE_SIZE: usize = std::mem::size_of::<Handle>();

/// Bytes charged for the length field of vectors and byte-buffers
pub const LENGTH_SIZE: usize = 4;

/// Bytes charged for a machine word (counters, native pointers)
const WORD_SIZE: usize = 8;

/// Opaque, stable identifier of a managed object
///
/// Handle 0 is permanently bound to the nil object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Handle(pub u16);

impl Handle {
    /// The empty list / false sentinel
    pub const NIL: Handle = Handle(0);

    /// Index of this handle in the object store
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the nil handle
    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object type tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// The unique empty/false sentinel
    Nil = 0,
    /// Fixed-width signed integer
    Int = 1,
    /// Double-precision float
    Float = 2,
    /// Pair of handles (cons cell)
    Pair = 3,
    /// Interned name
    Symbol = 4,
    /// Sequence of handle slots
    Vector = 5,
    /// Sequence of raw bytes
    Bytes = 6,
    /// Compiled code metadata
    Function = 7,
    /// Native procedure
    Primitive = 8,
    /// Activation record
    Context = 9,
}

impl ObjectType {
    pub const COUNT: usize = 10;

    /// Name used by diagnostics and the `type-of` primitive
    pub const fn name(self) -> &'static str {
        match self {
            ObjectType::Nil => "nil",
            ObjectType::Int => "integer",
            ObjectType::Float => "float",
            ObjectType::Pair => "pair",
            ObjectType::Symbol => "symbol",
            ObjectType::Vector => "vector",
            ObjectType::Bytes => "bytevector",
            ObjectType::Function => "procedure",
            ObjectType::Primitive => "primitive-procedure",
            ObjectType::Context => "continuation",
        }
    }

    /// Size of an object of this type with an empty variable-length part
    pub const fn base_size(self) -> usize {
        HEADER_SIZE
            + match self {
                ObjectType::Nil => 0,
                ObjectType::Int | ObjectType::Float => WORD_SIZE,
                ObjectType::Pair => 2 * HANDLE_SIZE,
                ObjectType::Symbol => 1,
                ObjectType::Vector | ObjectType::Bytes => LENGTH_SIZE,
                ObjectType::Function => 3 * WORD_SIZE + 3 * HANDLE_SIZE,
                ObjectType::Primitive => LENGTH_SIZE + WORD_SIZE,
                ObjectType::Context => 4 * HANDLE_SIZE + 2 * WORD_SIZE,
            }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiled function metadata
///
/// Produced by the compiler (see [`crate::vm::FunctionBuilder`]). The closure
/// field is the lexical parent context, nil until a `bind-closure` stamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    /// Maximum operand-stack depth
    pub stack_size: usize,
    /// Number of local variable slots (arguments included)
    pub local_count: usize,
    /// Number of arguments
    pub arg_count: usize,
    /// Byte-buffer holding the bytecode
    pub bytecode: Handle,
    /// Vector holding the literal pool
    pub literals: Handle,
    /// Context this function closes over
    pub closure: Handle,
}

/// Declared arity of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// This many arguments or more
    AtLeast(usize),
}

impl Arity {
    /// Check if an argument count is acceptable
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Native procedure signature
///
/// Primitives receive the heap and a vector holding their arguments.
pub type PrimitiveFn = fn(&mut Heap, Handle) -> Result<Handle>;

/// Native procedure reference
#[derive(Clone, Copy)]
pub struct Primitive {
    /// Name the primitive is installed under
    pub name: &'static str,
    /// Declared arity
    pub arity: Arity,
    /// The native procedure
    pub procedure: PrimitiveFn,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Activation record
///
/// `prior` is the dynamic caller. The lexical parent is reached through the
/// function's closure field instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Function being executed
    pub function: Handle,
    /// Vector of local variables
    pub locals: Handle,
    /// Vector backing the operand stack
    pub stack: Handle,
    /// Context to return into
    pub prior: Handle,
    /// Program counter (offset into bytecode)
    pub pc: usize,
    /// Operand stack pointer
    pub sp: usize,
}

/// A managed object
#[derive(Debug, Clone)]
pub enum Object {
    Nil,
    Int(i64),
    Float(f64),
    Pair { first: Handle, rest: Handle },
    Symbol(Box<str>),
    Vector(Vec<Handle>),
    Bytes(Vec<u8>),
    Function(Function),
    Primitive(Primitive),
    Context(Context),
}

impl Object {
    /// Get the type tag
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Object::Nil => ObjectType::Nil,
            Object::Int(_) => ObjectType::Int,
            Object::Float(_) => ObjectType::Float,
            Object::Pair { .. } => ObjectType::Pair,
            Object::Symbol(_) => ObjectType::Symbol,
            Object::Vector(_) => ObjectType::Vector,
            Object::Bytes(_) => ObjectType::Bytes,
            Object::Function(_) => ObjectType::Function,
            Object::Primitive(_) => ObjectType::Primitive,
            Object::Context(_) => ObjectType::Context,
        }
    }

    /// Exact size in bytes (header included), without slack
    pub fn size(&self) -> usize {
        let base = self.object_type().base_size();
        match self {
            Object::Symbol(name) => base + name.len(),
            Object::Vector(slots) => base + slots.len() * HANDLE_SIZE,
            Object::Bytes(bytes) => base + bytes.len(),
            _ => base,
        }
    }

    /// Append every handle field of this object to `out`
    ///
    /// Byte-buffers, symbols and numbers have no handle fields.
    pub fn trace(&self, out: &mut Vec<Handle>) {
        match self {
            Object::Pair { first, rest } => {
                out.push(*first);
                out.push(*rest);
            }
            Object::Vector(slots) => out.extend_from_slice(slots),
            Object::Function(f) => {
                out.push(f.bytecode);
                out.push(f.literals);
                out.push(f.closure);
            }
            Object::Context(c) => {
                out.push(c.function);
                out.push(c.locals);
                out.push(c.stack);
                out.push(c.prior);
            }
            Object::Nil
            | Object::Int(_)
            | Object::Float(_)
            | Object::Symbol(_)
            | Object::Bytes(_)
            | Object::Primitive(_) => {}
        }
    }

    /// Default-initialised object of the given type
    ///
    /// Variable-length kinds get as many nil slots or zero bytes as fit in
    /// `extra` bytes. Returns `None` for the kinds that cannot be created
    /// without a native payload (nil is a singleton, primitives need code).
    pub fn zeroed(ty: ObjectType, extra: usize) -> Option<Object> {
        Some(match ty {
            ObjectType::Nil | ObjectType::Primitive => return None,
            ObjectType::Int => Object::Int(0),
            ObjectType::Float => Object::Float(0.0),
            ObjectType::Pair => Object::Pair {
                first: Handle::NIL,
                rest: Handle::NIL,
            },
            ObjectType::Symbol => Object::Symbol(Box::from("")),
            ObjectType::Vector => Object::Vector(vec![Handle::NIL; extra / HANDLE_SIZE]),
            ObjectType::Bytes => Object::Bytes(vec![0; extra]),
            ObjectType::Function => Object::Function(Function {
                stack_size: 0,
                local_count: 0,
                arg_count: 0,
                bytecode: Handle::NIL,
                literals: Handle::NIL,
                closure: Handle::NIL,
            }),
            ObjectType::Context => Object::Context(Context {
                function: Handle::NIL,
                locals: Handle::NIL,
                stack: Handle::NIL,
                prior: Handle::NIL,
                pc: 0,
                sp: 0,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_handle() {
        assert!(Handle::NIL.is_nil());
        assert!(!Handle(1).is_nil());
        assert_eq!(Handle::default(), Handle::NIL);
        assert_eq!(format!("{}", Handle(42)), "#42");
        assert_eq!(Handle(7).index(), 7);
    }

    #[test]
    fn test_object_sizes() {
        assert_eq!(Object::Nil.size(), HEADER_SIZE);
        assert_eq!(Object::Int(5).size(), HEADER_SIZE + 8);
        assert_eq!(
            Object::Bytes(b"Hello\0".to_vec()).size(),
            HEADER_SIZE + LENGTH_SIZE + 6
        );
        assert_eq!(
            Object::Vector(vec![Handle::NIL; 3]).size(),
            HEADER_SIZE + LENGTH_SIZE + 3 * HANDLE_SIZE
        );
        assert_eq!(Object::Symbol(Box::from("abc")).size(), HEADER_SIZE + 1 + 3);
    }

    #[test]
    fn test_trace_pair_and_vector() {
        let mut out = Vec::new();
        Object::Pair {
            first: Handle(3),
            rest: Handle(4),
        }
        .trace(&mut out);
        Object::Vector(vec![Handle(5), Handle::NIL]).trace(&mut out);
        assert_eq!(out, vec![Handle(3), Handle(4), Handle(5), Handle::NIL]);
    }

    #[test]
    fn test_trace_function_includes_closure() {
        let mut out = Vec::new();
        Object::Function(Function {
            stack_size: 1,
            local_count: 0,
            arg_count: 0,
            bytecode: Handle(1),
            literals: Handle(2),
            closure: Handle(9),
        })
        .trace(&mut out);
        assert_eq!(out, vec![Handle(1), Handle(2), Handle(9)]);
    }

    #[test]
    fn test_trace_leaves() {
        let mut out = Vec::new();
        Object::Bytes(vec![1, 2, 3]).trace(&mut out);
        Object::Int(1).trace(&mut out);
        Object::Symbol(Box::from("x")).trace(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_zeroed() {
        assert!(Object::zeroed(ObjectType::Nil, 0).is_none());
        assert!(Object::zeroed(ObjectType::Primitive, 0).is_none());
        match Object::zeroed(ObjectType::Vector, 3 * HANDLE_SIZE) {
            Some(Object::Vector(slots)) => assert_eq!(slots, vec![Handle::NIL; 3]),
            other => panic!("unexpected {:?}", other),
        }
        match Object::zeroed(ObjectType::Bytes, 4) {
            Some(Object::Bytes(bytes)) => assert_eq!(bytes, vec![0; 4]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert_eq!(Arity::AtLeast(1).to_string(), "at least 1");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ObjectType::Bytes.name(), "bytevector");
        assert_eq!(Object::Float(1.5).object_type(), ObjectType::Float);
        assert_eq!(ObjectType::Context.to_string(), "continuation");
    }
}
