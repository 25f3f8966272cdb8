//! Bytecode listing

use std::fmt::Write;

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Handle, ObjectType};
use crate::vm::opcode::{ARGUMENT_THRESHOLD, OpCode};

/// Render a function's metadata, literal pool and bytecode
///
/// Function literals are listed after their parent. Bytes that are not a
/// known opcode are shown as `???` rather than rejected.
pub fn disassemble(heap: &Heap, function: Handle) -> Result<String> {
    let mut out = String::new();
    write_function(heap, function, &mut out)?;
    Ok(out)
}

fn write_function(heap: &Heap, function: Handle, out: &mut String) -> Result<()> {
    let meta = heap.function(function)?;
    let _ = writeln!(out, "{} stack, {} vars", meta.stack_size, meta.local_count);
    let _ = writeln!(out, "literals: {}", heap.display(meta.literals)?);
    out.push_str("bytecode:\n");

    let code = heap.bytes_contents(meta.bytecode)?;
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        let op = OpCode::from_u8(byte);
        let name = op.map_or("???", OpCode::name);
        if byte <= ARGUMENT_THRESHOLD {
            let _ = writeln!(out, "{:02x}\t{:<14}", byte, name);
            pc += 1;
            continue;
        }

        let arg = *code
            .get(pc + 1)
            .ok_or(Error::UnexpectedEndOfBytecode { pc })?;
        let _ = write!(out, "{:02x} {:02x}\t{:<14} {:>3}", byte, arg, name, arg);
        if matches!(
            op,
            Some(OpCode::Literal | OpCode::Global | OpCode::SetGlobal)
        ) {
            let literal = heap.vector_ref(meta.literals, arg as usize)?;
            let _ = write!(out, " ({})", heap.display(literal)?);
        }
        out.push('\n');
        pc += 2;
    }

    for i in 0..heap.vector_length(meta.literals)? {
        let literal = heap.vector_ref(meta.literals, i)?;
        if heap.type_of(literal)? == ObjectType::Function {
            let _ = writeln!(out, "\n{}", heap.display(literal)?);
            write_function(heap, literal, out)?;
        }
    }
    Ok(())
}
