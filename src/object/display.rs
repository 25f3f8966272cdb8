//! Printer and heap object report
//!
//! Two forms:
//! - `display`: the readable form, `(1 2 . 3)`, `#(a b)`, `<function #7>`
//! - `dump`: one level deep with child handles, `(#1 . #2)`, for debugging

use std::fmt::Write;

use crate::error::Result;
use crate::gc::Heap;
use crate::value::{Handle, Object};

/// Nesting beyond this depth prints as `...`
pub const MAX_DISPLAY_DEPTH: usize = 64;

impl Heap {
    /// Render an object in readable form
    pub fn display(&self, handle: Handle) -> Result<String> {
        let mut out = String::new();
        self.write_display(handle, &mut out, 0)?;
        Ok(out)
    }

    fn write_display(&self, handle: Handle, out: &mut String, depth: usize) -> Result<()> {
        if depth > MAX_DISPLAY_DEPTH {
            out.push_str("...");
            return Ok(());
        }
        match self.dereference(handle)? {
            Object::Nil => out.push_str("nil"),
            Object::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Object::Float(n) => {
                let _ = write!(out, "{:.6}", n);
            }
            Object::Symbol(name) => out.push_str(name),
            Object::Pair { first, rest } => {
                out.push('(');
                self.write_display(*first, out, depth + 1)?;
                let mut cursor = *rest;
                let mut shown = 1;
                while !cursor.is_nil() {
                    if shown > MAX_DISPLAY_DEPTH {
                        out.push_str(" ...");
                        break;
                    }
                    match self.dereference(cursor)? {
                        Object::Pair { first, rest } => {
                            out.push(' ');
                            self.write_display(*first, out, depth + 1)?;
                            cursor = *rest;
                        }
                        _ => {
                            out.push_str(" . ");
                            self.write_display(cursor, out, depth + 1)?;
                            break;
                        }
                    }
                    shown += 1;
                }
                out.push(')');
            }
            Object::Vector(slots) => {
                out.push_str("#(");
                for (i, &slot) in slots.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write_display(slot, out, depth + 1)?;
                }
                out.push(')');
            }
            Object::Bytes(_) => {
                let _ = write!(out, "<bytevector {}>", handle);
            }
            Object::Function(_) => {
                let _ = write!(out, "<function {}>", handle);
            }
            Object::Primitive(_) => {
                let _ = write!(out, "<primitive {}>", handle);
            }
            Object::Context(_) => {
                let _ = write!(out, "<continuation {}>", handle);
            }
        }
        Ok(())
    }

    /// Render an object one level deep, naming children by handle
    pub fn dump(&self, handle: Handle) -> Result<String> {
        let object = self.dereference(handle)?;
        Ok(match object {
            Object::Nil => "nil".to_string(),
            Object::Int(n) => n.to_string(),
            Object::Float(n) => format!("{:.6}", n),
            Object::Symbol(name) => format!("'{}", name),
            Object::Pair { first, rest } => format!("({} . {})", first, rest),
            Object::Vector(slots) => {
                let items: Vec<String> = slots.iter().map(|h| h.to_string()).collect();
                format!("#({})", items.join(" "))
            }
            Object::Bytes(bytes) => {
                let items: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                format!("#u8({})", items.join(" "))
            }
            Object::Function(f) => format!(
                "<function code={} literals={} closure={} args={} locals={} stack={}>",
                f.bytecode, f.literals, f.closure, f.arg_count, f.local_count, f.stack_size
            ),
            Object::Primitive(p) => format!("<primitive {} ({})>", p.name, p.arity),
            Object::Context(c) => format!(
                "<continuation function={} locals={} stack={} prior={} pc={} sp={}>",
                c.function, c.locals, c.stack, c.prior, c.pc, c.sp
            ),
        })
    }

    /// Report every object in the arena, in arena order
    ///
    /// One line per cell: arena index, handle, type, reserved size and dump
    /// form. Cells vacated by a relocation are reported as moved.
    pub fn inspect(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "heap: {} objects, {}/{} bytes used, {} collections",
            stats.live_objects, stats.used, stats.capacity, stats.collections
        );
        let mut index = 0;
        while let Some(handle) = self.cell_owner(index) {
            let current = self.address_of(handle).ok() == Some(index);
            match (current, self.dereference(handle)) {
                (true, Ok(object)) => {
                    let size = self.size_of(handle).unwrap_or(0);
                    let dump = self.dump(handle).unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{:5} {:>6} {:<20} {:5} {}",
                        index,
                        handle.to_string(),
                        object.object_type().name(),
                        size,
                        dump
                    );
                }
                _ => {
                    let _ = writeln!(out, "{:5} {:>6} (moved)", index, handle.to_string());
                }
            }
            index += 1;
        }
        out
    }
}
