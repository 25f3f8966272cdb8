//! Symbols and global bindings
//!
//! Interned symbols form a list rooted at the symbol root, so interning the
//! same name twice yields the same handle. Global variables are an
//! association list of `(symbol . value)` entries rooted at the globals root.

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Handle, Object};

/// Name of the canonical true value
pub const TRUE_SYMBOL: &str = "t";

impl Heap {
    /// Look up an interned symbol without creating it
    pub fn find_symbol(&self, name: &str) -> Result<Option<Handle>> {
        let mut cursor = self.roots().symbols();
        while !cursor.is_nil() {
            let symbol = self.first(cursor)?;
            if self.symbol_name(symbol)? == name {
                return Ok(Some(symbol));
            }
            cursor = self.rest(cursor)?;
        }
        Ok(None)
    }

    /// Get the symbol for `name`, creating it on first use
    pub fn intern(&mut self, name: &str) -> Result<Handle> {
        if let Some(symbol) = self.find_symbol(name)? {
            return Ok(symbol);
        }
        let symbol = self.allocate(Object::Symbol(Box::from(name)))?;
        let symbols = self.roots().symbols();
        let head = self.cons(symbol, symbols)?;
        self.roots_mut().set_symbols(head);
        Ok(symbol)
    }

    /// Get the name of a symbol
    pub fn symbol_name(&self, symbol: Handle) -> Result<&str> {
        match self.dereference(symbol)? {
            Object::Symbol(name) => Ok(name),
            other => Err(Error::expected("symbol", other.object_type())),
        }
    }

    /// Check if an object is a symbol
    pub fn is_symbol(&self, handle: Handle) -> Result<bool> {
        Ok(matches!(self.dereference(handle)?, Object::Symbol(_)))
    }

    /// The canonical true value (the symbol `t`)
    pub fn truth(&mut self) -> Result<Handle> {
        self.intern(TRUE_SYMBOL)
    }

    /// Convert a Rust boolean to `t` or nil
    pub fn boolean(&mut self, value: bool) -> Result<Handle> {
        if value { self.truth() } else { Ok(Handle::NIL) }
    }

    /// Get the value bound to a global symbol
    pub fn global(&self, symbol: Handle) -> Result<Option<Handle>> {
        self.symbol_name(symbol)?;
        match self.alist_get(self.roots().globals(), symbol)? {
            Some(entry) => Ok(Some(self.rest(entry)?)),
            None => Ok(None),
        }
    }

    /// Bind a global symbol, replacing any previous value
    pub fn set_global(&mut self, symbol: Handle, value: Handle) -> Result<()> {
        self.symbol_name(symbol)?;
        let globals = self.roots().globals();
        let head = self.alist_set(globals, symbol, value)?;
        self.roots_mut().set_globals(head);
        Ok(())
    }

    /// Bind a global by name
    pub fn define_global(&mut self, name: &str, value: Handle) -> Result<()> {
        self.locate(value)?;
        let symbol = self.protecting(&[value], |heap| heap.intern(name))?;
        self.set_global(symbol, value)
    }
}
