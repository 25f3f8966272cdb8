//! Runtime instance
//!
//! The runtime is the main entry point. It owns the heap, with its object
//! store, arena and roots, and the interpreter, so any number of isolated
//! runtimes can coexist in one process.

use tracing::debug;

use crate::builtins;
use crate::error::Result;
use crate::gc::{GcStats, Heap, HeapConfig, MemoryStats};
use crate::value::Handle;
use crate::vm::{Interpreter, InterpreterStats};

/// A heap plus an interpreter, with the primitives installed
pub struct Runtime {
    /// Every managed object lives here
    heap: Heap,

    /// Bytecode interpreter
    interpreter: Interpreter,
}

impl Runtime {
    /// Create a runtime with the given heap configuration
    pub fn new(config: HeapConfig) -> Result<Self> {
        Self::with_interpreter(config, Interpreter::new())
    }

    /// Create a runtime around a configured interpreter
    pub fn with_interpreter(config: HeapConfig, interpreter: Interpreter) -> Result<Self> {
        let mut heap = Heap::new(config)?;
        builtins::install(&mut heap)?;
        Ok(Runtime { heap, interpreter })
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Run a function with `args` bound to its first locals
    ///
    /// On error the runtime stays usable: the current context is reset to
    /// nil and the retained set is put back as it was before the call.
    pub fn execute(&mut self, function: Handle, args: &[Handle]) -> Result<Handle> {
        #[cfg(feature = "dump")]
        if let Ok(listing) = crate::vm::disassemble(&self.heap, function) {
            debug!(%function, "executing\n{}", listing);
        }

        let retained = self.heap.roots().retained_snapshot();
        let result = self.interpreter.execute(&mut self.heap, function, args);
        if let Err(err) = &result {
            debug!(%function, error = %err, "execution failed");
            let roots = self.heap.roots_mut();
            roots.set_current_context(Handle::NIL);
            roots.restore_retained(retained);
        }
        result
    }

    /// Bind a global variable
    pub fn define_global(&mut self, name: &str, value: Handle) -> Result<()> {
        self.heap.define_global(name, value)
    }

    /// Get the value of a global variable, if it is bound
    pub fn global(&self, name: &str) -> Result<Option<Handle>> {
        match self.heap.find_symbol(name)? {
            Some(symbol) => self.heap.global(symbol),
            None => Ok(None),
        }
    }

    /// Run the garbage collector
    pub fn collect(&mut self) -> Result<Option<GcStats>> {
        let stats = self.heap.collect()?;
        #[cfg(feature = "dump")]
        debug!("after collection\n{}", self.heap.inspect());
        Ok(stats)
    }

    /// Get memory usage statistics
    pub fn memory_stats(&self) -> MemoryStats {
        self.heap.stats()
    }

    pub fn interpreter_stats(&self) -> InterpreterStats {
        self.interpreter.stats()
    }
}
