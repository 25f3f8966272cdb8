//! Collection roots
//!
//! Four fixed roots (nil, the global bindings, the symbol list and the
//! current context) plus an ordered set of temporarily retained handles.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::value::Handle;

/// Handles a collection treats as unconditionally reachable
#[derive(Debug, Default)]
pub struct RootSet {
    globals: Handle,
    symbols: Handle,
    context: Handle,
    retained: BTreeSet<Handle>,
}

impl RootSet {
    /// Create a root set with every fixed root at nil
    pub fn new() -> Self {
        RootSet::default()
    }

    /// Head of the global binding list
    #[inline]
    pub fn globals(&self) -> Handle {
        self.globals
    }

    /// Head of the interned symbol list
    #[inline]
    pub fn symbols(&self) -> Handle {
        self.symbols
    }

    /// The executing context, nil when the interpreter is idle
    #[inline]
    pub fn current_context(&self) -> Handle {
        self.context
    }

    pub(crate) fn set_globals(&mut self, head: Handle) {
        self.globals = head;
    }

    pub(crate) fn set_symbols(&mut self, head: Handle) {
        self.symbols = head;
    }

    pub(crate) fn set_current_context(&mut self, context: Handle) {
        self.context = context;
    }

    /// Add a handle to the retained set
    ///
    /// Returns false if it was already retained.
    pub(crate) fn retain(&mut self, handle: Handle) -> bool {
        self.retained.insert(handle)
    }

    /// Remove a handle from the retained set
    pub(crate) fn unretain(&mut self, handle: Handle) -> Result<()> {
        if self.retained.remove(&handle) {
            Ok(())
        } else {
            Err(Error::UnpairedRelease(handle))
        }
    }

    /// Remove a handle this crate retained itself
    pub(crate) fn release(&mut self, handle: Handle) {
        self.retained.remove(&handle);
    }

    /// Check if a handle is in the retained set
    pub fn is_retained(&self, handle: Handle) -> bool {
        self.retained.contains(&handle)
    }

    /// Number of retained handles
    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    pub(crate) fn retained_snapshot(&self) -> BTreeSet<Handle> {
        self.retained.clone()
    }

    /// Put the retained set back to an earlier snapshot
    pub(crate) fn restore_retained(&mut self, snapshot: BTreeSet<Handle>) {
        self.retained = snapshot;
    }

    /// Iterate over every root: nil, the fixed roots, then the retained set
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        [Handle::NIL, self.globals, self.symbols, self.context]
            .into_iter()
            .chain(self.retained.iter().copied())
    }
}
