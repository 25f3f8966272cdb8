//! Arena allocator and object store
//!
//! Memory layout:
//! ```text
//!   object store (handle table)        arena (bump allocated, grows →)
//! +----+----+----+----+----+        +-------+--------+-----------+-------------+
//! | #0 | #1 | #2 | #3 | .. |  --->  |  nil  |  pair  |  vector   | free space  |
//! +----+----+----+----+----+        +-------+--------+-----------+-------------+
//!   free list: #5 → #9 → ..                                       ^ frontier
//! ```
//!
//! Objects are only ever reached through their handle. The arena is a vector
//! of cells addressed by index. A cell remembers the byte size its object was
//! allocated with, so capacity is enforced in bytes even though the payload
//! lives in ordinary Rust values. Each arena carries an epoch; a store entry
//! whose epoch differs from the live arena's points at a dead region.

use tracing::{debug, warn};

use super::roots::RootSet;
use crate::error::{Error, Result};
use crate::value::{Handle, Object, ObjectType};

/// Default arena capacity (1 MiB)
pub const DEFAULT_ARENA_CAPACITY: usize = 1024 * 1024;

/// Default number of object store slots
pub const MAX_HANDLES: usize = 0xffff;

/// Largest store a 16-bit handle can address
const HANDLE_SPACE: usize = u16::MAX as usize + 1;

/// Heap configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Arena capacity in bytes
    pub arena_capacity: usize,
    /// Number of object store slots (handle 0 included)
    pub max_handles: usize,
    /// Collect before an allocation once this many allocations happened
    /// since the last collection
    pub collect_every: Option<usize>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            max_handles: MAX_HANDLES,
            collect_every: if cfg!(feature = "debug-gc") {
                Some(1)
            } else {
                None
            },
        }
    }
}

impl HeapConfig {
    /// Set the arena capacity in bytes
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.arena_capacity = bytes;
        self
    }

    /// Set the number of object store slots
    pub fn with_max_handles(mut self, handles: usize) -> Self {
        self.max_handles = handles;
        self
    }

    /// Collect before every `n`th allocation. Zero turns the threshold off.
    pub fn with_collect_every(mut self, n: usize) -> Self {
        self.collect_every = (n > 0).then_some(n);
        self
    }
}

/// Where an object currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    pub(super) epoch: u32,
    pub(super) index: usize,
}

/// One arena slot
#[derive(Debug)]
pub(super) struct Cell {
    /// Owner of this cell
    pub(super) handle: Handle,
    /// Reserved bytes, header and slack included
    pub(super) size: usize,
    /// `None` once the object was relocated out of this cell
    pub(super) object: Option<Object>,
}

/// A bump-allocated region
#[derive(Debug)]
pub(super) struct Arena {
    pub(super) cells: Vec<Cell>,
    pub(super) used: usize,
    pub(super) capacity: usize,
    pub(super) epoch: u32,
}

impl Arena {
    fn new(capacity: usize, epoch: u32) -> Self {
        Arena {
            cells: Vec::new(),
            used: 0,
            capacity,
            epoch,
        }
    }

    /// Create an arena with room for `cells` objects up front
    ///
    /// Fails when the host cannot provide the memory.
    pub(super) fn with_reserved(capacity: usize, epoch: u32, cells: usize) -> Result<Self> {
        let mut arena = Arena::new(capacity, epoch);
        arena
            .cells
            .try_reserve_exact(cells)
            .map_err(|_| Error::OutOfMemory {
                requested: capacity,
                available: 0,
            })?;
        Ok(arena)
    }

    #[inline]
    pub(super) fn available(&self) -> usize {
        self.capacity.saturating_sub(self.used)
    }

    #[inline]
    fn is_frontier(&self, index: usize) -> bool {
        index + 1 == self.cells.len()
    }

    /// Store a cell whose bytes were already accounted for
    pub(super) fn place(&mut self, cell: Cell) -> Location {
        self.cells.push(cell);
        Location {
            epoch: self.epoch,
            index: self.cells.len() - 1,
        }
    }

    /// Account for and store a cell
    pub(super) fn copy_in(&mut self, cell: Cell) -> Location {
        self.used += cell.size;
        self.place(cell)
    }
}

/// Handle table: handle → location, with a free list of released slots
#[derive(Debug)]
pub(super) struct ObjectStore {
    slots: Vec<Option<Location>>,
    free: Vec<Handle>,
    limit: usize,
}

impl ObjectStore {
    fn new(limit: usize) -> Self {
        ObjectStore {
            slots: Vec::new(),
            free: Vec::new(),
            limit: limit.clamp(1, HANDLE_SPACE),
        }
    }

    #[inline]
    pub(super) fn location(&self, handle: Handle) -> Option<Location> {
        self.slots.get(handle.index()).copied().flatten()
    }

    fn has_free(&self) -> bool {
        !self.free.is_empty() || self.slots.len() < self.limit
    }

    fn acquire(&mut self) -> Result<Handle> {
        if let Some(handle) = self.free.pop() {
            return Ok(handle);
        }
        if self.slots.len() < self.limit {
            let handle = Handle(self.slots.len() as u16);
            self.slots.push(None);
            return Ok(handle);
        }
        Err(Error::OutOfHandles { limit: self.limit })
    }

    pub(super) fn bind(&mut self, handle: Handle, location: Location) {
        if let Some(slot) = self.slots.get_mut(handle.index()) {
            *slot = Some(location);
        }
    }

    /// Free every entry that does not point into the `live` epoch
    pub(super) fn release_stale(&mut self, live: u32) -> usize {
        let mut released = 0;
        // Highest first so the free list hands out low handles first
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if matches!(slot, Some(location) if location.epoch != live) {
                *slot = None;
                self.free.push(Handle(index as u16));
                released += 1;
            }
        }
        released
    }

    pub(super) fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| Handle(index as u16))
    }
}

/// Memory usage snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Arena capacity in bytes
    pub capacity: usize,
    /// Bytes reserved in the arena, garbage included
    pub used: usize,
    /// Bytes left before the frontier reaches capacity
    pub available: usize,
    /// Handles currently bound to an object
    pub live_objects: usize,
    /// Collections run so far
    pub collections: usize,
}

/// The managed heap
///
/// Owns the object store, the current arena and the root set. Every object
/// operation in the crate goes through a `&mut Heap`.
#[derive(Debug)]
pub struct Heap {
    pub(super) config: HeapConfig,
    pub(super) store: ObjectStore,
    pub(super) arena: Arena,
    pub(super) roots: RootSet,
    /// Nesting depth of `disable_gc`
    pub(super) gc_suspended: usize,
    pub(super) allocs_since_collection: usize,
    pub(super) collections: usize,
    /// Scratch buffer for tracing, reused across collections
    pub(super) worklist: Vec<Handle>,
}

impl Heap {
    /// Create a heap and bind handle 0 to nil
    pub fn new(config: HeapConfig) -> Result<Self> {
        let mut heap = Heap {
            config,
            store: ObjectStore::new(config.max_handles),
            arena: Arena::new(config.arena_capacity, 0),
            roots: RootSet::new(),
            gc_suspended: 0,
            allocs_since_collection: 0,
            collections: 0,
            worklist: Vec::new(),
        };
        // Nothing is bound yet, so a collection here would find no nil root
        let nil = heap.without_gc(|heap| heap.allocate(Object::Nil))?;
        debug_assert_eq!(nil, Handle::NIL);
        Ok(heap)
    }

    /// Get the configuration this heap was created with
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Arena capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity
    }

    /// Bytes reserved in the arena
    #[inline]
    pub fn used(&self) -> usize {
        self.arena.used
    }

    /// Bytes left before the frontier reaches capacity
    #[inline]
    pub fn available_space(&self) -> usize {
        self.arena.available()
    }

    /// Number of collections run so far
    #[inline]
    pub fn collections(&self) -> usize {
        self.collections
    }

    /// Get a memory usage snapshot
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            capacity: self.arena.capacity,
            used: self.arena.used,
            available: self.arena.available(),
            live_objects: self.store.live(),
            collections: self.collections,
        }
    }

    /// Iterate over every live handle in ascending order
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.store.handles()
    }

    /// Get the root set
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    pub(crate) fn roots_mut(&mut self) -> &mut RootSet {
        &mut self.roots
    }

    pub(crate) fn locate(&self, handle: Handle) -> Result<Location> {
        match self.store.location(handle) {
            Some(location) if location.epoch == self.arena.epoch => Ok(location),
            _ => Err(Error::InvalidHandle(handle)),
        }
    }

    /// Check if a handle is bound to a live object
    pub fn is_live(&self, handle: Handle) -> bool {
        self.locate(handle).is_ok()
    }

    /// Resolve a handle to its object
    ///
    /// Access is read-only outside this crate; objects change only through
    /// the typed setters.
    ///
    /// ```compile_fail
    /// use lilscheme::{Handle, Heap, HeapConfig};
    ///
    /// let mut heap = Heap::new(HeapConfig::default()).unwrap();
    /// let _ = heap.dereference_mut(Handle::NIL);
    /// ```
    pub fn dereference(&self, handle: Handle) -> Result<&Object> {
        let location = self.locate(handle)?;
        self.arena.cells[location.index]
            .object
            .as_ref()
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Resolve a handle to its object, mutably
    pub(crate) fn dereference_mut(&mut self, handle: Handle) -> Result<&mut Object> {
        let location = self.locate(handle)?;
        self.arena.cells[location.index]
            .object
            .as_mut()
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Current arena index of an object
    ///
    /// Only meaningful until the next allocation.
    pub fn address_of(&self, handle: Handle) -> Result<usize> {
        Ok(self.locate(handle)?.index)
    }

    /// Get the type tag of an object
    pub fn type_of(&self, handle: Handle) -> Result<ObjectType> {
        Ok(self.dereference(handle)?.object_type())
    }

    /// Get the reserved size of an object in bytes, slack included
    pub fn size_of(&self, handle: Handle) -> Result<usize> {
        let location = self.locate(handle)?;
        Ok(self.arena.cells[location.index].size)
    }

    /// Check if an object is the last one before the frontier
    pub fn is_at_frontier(&self, handle: Handle) -> Result<bool> {
        let location = self.locate(handle)?;
        Ok(self.arena.is_frontier(location.index))
    }

    /// Allocate a new object and return its handle
    ///
    /// The handles inside `object` are protected while the allocation runs,
    /// so a collection triggered here cannot free them. The returned handle
    /// itself is not rooted.
    pub fn allocate(&mut self, object: Object) -> Result<Handle> {
        let size = object.size();
        self.allocate_sized(object, size)
    }

    /// Create a default-initialised object of the given type
    ///
    /// `extra` bytes are added to the type's base size. Vectors and
    /// byte-buffers use them as nil slots and zero bytes respectively; the
    /// other kinds carry them as slack.
    pub fn create_object(&mut self, ty: ObjectType, extra: usize) -> Result<Handle> {
        let object = Object::zeroed(ty, extra).ok_or(Error::NotConstructible(ty))?;
        let size = (ty.base_size() + extra).max(object.size());
        self.allocate_sized(object, size)
    }

    fn allocate_sized(&mut self, object: Object, size: usize) -> Result<Handle> {
        let mut children = Vec::new();
        object.trace(&mut children);
        for &child in &children {
            self.locate(child)?;
        }
        self.protecting(&children, |heap| heap.place(object, size))
    }

    fn place(&mut self, object: Object, size: usize) -> Result<Handle> {
        if !self.store.has_free() {
            self.collect()?;
            if !self.store.has_free() {
                warn!(limit = self.store.limit, "object store exhausted");
                return Err(Error::OutOfHandles {
                    limit: self.store.limit,
                });
            }
        }
        self.reserve(size)?;
        let handle = self.store.acquire()?;
        let location = self.arena.place(Cell {
            handle,
            size,
            object: Some(object),
        });
        self.store.bind(handle, location);
        Ok(handle)
    }

    /// Reserve `size` bytes at the frontier, collecting first when needed
    fn reserve(&mut self, size: usize) -> Result<()> {
        let due = self
            .config
            .collect_every
            .is_some_and(|n| n > 0 && self.allocs_since_collection >= n);
        if size > self.arena.available() || due {
            self.collect()?;
            if size > self.arena.available() {
                warn!(
                    requested = size,
                    available = self.arena.available(),
                    "arena exhausted"
                );
                return Err(Error::OutOfMemory {
                    requested: size,
                    available: self.arena.available(),
                });
            }
        }
        self.allocs_since_collection += 1;
        self.arena.used += size;
        Ok(())
    }

    /// Extend an object's reserved size by `extra` bytes
    ///
    /// An object sitting at the frontier grows in place without a
    /// collection. Otherwise it is moved to the frontier with the larger
    /// size, which may collect first. The handle is unchanged either way.
    pub fn grow(&mut self, handle: Handle, extra: usize) -> Result<()> {
        let location = self.locate(handle)?;
        if self.arena.is_frontier(location.index) && extra <= self.arena.available() {
            self.without_gc(|heap| heap.reserve(extra))?;
            self.arena.cells[location.index].size += extra;
            debug!(%handle, extra, "grew in place");
            return Ok(());
        }

        let new_size = self.arena.cells[location.index].size + extra;
        self.protecting(&[handle], |heap| heap.reserve(new_size))?;

        // The reservation may have collected, so look the object up again
        let location = self.locate(handle)?;
        let object = self.arena.cells[location.index]
            .object
            .take()
            .ok_or(Error::InvalidHandle(handle))?;
        let moved = self.arena.place(Cell {
            handle,
            size: new_size,
            object: Some(object),
        });
        self.store.bind(handle, moved);
        debug!(%handle, from = location.index, to = moved.index, new_size, "relocated to grow");
        Ok(())
    }

    /// Shrink an object's reserved size to its exact size
    ///
    /// The freed bytes stay unusable until the next collection.
    pub(crate) fn trim_slack(&mut self, handle: Handle) -> Result<()> {
        let location = self.locate(handle)?;
        let cell = &mut self.arena.cells[location.index];
        if let Some(object) = &cell.object {
            cell.size = object.size();
        }
        Ok(())
    }

    /// Suspend collection until the matching `enable_gc`
    pub fn disable_gc(&mut self) {
        self.gc_suspended += 1;
    }

    /// Resume collection suspended by `disable_gc`
    pub fn enable_gc(&mut self) {
        self.gc_suspended = self.gc_suspended.saturating_sub(1);
    }

    /// Check if collection is currently allowed
    #[inline]
    pub fn gc_enabled(&self) -> bool {
        self.gc_suspended == 0
    }

    /// Run `f` with collection suspended
    pub fn without_gc<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.disable_gc();
        let result = f(self);
        self.enable_gc();
        result
    }

    /// Add a handle to the retained set
    ///
    /// Retaining an already retained handle has no further effect.
    pub fn retain(&mut self, handle: Handle) -> Result<()> {
        self.locate(handle)?;
        self.roots.retain(handle);
        Ok(())
    }

    /// Remove a handle from the retained set
    pub fn unretain(&mut self, handle: Handle) -> Result<()> {
        self.roots.unretain(handle)
    }

    /// Run `f` with `handles` temporarily retained
    ///
    /// Handles that were already retained stay retained afterwards; the
    /// others are released whether or not `f` succeeds.
    pub fn protecting<T>(
        &mut self,
        handles: &[Handle],
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let guarded: Vec<Handle> = handles
            .iter()
            .copied()
            .filter(|&h| !h.is_nil() && self.roots.retain(h))
            .collect();
        let result = f(self);
        for handle in guarded {
            self.roots.release(handle);
        }
        result
    }

    /// Handle of the cell at an arena index, for the object report
    pub(crate) fn cell_owner(&self, index: usize) -> Option<Handle> {
        self.arena.cells.get(index).map(|cell| cell.handle)
    }
}
