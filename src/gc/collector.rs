//! Copying garbage collector (Cheney's algorithm)
//!
//! A collection works in three phases:
//! 1. Evacuate: move every root into a fresh arena one epoch ahead
//! 2. Scan: walk the fresh arena front to back, evacuating the children of
//!    each object as it is reached (breadth-first, no recursion)
//! 3. Release: free every store entry still pointing at the old epoch, then
//!    drop the old arena
//!
//! An object counts as already moved when its store entry carries the fresh
//! arena's epoch, which is what makes cycles safe. Handles never change; only
//! the locations behind them do.

use tracing::{debug, trace};

use super::allocator::{Arena, Cell, Heap, ObjectStore};
use crate::error::{Error, Result};
use crate::value::Handle;

/// Statistics about a GC run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of objects before collection
    pub objects_before: usize,
    /// Number of objects after collection
    pub objects_after: usize,
    /// Bytes freed
    pub bytes_freed: usize,
    /// Bytes copied into the fresh arena
    pub bytes_moved: usize,
    /// Handles returned to the free list
    pub handles_freed: usize,
}

/// Run garbage collection on the heap
///
/// Returns `None` without touching anything while collection is disabled.
pub(super) fn collect(heap: &mut Heap) -> Result<Option<GcStats>> {
    if !heap.gc_enabled() {
        trace!("collection suspended");
        return Ok(None);
    }

    // Every root must resolve before anything moves
    for root in heap.roots.iter() {
        heap.locate(root)?;
    }

    let objects_before = heap.store.live();
    let bytes_before = heap.arena.used;
    let mut to_space = Arena::with_reserved(
        heap.arena.capacity,
        heap.arena.epoch.wrapping_add(1),
        objects_before,
    )?;
    let mut worklist = std::mem::take(&mut heap.worklist);

    let Heap {
        store,
        arena: from_space,
        roots,
        ..
    } = &mut *heap;

    // Phase 1: Evacuate roots
    for root in roots.iter() {
        evacuate(store, from_space, &mut to_space, root)?;
    }

    // Phase 2: Scan
    let mut scan = 0;
    while scan < to_space.cells.len() {
        worklist.clear();
        if let Some(object) = &to_space.cells[scan].object {
            object.trace(&mut worklist);
        }
        for &child in &worklist {
            evacuate(store, from_space, &mut to_space, child)?;
        }
        scan += 1;
    }

    // Phase 3: Release
    let handles_freed = store.release_stale(to_space.epoch);
    let stats = GcStats {
        objects_before,
        objects_after: to_space.cells.len(),
        bytes_freed: bytes_before.saturating_sub(to_space.used),
        bytes_moved: to_space.used,
        handles_freed,
    };

    worklist.clear();
    heap.worklist = worklist;
    heap.arena = to_space;
    heap.allocs_since_collection = 0;
    heap.collections += 1;

    debug!(
        objects_before = stats.objects_before,
        objects_after = stats.objects_after,
        bytes_freed = stats.bytes_freed,
        handles_freed = stats.handles_freed,
        "collection finished"
    );
    Ok(Some(stats))
}

/// Move one object into the fresh arena unless it is already there
fn evacuate(
    store: &mut ObjectStore,
    from_space: &mut Arena,
    to_space: &mut Arena,
    handle: Handle,
) -> Result<()> {
    let location = store.location(handle).ok_or(Error::InvalidHandle(handle))?;
    if location.epoch == to_space.epoch {
        return Ok(());
    }
    let cell = from_space
        .cells
        .get_mut(location.index)
        .ok_or(Error::InvalidHandle(handle))?;
    let object = cell.object.take().ok_or(Error::InvalidHandle(handle))?;
    let moved = to_space.copy_in(Cell {
        handle,
        size: cell.size,
        object: Some(object),
    });
    store.bind(handle, moved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::HeapConfig;
    use crate::value::{HEADER_SIZE, Object};

    fn heap() -> Heap {
        Heap::new(HeapConfig::default().with_capacity(4096)).unwrap()
    }

    #[test]
    fn test_collect_empty_heap() {
        let mut heap = heap();
        let stats = collect(&mut heap).unwrap().unwrap();
        assert_eq!(stats.objects_before, 1);
        assert_eq!(stats.objects_after, 1);
        assert_eq!(heap.used(), HEADER_SIZE);
        assert!(heap.is_live(Handle::NIL));
    }

    #[test]
    fn test_collect_frees_unreachable() {
        let mut heap = heap();
        let handles: Vec<Handle> = (0..5)
            .map(|i| heap.allocate(Object::Int(i)).unwrap())
            .collect();
        heap.retain(handles[2]).unwrap();

        let stats = collect(&mut heap).unwrap().unwrap();
        assert_eq!(stats.objects_before, 6);
        assert_eq!(stats.objects_after, 2);
        assert_eq!(stats.handles_freed, 4);
        assert_eq!(stats.bytes_freed, 4 * (HEADER_SIZE + 8));

        assert!(matches!(heap.dereference(handles[2]), Ok(Object::Int(2))));
        for (i, &h) in handles.iter().enumerate() {
            if i != 2 {
                assert_eq!(heap.dereference(h).unwrap_err(), Error::InvalidHandle(h));
            }
        }
    }

    #[test]
    fn test_collect_traces_children() {
        let mut heap = heap();
        let a = heap.allocate(Object::Int(1)).unwrap();
        let b = heap.allocate(Object::Int(2)).unwrap();
        let v = heap.allocate(Object::Vector(vec![a, b])).unwrap();
        let pair = heap
            .allocate(Object::Pair {
                first: v,
                rest: Handle::NIL,
            })
            .unwrap();
        heap.allocate(Object::Int(99)).unwrap();
        heap.retain(pair).unwrap();

        let stats = collect(&mut heap).unwrap().unwrap();
        assert_eq!(stats.objects_after, 5);
        for h in [a, b, v, pair] {
            assert!(heap.is_live(h));
        }
        assert!(matches!(heap.dereference(b), Ok(Object::Int(2))));
    }

    #[test]
    fn test_collect_handles_cycles() {
        let mut heap = heap();
        let pair = heap
            .allocate(Object::Pair {
                first: Handle::NIL,
                rest: Handle::NIL,
            })
            .unwrap();
        if let Object::Pair { rest, .. } = heap.dereference_mut(pair).unwrap() {
            *rest = pair;
        }
        heap.retain(pair).unwrap();

        let stats = collect(&mut heap).unwrap().unwrap();
        assert_eq!(stats.objects_after, 2);
        assert!(matches!(heap.dereference(pair), Ok(Object::Pair { rest, .. }) if *rest == pair));
    }

    #[test]
    fn test_handles_stable_across_collections() {
        let mut heap = heap();
        let garbage = heap.allocate(Object::Int(0)).unwrap();
        let kept = heap.allocate(Object::Bytes(b"abc".to_vec())).unwrap();
        heap.retain(kept).unwrap();
        let before = heap.address_of(kept).unwrap();

        collect(&mut heap).unwrap();
        collect(&mut heap).unwrap();
        assert!(!heap.is_live(garbage));
        assert_ne!(heap.address_of(kept).unwrap(), before);
        assert!(matches!(heap.dereference(kept), Ok(Object::Bytes(b)) if b == b"abc"));
    }

    #[test]
    fn test_collect_keeps_slack() {
        let mut heap = heap();
        let b = heap.allocate(Object::Bytes(vec![1])).unwrap();
        heap.retain(b).unwrap();
        heap.grow(b, 32).unwrap();
        let size = heap.size_of(b).unwrap();
        collect(&mut heap).unwrap();
        assert_eq!(heap.size_of(b).unwrap(), size);
        assert_eq!(heap.used(), HEADER_SIZE + size);
    }

    #[test]
    fn test_collect_suspended() {
        let mut heap = heap();
        heap.allocate(Object::Int(1)).unwrap();
        heap.disable_gc();
        assert_eq!(collect(&mut heap).unwrap(), None);
        assert_eq!(heap.stats().live_objects, 2);
        heap.enable_gc();
        assert!(collect(&mut heap).unwrap().is_some());
        assert_eq!(heap.stats().live_objects, 1);
    }
}
