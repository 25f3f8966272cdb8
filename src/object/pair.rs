//! Pairs, lists and association lists

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Handle, Object};

impl Heap {
    /// Allocate a pair
    pub fn cons(&mut self, first: Handle, rest: Handle) -> Result<Handle> {
        self.allocate(Object::Pair { first, rest })
    }

    /// Check if an object is a pair
    pub fn is_pair(&self, handle: Handle) -> Result<bool> {
        Ok(matches!(self.dereference(handle)?, Object::Pair { .. }))
    }

    fn pair_fields(&self, handle: Handle) -> Result<(Handle, Handle)> {
        match self.dereference(handle)? {
            Object::Pair { first, rest } => Ok((*first, *rest)),
            other => Err(Error::expected("pair", other.object_type())),
        }
    }

    fn pair_fields_mut(&mut self, handle: Handle) -> Result<(&mut Handle, &mut Handle)> {
        match self.dereference_mut(handle)? {
            Object::Pair { first, rest } => Ok((first, rest)),
            other => Err(Error::expected("pair", other.object_type())),
        }
    }

    /// Get the first element of a pair
    pub fn first(&self, pair: Handle) -> Result<Handle> {
        Ok(self.pair_fields(pair)?.0)
    }

    /// Get the rest of a pair
    pub fn rest(&self, pair: Handle) -> Result<Handle> {
        Ok(self.pair_fields(pair)?.1)
    }

    /// Replace the first element of a pair
    pub fn set_first(&mut self, pair: Handle, value: Handle) -> Result<()> {
        self.locate(value)?;
        *self.pair_fields_mut(pair)?.0 = value;
        Ok(())
    }

    /// Replace the rest of a pair
    pub fn set_rest(&mut self, pair: Handle, value: Handle) -> Result<()> {
        self.locate(value)?;
        *self.pair_fields_mut(pair)?.1 = value;
        Ok(())
    }

    /// Count the elements of a proper list
    pub fn list_length(&self, list: Handle) -> Result<usize> {
        let mut length = 0;
        let mut cursor = list;
        while !cursor.is_nil() {
            cursor = self.rest(cursor)?;
            length += 1;
        }
        Ok(length)
    }

    /// Build a proper list from a slice
    pub fn list_from(&mut self, items: &[Handle]) -> Result<Handle> {
        self.protecting(items, |heap| {
            let mut list = Handle::NIL;
            for &item in items.iter().rev() {
                list = heap.cons(item, list)?;
            }
            Ok(list)
        })
    }

    /// Collect the elements of a proper list
    pub fn list_to_vec(&self, list: Handle) -> Result<Vec<Handle>> {
        let mut items = Vec::new();
        let mut cursor = list;
        while !cursor.is_nil() {
            let (first, rest) = self.pair_fields(cursor)?;
            items.push(first);
            cursor = rest;
        }
        Ok(items)
    }

    /// Find the pair whose first element is `key` (by identity)
    pub fn alist_get(&self, alist: Handle, key: Handle) -> Result<Option<Handle>> {
        let mut cursor = alist;
        while !cursor.is_nil() {
            let (entry, rest) = self.pair_fields(cursor)?;
            if self.first(entry)? == key {
                return Ok(Some(entry));
            }
            cursor = rest;
        }
        Ok(None)
    }

    /// Bind `key` to `value` in an association list
    ///
    /// Updates an existing entry in place, otherwise conses a new entry onto
    /// the front. Returns the (possibly new) head.
    pub fn alist_set(&mut self, alist: Handle, key: Handle, value: Handle) -> Result<Handle> {
        if let Some(entry) = self.alist_get(alist, key)? {
            self.set_rest(entry, value)?;
            return Ok(alist);
        }
        self.protecting(&[alist], |heap| {
            let entry = heap.cons(key, value)?;
            heap.cons(entry, alist)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::HeapConfig;
    use crate::value::ObjectType;

    #[test]
    fn test_cons_and_accessors() {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let a = heap.create_integer(1).unwrap();
        let b = heap.create_integer(2).unwrap();
        let p = heap.cons(a, b).unwrap();
        assert_eq!(heap.first(p).unwrap(), a);
        assert_eq!(heap.rest(p).unwrap(), b);

        heap.set_first(p, b).unwrap();
        heap.set_rest(p, Handle::NIL).unwrap();
        assert_eq!(heap.first(p).unwrap(), b);
        assert!(heap.rest(p).unwrap().is_nil());

        assert_eq!(
            heap.first(a).unwrap_err(),
            Error::expected("pair", ObjectType::Int)
        );
        assert_eq!(
            heap.set_rest(p, Handle(500)).unwrap_err(),
            Error::InvalidHandle(Handle(500))
        );
    }

    #[test]
    fn test_lists() {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let items: Vec<Handle> = (1..=3).map(|i| heap.create_integer(i).unwrap()).collect();
        let list = heap.list_from(&items).unwrap();
        assert_eq!(heap.list_length(list).unwrap(), 3);
        assert_eq!(heap.list_to_vec(list).unwrap(), items);
        assert_eq!(heap.list_length(Handle::NIL).unwrap(), 0);

        // Improper tail
        let dotted = heap.cons(items[0], items[1]).unwrap();
        assert!(heap.list_length(dotted).is_err());
    }

    #[test]
    fn test_list_from_survives_collection() {
        let mut heap = Heap::new(HeapConfig::default().with_collect_every(1)).unwrap();
        let a = heap.create_integer(1).unwrap();
        heap.retain(a).unwrap();
        let b = heap.create_integer(2).unwrap();
        heap.retain(b).unwrap();
        let list = heap.list_from(&[a, b]).unwrap();
        assert_eq!(heap.list_to_vec(list).unwrap(), vec![a, b]);
        assert!(heap.collections() > 0);
    }

    #[test]
    fn test_alist() {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let k1 = heap.intern("k1").unwrap();
        let k2 = heap.intern("k2").unwrap();
        let v1 = heap.create_integer(10).unwrap();
        let v2 = heap.create_integer(20).unwrap();

        let alist = heap.alist_set(Handle::NIL, k1, v1).unwrap();
        let alist = heap.alist_set(alist, k2, v2).unwrap();
        assert_eq!(heap.list_length(alist).unwrap(), 2);

        let entry = heap.alist_get(alist, k1).unwrap().unwrap();
        assert_eq!(heap.rest(entry).unwrap(), v1);

        // Rebinding updates in place
        let same = heap.alist_set(alist, k1, v2).unwrap();
        assert_eq!(same, alist);
        assert_eq!(heap.rest(entry).unwrap(), v2);

        assert_eq!(heap.alist_get(alist, v1).unwrap(), None);
    }
}
