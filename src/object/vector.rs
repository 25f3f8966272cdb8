//! Vectors and byte-buffers
//!
//! Both kinds can grow after allocation. Growth goes through
//! [`Heap::grow`], so a buffer sitting at the arena frontier is extended
//! where it is and anything else is moved to the frontier first. Shrinking
//! trims the reserved size back to the exact size.

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{HANDLE_SIZE, Handle, Object};

impl Heap {
    fn slots(&self, vector: Handle) -> Result<&Vec<Handle>> {
        match self.dereference(vector)? {
            Object::Vector(slots) => Ok(slots),
            other => Err(Error::expected("vector", other.object_type())),
        }
    }

    fn slots_mut(&mut self, vector: Handle) -> Result<&mut Vec<Handle>> {
        match self.dereference_mut(vector)? {
            Object::Vector(slots) => Ok(slots),
            other => Err(Error::expected("vector", other.object_type())),
        }
    }

    fn byte_buffer(&self, bytes: Handle) -> Result<&Vec<u8>> {
        match self.dereference(bytes)? {
            Object::Bytes(buffer) => Ok(buffer),
            other => Err(Error::expected("bytevector", other.object_type())),
        }
    }

    fn byte_buffer_mut(&mut self, bytes: Handle) -> Result<&mut Vec<u8>> {
        match self.dereference_mut(bytes)? {
            Object::Bytes(buffer) => Ok(buffer),
            other => Err(Error::expected("bytevector", other.object_type())),
        }
    }

    // Vectors

    /// Allocate a vector of `length` nil slots
    pub fn create_vector(&mut self, length: usize) -> Result<Handle> {
        self.allocate(Object::Vector(vec![Handle::NIL; length]))
    }

    /// Allocate a vector holding `items`
    pub fn vector_from(&mut self, items: &[Handle]) -> Result<Handle> {
        self.allocate(Object::Vector(items.to_vec()))
    }

    /// Allocate a vector holding the elements of a proper list
    pub fn vector_from_list(&mut self, list: Handle) -> Result<Handle> {
        let items = self.list_to_vec(list)?;
        self.vector_from(&items)
    }

    pub fn vector_length(&self, vector: Handle) -> Result<usize> {
        Ok(self.slots(vector)?.len())
    }

    pub fn vector_ref(&self, vector: Handle, index: usize) -> Result<Handle> {
        let slots = self.slots(vector)?;
        slots.get(index).copied().ok_or(Error::BoundsViolation {
            index,
            length: slots.len(),
        })
    }

    pub fn vector_set(&mut self, vector: Handle, index: usize, value: Handle) -> Result<()> {
        self.locate(value)?;
        let slots = self.slots_mut(vector)?;
        let length = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(Error::BoundsViolation { index, length })?;
        *slot = value;
        Ok(())
    }

    /// Change the length of a vector, filling new slots with nil
    pub fn resize_vector(&mut self, vector: Handle, length: usize) -> Result<()> {
        let old = self.vector_length(vector)?;
        if length > old {
            self.grow(vector, (length - old) * HANDLE_SIZE)?;
            self.slots_mut(vector)?.resize(length, Handle::NIL);
        } else if length < old {
            self.slots_mut(vector)?.truncate(length);
            self.trim_slack(vector)?;
        }
        Ok(())
    }

    /// Append a value to a vector
    pub fn vector_push(&mut self, vector: Handle, value: Handle) -> Result<()> {
        self.locate(value)?;
        self.protecting(&[value], |heap| heap.grow(vector, HANDLE_SIZE))?;
        self.slots_mut(vector)?.push(value);
        Ok(())
    }

    /// Append a value unless the vector already holds it (by identity)
    ///
    /// Returns the value's index either way.
    pub fn vector_add(&mut self, vector: Handle, value: Handle) -> Result<usize> {
        if let Some(index) = self.slots(vector)?.iter().position(|&h| h == value) {
            return Ok(index);
        }
        self.vector_push(vector, value)?;
        Ok(self.vector_length(vector)? - 1)
    }

    // Byte-buffers

    /// Allocate a byte-buffer of `length` zero bytes
    pub fn create_bytes(&mut self, length: usize) -> Result<Handle> {
        self.allocate(Object::Bytes(vec![0; length]))
    }

    /// Allocate a byte-buffer holding a copy of `bytes`
    pub fn bytes_from(&mut self, bytes: &[u8]) -> Result<Handle> {
        self.allocate(Object::Bytes(bytes.to_vec()))
    }

    pub fn bytes_length(&self, bytes: Handle) -> Result<usize> {
        Ok(self.byte_buffer(bytes)?.len())
    }

    pub fn bytes_ref(&self, bytes: Handle, index: usize) -> Result<u8> {
        let buffer = self.byte_buffer(bytes)?;
        buffer.get(index).copied().ok_or(Error::BoundsViolation {
            index,
            length: buffer.len(),
        })
    }

    pub fn bytes_set(&mut self, bytes: Handle, index: usize, value: u8) -> Result<()> {
        let buffer = self.byte_buffer_mut(bytes)?;
        let length = buffer.len();
        let byte = buffer
            .get_mut(index)
            .ok_or(Error::BoundsViolation { index, length })?;
        *byte = value;
        Ok(())
    }

    /// Borrow the contents of a byte-buffer
    pub fn bytes_contents(&self, bytes: Handle) -> Result<&[u8]> {
        Ok(self.byte_buffer(bytes)?)
    }

    /// Change the length of a byte-buffer, filling new bytes with zero
    pub fn resize_bytes(&mut self, bytes: Handle, length: usize) -> Result<()> {
        let old = self.bytes_length(bytes)?;
        if length > old {
            self.grow(bytes, length - old)?;
            self.byte_buffer_mut(bytes)?.resize(length, 0);
        } else if length < old {
            self.byte_buffer_mut(bytes)?.truncate(length);
            self.trim_slack(bytes)?;
        }
        Ok(())
    }

    /// Append one byte to a byte-buffer
    pub fn bytes_push(&mut self, bytes: Handle, value: u8) -> Result<()> {
        self.byte_buffer(bytes)?;
        self.grow(bytes, 1)?;
        self.byte_buffer_mut(bytes)?.push(value);
        Ok(())
    }
}
