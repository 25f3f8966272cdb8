//! Integers and floats

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::gc::Heap;
use crate::value::{Handle, Object};

impl Heap {
    /// Allocate an integer
    pub fn create_integer(&mut self, value: i64) -> Result<Handle> {
        self.allocate(Object::Int(value))
    }

    /// Allocate a float
    pub fn create_float(&mut self, value: f64) -> Result<Handle> {
        self.allocate(Object::Float(value))
    }

    /// Read an integer
    pub fn integer(&self, handle: Handle) -> Result<i64> {
        match self.dereference(handle)? {
            Object::Int(n) => Ok(*n),
            other => Err(Error::expected("integer", other.object_type())),
        }
    }

    /// Read a float
    pub fn float(&self, handle: Handle) -> Result<f64> {
        match self.dereference(handle)? {
            Object::Float(n) => Ok(*n),
            other => Err(Error::expected("float", other.object_type())),
        }
    }

    /// Check if an object is an integer or a float
    pub fn is_numeric(&self, handle: Handle) -> Result<bool> {
        Ok(matches!(
            self.dereference(handle)?,
            Object::Int(_) | Object::Float(_)
        ))
    }

    /// Compare two numbers
    ///
    /// Two integers compare exactly; any float in the mix makes both sides
    /// compare as floats. Unordered floats (NaN) compare equal.
    pub fn compare_numbers(&self, a: Handle, b: Handle) -> Result<Ordering> {
        match (self.dereference(a)?, self.dereference(b)?) {
            (Object::Int(x), Object::Int(y)) => Ok(x.cmp(y)),
            _ => {
                let x = self.number_as_f64(a)?;
                let y = self.number_as_f64(b)?;
                Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
            }
        }
    }

    /// `eqv?`: identity, or numeric equality across both kinds
    pub fn equivalent(&self, a: Handle, b: Handle) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        if self.is_numeric(a)? && self.is_numeric(b)? {
            return Ok(self.compare_numbers(a, b)? == Ordering::Equal);
        }
        Ok(false)
    }

    fn number_as_f64(&self, handle: Handle) -> Result<f64> {
        match self.dereference(handle)? {
            Object::Int(n) => Ok(*n as f64),
            Object::Float(n) => Ok(*n),
            other => Err(Error::expected("number", other.object_type())),
        }
    }
}
