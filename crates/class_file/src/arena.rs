use std::mem;

use crate::{ClassFileError, Result};

/// Bump allocator over a fixed-size output segment. Only the space accounting is
/// tracked here; the parsed records themselves are owned by the [`crate::ClassFile`].
#[derive(Debug)]
pub struct Arena {
    capacity: usize,
    used: usize,
    last: Option<usize>,
}
impl Arena {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            last: None,
        }
    }

    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        let remaining = self.remaining();
        if size > remaining {
            return Err(ClassFileError::OutOfSpace {
                requested: size,
                remaining,
            });
        }

        let start = self.used;
        self.used += size;
        self.last = Some(start);
        Ok(start)
    }

    pub fn allocate_array<T>(&mut self, count: usize) -> Result<usize> {
        match count.checked_mul(mem::size_of::<T>()) {
            Some(size) => self.allocate(size),
            None => Err(ClassFileError::OutOfSpace {
                requested: usize::MAX,
                remaining: self.remaining(),
            }),
        }
    }

    /// Gives back the tail of the most recent allocation.
    pub fn shrink_last_allocation(&mut self, by: usize) {
        if let Some(start) = self.last {
            self.used -= by.min(self.used - start);
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}
