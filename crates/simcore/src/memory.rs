//! Linear bump arena with scoped temporary regions.
//!
//! The arena owns a byte budget rather than raw memory: every allocation is
//! charged against `capacity` at an aligned offset and the caller receives an
//! owned buffer. Rewinding (`end_temp`, `clear`) releases the budget of every
//! allocation made since the rewind point. Holding buffers across a rewind is a
//! caller bug the arena does not detect.

use std::mem::{align_of, size_of};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error(
        "arena '{arena}' exhausted: requested {requested} bytes at offset {offset}, capacity {capacity}"
    )]
    OutOfMemory {
        arena: &'static str,
        requested: usize,
        offset: usize,
        capacity: usize,
    },
    #[error("alignment {align} is not a power of two")]
    InvalidAlignment { align: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaAllocation {
    pub offset: usize,
    pub size: usize,
}

/// Rewind point captured by [`MemoryArena::begin_temp`].
#[must_use = "a temp scope must be closed with MemoryArena::end_temp"]
#[derive(Debug)]
pub struct TempMemory {
    data_size: usize,
}

#[derive(Debug)]
pub struct MemoryArena {
    name: &'static str,
    capacity: usize,
    data_size: usize,
    peak_size: usize,
    temp_count: u32,
}

impl MemoryArena {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            data_size: 0,
            peak_size: 0,
            temp_count: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data_size(&self) -> usize {
        self.data_size
    }

    pub fn peak_size(&self) -> usize {
        self.peak_size
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.data_size
    }

    pub fn try_alloc(&mut self, size: usize, align: usize) -> Result<ArenaAllocation, ArenaError> {
        let align = align.max(1);
        if !align.is_power_of_two() {
            return Err(ArenaError::InvalidAlignment { align });
        }
        let offset = (self.data_size + (align - 1)) & !(align - 1);
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= self.capacity)
            .ok_or(ArenaError::OutOfMemory {
                arena: self.name,
                requested: size,
                offset: self.data_size,
                capacity: self.capacity,
            })?;
        self.data_size = end;
        self.peak_size = self.peak_size.max(end);
        Ok(ArenaAllocation { offset, size })
    }

    /// Exhaustion is fatal: arenas are pre-sized and running out means the
    /// configuration is wrong.
    pub fn alloc(&mut self, size: usize, align: usize) -> ArenaAllocation {
        self.try_alloc(size, align)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    pub fn alloc_struct<T>(&mut self) -> ArenaAllocation {
        self.alloc(size_of::<T>(), align_of::<T>())
    }

    /// Charges room for `count` values of `T` and returns a buffer holding
    /// exactly `count` default values.
    pub fn alloc_array<T: Default + Clone>(&mut self, count: usize) -> Vec<T> {
        let size = size_of::<T>()
            .checked_mul(count)
            .unwrap_or_else(|| panic!("arena '{}' array size overflow", self.name));
        self.alloc(size, align_of::<T>());
        vec![T::default(); count]
    }

    /// Charges room for up to `count` values of `T` and returns an empty
    /// buffer whose capacity covers them.
    pub fn alloc_vec<T>(&mut self, count: usize) -> Vec<T> {
        let size = size_of::<T>()
            .checked_mul(count)
            .unwrap_or_else(|| panic!("arena '{}' array size overflow", self.name));
        self.alloc(size, align_of::<T>());
        Vec::with_capacity(count)
    }

    pub fn begin_temp(&mut self) -> TempMemory {
        self.temp_count += 1;
        TempMemory {
            data_size: self.data_size,
        }
    }

    pub fn end_temp(&mut self, temp: TempMemory) {
        assert!(self.temp_count > 0, "arena '{}' has no open temp scope", self.name);
        assert!(
            temp.data_size <= self.data_size,
            "arena '{}' temp scope closed after the arena was rewound past it",
            self.name
        );
        self.temp_count -= 1;
        self.data_size = temp.data_size;
    }

    pub fn clear(&mut self) {
        assert_eq!(
            self.temp_count, 0,
            "arena '{}' cleared with an open temp scope",
            self.name
        );
        self.data_size = 0;
    }
}
