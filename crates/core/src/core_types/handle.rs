//! Generation-counted handles for fire-capable objects.
//!
//! The engine never holds references into the host world. Every record names
//! its owning object through an [`ObjectHandle`]; a handle whose slot has been
//! released (and possibly reused) simply stops matching, so stale records can
//! be detected without dereferencing anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Weak, validated reference to an object in the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    /// Create a handle from raw parts
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into a single `u64` (generation in the high word)
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Unpack a value produced by [`ObjectHandle::to_bits`]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Registry of active fire-capable objects.
///
/// Hands out [`ObjectHandle`]s and tracks which ones are still alive. Released
/// slots go onto a free list and come back with a bumped generation.
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
}

impl HandleAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for a newly registered object
    pub fn allocate(&mut self) -> ObjectHandle {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return ObjectHandle::new(index, self.generations[slot]);
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        ObjectHandle::new(index, 0)
    }

    /// Release a handle. Returns `false` if it was already stale.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        if !self.is_alive(handle) {
            return false;
        }
        let slot = handle.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(handle.index());
        self.live_count -= 1;
        true
    }

    /// Whether the handle still names a live object
    pub fn is_alive(&self, handle: ObjectHandle) -> bool {
        let slot = handle.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == handle.generation()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Whether no objects are alive
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
