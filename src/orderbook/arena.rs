//! Slot arena backing order storage.
//!
//! The book, the id index and the stop manager all refer to orders through
//! [`OrderHandle`] values instead of references, so a slot can be recycled
//! without any aliasing concerns. Handles are generational: releasing a slot
//! bumps its generation, which invalidates every copy of the old handle.

use crate::orders::Order;

/// Slots added when the arena runs dry and growth is enabled.
pub const GROW_INCREMENT: usize = 1024;

/// Opaque handle to an arena slot.
///
/// Only this arena can mint handles; a handle that outlives its slot's
/// release is detected through the generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderHandle {
    index: u32,
    generation: u32,
}

/// Error returned by [`OrderArena::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArenaError {
    /// The handle was never issued by this arena, or its slot has since
    /// been recycled.
    StaleHandle,
    /// The slot is already free (double release).
    AlreadyReleased,
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArenaError::StaleHandle => write!(f, "stale or foreign order handle"),
            ArenaError::AlreadyReleased => write!(f, "order slot already released"),
        }
    }
}

impl std::error::Error for ArenaError {}

#[derive(Debug)]
struct Slot {
    order: Order,
    generation: u32,
    live: bool,
}

impl Slot {
    fn fresh() -> Self {
        Slot {
            order: Order::default(),
            generation: 0,
            live: false,
        }
    }
}

/// Pre-sized pool of order slots.
///
/// `acquire` hands out a zeroed slot in amortized O(1); `release` zeroes the
/// slot and returns it to the free list. On exhaustion the pool grows by
/// [`GROW_INCREMENT`] unless growth has been disabled.
#[derive(Debug)]
pub struct OrderArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    allocated: usize,
    growth_enabled: bool,
}

impl OrderArena {
    /// Creates an arena with `capacity` pre-allocated slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut arena = OrderArena {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            allocated: 0,
            growth_enabled: true,
        };
        arena.grow(capacity);
        arena
    }

    fn grow(&mut self, additional: usize) {
        let start = self.slots.len();
        // Slot indices fit in u32 by construction; a book holding more than
        // four billion live orders is out of scope.
        for index in start..start + additional {
            self.slots.push(Slot::fresh());
            self.free.push(index as u32);
        }
    }

    /// Controls whether the arena may grow past its initial capacity.
    pub fn set_growth_enabled(&mut self, enabled: bool) {
        self.growth_enabled = enabled;
    }

    /// Takes a zeroed slot from the pool.
    ///
    /// Returns `None` when the pool is exhausted and growth is disabled.
    pub fn acquire(&mut self) -> Option<OrderHandle> {
        if self.free.is_empty() {
            if !self.growth_enabled {
                return None;
            }
            self.grow(GROW_INCREMENT);
        }
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        // A new generation per acquisition invalidates every handle to the
        // slot's previous life.
        slot.generation = slot.generation.wrapping_add(1);
        slot.live = true;
        self.allocated += 1;
        Some(OrderHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Zeroes the slot and returns it to the pool.
    ///
    /// # Errors
    /// Rejects handles this arena never issued and handles whose slot was
    /// already released; neither corrupts the pool.
    pub fn release(&mut self, handle: OrderHandle) -> Result<(), ArenaError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(ArenaError::StaleHandle)?;
        if slot.generation != handle.generation {
            return Err(ArenaError::StaleHandle);
        }
        if !slot.live {
            return Err(ArenaError::AlreadyReleased);
        }
        slot.order = Order::default();
        slot.live = false;
        self.free.push(handle.index);
        self.allocated -= 1;
        Ok(())
    }

    /// Read access to a live slot.
    #[must_use]
    pub fn get(&self, handle: OrderHandle) -> Option<&Order> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &slot.order)
    }

    /// Write access to a live slot.
    pub fn get_mut(&mut self, handle: OrderHandle) -> Option<&mut Order> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &mut slot.order)
    }

    /// Number of free slots.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.free.len()
    }

    /// Number of live slots.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Total slots, free and live.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl std::ops::Index<OrderHandle> for OrderArena {
    type Output = Order;

    /// Panics on a stale handle. Every handle held by the book structures
    /// points at a live slot; a violation is a programming error, not a
    /// client input condition.
    fn index(&self, handle: OrderHandle) -> &Order {
        self.get(handle).expect("stale order handle")
    }
}

impl std::ops::IndexMut<OrderHandle> for OrderArena {
    fn index_mut(&mut self, handle: OrderHandle) -> &mut Order {
        self.get_mut(handle).expect("stale order handle")
    }
}
