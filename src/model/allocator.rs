use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};

use super::actor::ActorId;

/// Tracks which ids of the catalog space have been drawn and which have been
/// excluded by the user, and draws new ids without replacement.
///
/// An id that is excluded is never offered again until [`Self::reset`].
#[derive(Debug, Clone)]
pub struct IdAllocator {
    size: u32,
    drawn: BTreeSet<ActorId>,
    excluded: BTreeSet<ActorId>,
}

impl IdAllocator {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            drawn: BTreeSet::new(),
            excluded: BTreeSet::new(),
        }
    }

    /// Rebuild an allocator from persisted sets, discarding ids outside the space.
    /// Excluded ids count as drawn.
    pub fn restore(
        size: u32,
        drawn: impl IntoIterator<Item = ActorId>,
        excluded: impl IntoIterator<Item = ActorId>,
    ) -> Self {
        let mut allocator = Self::new(size);
        allocator.drawn = drawn.into_iter().filter(|id| id.within(size)).collect();
        allocator.excluded = excluded.into_iter().filter(|id| id.within(size)).collect();
        allocator.drawn.extend(allocator.excluded.iter().copied());
        allocator
    }

    /// Ids that may still be drawn.
    pub fn available(&self) -> Vec<ActorId> {
        ActorId::space(self.size)
            .filter(|id| !self.drawn.contains(id) && !self.excluded.contains(id))
            .collect()
    }

    /// Draw an undrawn, non-excluded id uniformly at random and mark it drawn.
    /// Returns `None` once the space is exhausted.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ActorId> {
        let id = *self.available().choose(rng)?;
        self.drawn.insert(id);
        Some(id)
    }

    /// Mark a specific id drawn. Returns false if it is outside the space,
    /// excluded, or already drawn.
    pub fn claim(&mut self, id: ActorId) -> bool {
        id.within(self.size) && !self.excluded.contains(&id) && self.drawn.insert(id)
    }

    /// Return a drawn id to the pool so that it may be drawn again.
    pub fn release(&mut self, id: ActorId) -> bool {
        self.drawn.remove(&id)
    }

    /// Permanently exclude an id. It stays drawn so it is not fetched again.
    pub fn exclude(&mut self, id: ActorId) {
        if id.within(self.size) {
            self.drawn.insert(id);
            self.excluded.insert(id);
        }
    }

    pub fn is_excluded(&self, id: ActorId) -> bool {
        self.excluded.contains(&id)
    }

    pub fn is_drawn(&self, id: ActorId) -> bool {
        self.drawn.contains(&id)
    }

    pub fn drawn(&self) -> &BTreeSet<ActorId> {
        &self.drawn
    }

    pub fn excluded(&self) -> &BTreeSet<ActorId> {
        &self.excluded
    }

    /// Forget every drawn and excluded id.
    pub fn reset(&mut self) {
        self.drawn.clear();
        self.excluded.clear();
    }
}
