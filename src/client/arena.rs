use std::collections::HashMap;

/// Stable key of an arena entry. It survives re-keying of the entity id, so
/// reconciliation never has to move an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(u64);

#[derive(Debug, Clone, Default)]
pub(crate) struct SlotAllocator(u64);

impl SlotAllocator {
    pub(crate) fn next(&mut self) -> Slot {
        self.0 += 1;
        Slot(self.0)
    }
}

/// Ordered collection addressed by entity id, with an id → slot index.
#[derive(Debug, Clone)]
pub struct OrderedArena<T> {
    slots: SlotAllocator,
    order: Vec<Slot>,
    by_id: HashMap<String, Slot>,
    items: HashMap<Slot, T>,
}

impl<T> Default for OrderedArena<T> {
    fn default() -> Self {
        Self {
            slots: SlotAllocator::default(),
            order: Vec::new(),
            by_id: HashMap::new(),
            items: HashMap::new(),
        }
    }
}

impl<T> OrderedArena<T> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id).and_then(|slot| self.items.get(slot))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let slot = self.by_id.get(id)?;
        self.items.get_mut(slot)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        let slot = self.by_id.get(id)?;
        self.order.iter().position(|s| s == slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|slot| self.items.get(slot))
    }

    /// Inserts at `index` (clamped). An entity already present under `id` is
    /// overwritten where it stands instead.
    pub fn insert_at(&mut self, index: usize, id: String, item: T) {
        if let Some(slot) = self.by_id.get(&id) {
            self.items.insert(*slot, item);
            return;
        }
        let slot = self.slots.next();
        self.order.insert(index.min(self.order.len()), slot);
        self.by_id.insert(id, slot);
        self.items.insert(slot, item);
    }

    pub fn push_front(&mut self, id: String, item: T) {
        self.insert_at(0, id, item);
    }

    pub fn push_back(&mut self, id: String, item: T) {
        let end = self.order.len();
        self.insert_at(end, id, item);
    }

    /// Swaps the entity stored under `old_id` for `item`, now known as
    /// `new_id`, keeping its position. Returns `false` when `old_id` is gone.
    pub fn replace(&mut self, old_id: &str, new_id: String, item: T) -> bool {
        let Some(slot) = self.by_id.remove(old_id) else {
            return false;
        };
        if new_id != old_id {
            if let Some(stale) = self.by_id.remove(&new_id) {
                self.order.retain(|s| *s != stale);
                self.items.remove(&stale);
            }
        }
        self.by_id.insert(new_id, slot);
        self.items.insert(slot, item);
        true
    }

    /// Removes the entity, returning it with the position it held.
    pub fn remove(&mut self, id: &str) -> Option<(usize, T)> {
        let slot = self.by_id.remove(id)?;
        let index = self.order.iter().position(|s| *s == slot)?;
        self.order.remove(index);
        self.items.remove(&slot).map(|item| (index, item))
    }
}

impl<T> FromIterator<(String, T)> for OrderedArena<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut arena = Self::default();
        for (id, item) in iter {
            arena.push_back(id, item);
        }
        arena
    }
}
