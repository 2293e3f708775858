//! Fixed-capacity entity pool
//!
//! One partition per category. Every slot is allocated up front; acquire and
//! release only move ids between the active list and the free list, so the
//! pool never grows during a battle.
//!
//! Invariants (per category):
//! - `active + free == capacity`
//! - an id is never both active and free
//! - active ids are kept in activation order

use super::state::{Entity, EntityCategory, EntityHandle, EntityId};

#[derive(Debug, Clone)]
struct Partition {
    slots: Vec<Entity>,
    live: Vec<bool>,
    /// Activation order
    active: Vec<EntityId>,
    /// Reusable ids, popped from the back
    free: Vec<EntityId>,
    exhausted: u64,
}

impl Partition {
    fn new(category: EntityCategory, capacity: usize) -> Self {
        let capacity = capacity.min(EntityId::MAX as usize);
        Self {
            slots: (0..capacity as EntityId)
                .map(|id| Entity::new(category, id))
                .collect(),
            live: vec![false; capacity],
            active: Vec::with_capacity(capacity),
            // Reversed so the lowest id is handed out first
            free: (0..capacity as EntityId).rev().collect(),
            exhausted: 0,
        }
    }

    fn is_live(&self, id: EntityId) -> bool {
        self.live.get(id as usize).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct EntityPool {
    partitions: [Partition; 3],
}

impl EntityPool {
    pub fn new(unit_capacity: usize, gate_capacity: usize, effect_capacity: usize) -> Self {
        Self {
            partitions: [
                Partition::new(EntityCategory::Unit, unit_capacity),
                Partition::new(EntityCategory::Gate, gate_capacity),
                Partition::new(EntityCategory::Effect, effect_capacity),
            ],
        }
    }

    #[inline]
    fn part(&self, category: EntityCategory) -> &Partition {
        &self.partitions[category.index()]
    }

    #[inline]
    fn part_mut(&mut self, category: EntityCategory) -> &mut Partition {
        &mut self.partitions[category.index()]
    }

    /// Take a free slot. `None` means the pool is exhausted and the spawn
    /// should simply be skipped.
    pub fn acquire(&mut self, category: EntityCategory) -> Option<EntityHandle> {
        let part = self.part_mut(category);
        let Some(id) = part.free.pop() else {
            part.exhausted += 1;
            log::trace!("{:?} pool exhausted ({} misses)", category, part.exhausted);
            return None;
        };
        part.live[id as usize] = true;
        part.active.push(id);
        part.slots[id as usize].reset();
        Some(EntityHandle { category, id })
    }

    /// Return an active entity to the free list.
    ///
    /// Releasing an id that is not active is a caller bug: it panics in debug
    /// builds and is ignored (with an error log) otherwise. Returns whether the
    /// release happened.
    pub fn release(&mut self, category: EntityCategory, id: EntityId) -> bool {
        let part = self.part_mut(category);
        if !part.is_live(id) {
            debug_assert!(false, "release of inactive {:?} entity {}", category, id);
            log::error!("Ignoring release of inactive {:?} entity {}", category, id);
            return false;
        }
        part.live[id as usize] = false;
        part.active.retain(|&active| active != id);
        part.slots[id as usize].reset();
        part.free.push(id);
        true
    }

    /// Release every active entity in every category
    pub fn release_all(&mut self) {
        for part in &mut self.partitions {
            for id in part.active.drain(..) {
                part.live[id as usize] = false;
                part.slots[id as usize].reset();
                part.free.push(id);
            }
        }
    }

    pub fn get(&self, category: EntityCategory, id: EntityId) -> Option<&Entity> {
        let part = self.part(category);
        if part.is_live(id) {
            part.slots.get(id as usize)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, category: EntityCategory, id: EntityId) -> Option<&mut Entity> {
        let part = self.part_mut(category);
        if part.is_live(id) {
            part.slots.get_mut(id as usize)
        } else {
            None
        }
    }

    /// Active ids in activation order
    pub fn active_ids(&self, category: EntityCategory) -> &[EntityId] {
        &self.part(category).active
    }

    /// Active entities in activation order
    pub fn iter_active(&self, category: EntityCategory) -> impl Iterator<Item = &Entity> {
        let part = self.part(category);
        part.active.iter().map(move |&id| &part.slots[id as usize])
    }

    /// Mutable pass over active entities (activation order)
    pub fn for_each_active_mut(
        &mut self,
        category: EntityCategory,
        mut f: impl FnMut(&mut Entity),
    ) {
        let part = self.part_mut(category);
        for &id in &part.active {
            f(&mut part.slots[id as usize]);
        }
    }

    pub fn active_count(&self, category: EntityCategory) -> usize {
        self.part(category).active.len()
    }

    pub fn free_count(&self, category: EntityCategory) -> usize {
        self.part(category).free.len()
    }

    pub fn capacity(&self, category: EntityCategory) -> usize {
        self.part(category).slots.len()
    }

    /// Spawn attempts refused because the category was full
    pub fn exhaustion_count(&self, category: EntityCategory) -> u64 {
        self.part(category).exhausted
    }

    /// Check partition bookkeeping: sizes add up, active and free are disjoint
    /// and match the live flags.
    pub fn invariants_hold(&self) -> bool {
        self.partitions.iter().all(|part| {
            let capacity = part.slots.len();
            if part.active.len() + part.free.len() != capacity {
                return false;
            }
            let mut seen = vec![false; capacity];
            for &id in &part.active {
                let idx = id as usize;
                if idx >= capacity || seen[idx] || !part.live[idx] {
                    return false;
                }
                seen[idx] = true;
            }
            for &id in &part.free {
                let idx = id as usize;
                if idx >= capacity || seen[idx] || part.live[idx] {
                    return false;
                }
                seen[idx] = true;
            }
            true
        })
    }
}
