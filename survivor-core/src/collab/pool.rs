//! In-memory enemy pool with a fixed capacity per archetype.

use std::collections::{BTreeMap, HashMap};

use bevy::math::{Quat, Vec3};

use super::{EnemyPool, InstanceHandle};
use crate::enemy::ArchetypeKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PooledInstance {
    pub tag: ArchetypeKind,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Pool that only knows the tags it was given capacities for
#[derive(Debug, Clone, Default)]
pub struct SimplePool {
    capacities: BTreeMap<ArchetypeKind, u32>,
    active: HashMap<InstanceHandle, PooledInstance>,
    next_id: u64,
}

impl SimplePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, tag: ArchetypeKind, capacity: u32) -> Self {
        self.capacities.insert(tag, capacity);
        self
    }

    /// Capacities large enough that only the scheduler caps matter
    pub fn standard() -> Self {
        Self::new()
            .with_capacity(ArchetypeKind::Grunt, 256)
            .with_capacity(ArchetypeKind::Brute, 256)
            .with_capacity(ArchetypeKind::Runner, 256)
            .with_capacity(ArchetypeKind::Boss, 8)
    }

    pub fn instance(&self, handle: InstanceHandle) -> Option<&PooledInstance> {
        self.active.get(&handle)
    }

    pub fn total_active(&self) -> usize {
        self.active.len()
    }
}

impl EnemyPool for SimplePool {
    fn acquire(
        &mut self,
        tag: ArchetypeKind,
        position: Vec3,
        rotation: Quat,
    ) -> Option<InstanceHandle> {
        let capacity = *self.capacities.get(&tag)?;
        if self.count_active(tag) >= capacity {
            return None;
        }
        self.next_id += 1;
        let handle = InstanceHandle(self.next_id);
        self.active.insert(
            handle,
            PooledInstance {
                tag,
                position,
                rotation,
            },
        );
        Some(handle)
    }

    fn release(&mut self, handle: InstanceHandle) {
        self.active.remove(&handle);
    }

    fn count_active(&self, tag: ArchetypeKind) -> u32 {
        self.active.values().filter(|i| i.tag == tag).count() as u32
    }
}
