//! Per-object fire state records and the registry that collects them.
//!
//! A [`ComponentData`] is a plain value describing one fire-capable object for
//! one pass. The [`ComponentDataRegistry`] holds the records being prepared for
//! the *next* pass on the caller's thread; the worker only ever sees copies.

use crate::core_types::handle::ObjectHandle;
use crate::core_types::vec3::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Combustion stage of an object.
///
/// Stages only move forward. Reaching a stage implies every earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BurnStage {
    Unburnt,
    Burning,
    Destroyed,
    Exploded,
}

/// Fire state of one object for one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
    /// Owning object; `None` once the object is gone
    pub owner: Option<ObjectHandle>,

    pub is_fire_sender: bool,
    pub is_fire_receiver: bool,
    pub is_burning: bool,
    pub is_destroyed: bool,
    pub is_exploded: bool,

    /// Full-strength transfer distance (senders only)
    pub hard_radius: f32,
    /// Zero-transfer distance (senders only)
    pub soft_radius: f32,
    /// Heat output per second while burning (senders only)
    pub fire_energy: f32,

    /// World position. Records without one only take the non-spatial path.
    pub position: Option<Vec3>,

    /// Heat stock carried over from previous passes
    pub accumulated_energy: f32,
    /// Energy injected by game logic for the next pass only
    pub direct_energy: f32,
    /// Net energy received during the last pass. Written by the calculator.
    pub calculated_spread_energy: f32,

    /// Heat removed per second
    pub cooling_energy: f32,
    /// Heat absorbed per second before any of it counts
    pub fire_resistance: f32,

    /// Object that first delivered heat to this one
    pub source: Option<ObjectHandle>,

    /// Registry slot revision a snapshot copy was taken from
    #[serde(skip)]
    pub(crate) revision: u64,
}

impl Default for ComponentData {
    fn default() -> Self {
        Self {
            owner: None,
            is_fire_sender: false,
            is_fire_receiver: true,
            is_burning: false,
            is_destroyed: false,
            is_exploded: false,
            hard_radius: 0.0,
            soft_radius: 0.0,
            fire_energy: 0.0,
            position: None,
            accumulated_energy: 0.0,
            direct_energy: 0.0,
            calculated_spread_energy: 0.0,
            cooling_energy: 0.0,
            fire_resistance: 0.0,
            source: None,
            revision: 0,
        }
    }
}

impl ComponentData {
    /// Fresh receiver-only record for `owner`
    pub fn new(owner: ObjectHandle) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Receiver at a position
    pub fn receiver(owner: ObjectHandle, position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::new(owner)
        }
    }

    /// Burning sender at a position.
    ///
    /// Senders are receivers as well unless switched off with
    /// [`ComponentData::with_receiver`].
    pub fn sender(
        owner: ObjectHandle,
        position: Vec3,
        fire_energy: f32,
        hard_radius: f32,
        soft_radius: f32,
    ) -> Self {
        Self {
            is_fire_sender: true,
            is_burning: true,
            hard_radius,
            soft_radius,
            fire_energy,
            ..Self::receiver(owner, position)
        }
    }

    pub fn with_receiver(mut self, is_fire_receiver: bool) -> Self {
        self.is_fire_receiver = is_fire_receiver;
        self
    }

    pub fn with_burning(mut self, is_burning: bool) -> Self {
        self.is_burning = is_burning;
        self
    }

    pub fn with_cooling(mut self, cooling_energy: f32) -> Self {
        self.cooling_energy = cooling_energy;
        self
    }

    pub fn with_resistance(mut self, fire_resistance: f32) -> Self {
        self.fire_resistance = fire_resistance;
        self
    }

    pub fn with_accumulated_energy(mut self, accumulated_energy: f32) -> Self {
        self.accumulated_energy = accumulated_energy;
        self
    }

    pub fn with_direct_energy(mut self, direct_energy: f32) -> Self {
        self.direct_energy = direct_energy;
        self
    }

    /// Whether the owning object is still known
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.owner.is_some()
    }

    /// Whether this record emits heat this pass
    #[inline]
    pub fn can_send(&self) -> bool {
        self.is_valid()
            && self.is_fire_sender
            && self.is_burning
            && !self.is_destroyed
            && !self.is_exploded
            && self.position.is_some()
            && self.fire_energy.is_finite()
            && self.fire_energy > 0.0
    }

    /// Whether this record takes heat through the spatial path
    #[inline]
    pub fn can_receive(&self) -> bool {
        self.is_valid()
            && self.is_fire_receiver
            && !self.is_destroyed
            && !self.is_exploded
            && self.position.is_some()
    }

    /// Radius to search around this sender
    #[inline]
    pub fn query_radius(&self) -> f32 {
        self.hard_radius.max(self.soft_radius).max(0.0)
    }

    /// Current combustion stage derived from the flags
    pub fn stage(&self) -> BurnStage {
        if self.is_exploded {
            BurnStage::Exploded
        } else if self.is_destroyed {
            BurnStage::Destroyed
        } else if self.is_burning {
            BurnStage::Burning
        } else {
            BurnStage::Unburnt
        }
    }

    /// Move forward to `stage`, setting every earlier flag on the way.
    ///
    /// Returns `true` if the stage changed. Never moves backwards.
    pub fn upgrade_to(&mut self, stage: BurnStage) -> bool {
        if stage <= self.stage() {
            return false;
        }
        self.is_burning = true;
        self.is_destroyed |= stage >= BurnStage::Destroyed;
        self.is_exploded |= stage >= BurnStage::Exploded;
        true
    }

    /// Copy results of a pass into this record without ever clearing a flag
    fn absorb(&mut self, computed: &ComponentData) {
        self.is_burning |= computed.is_burning;
        self.is_destroyed |= computed.is_destroyed;
        self.is_exploded |= computed.is_exploded;
        self.accumulated_energy = computed.accumulated_energy;
        self.calculated_spread_energy = computed.calculated_spread_energy;
        if self.source.is_none() {
            self.source = computed.source;
        }
    }
}

/// Records prepared on the caller's thread for the next pass
#[derive(Debug, Default, Clone)]
pub struct ComponentDataRegistry {
    records: Vec<ComponentData>,
    /// Bumped by every `add_new`, parallel to `records`
    revisions: Vec<u64>,
    next_revision: u64,
    by_owner: FxHashMap<ObjectHandle, usize>,
}

impl ComponentDataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh record for `owner` and hand it back for filling in.
    ///
    /// An owner that already has a record gets it replaced by a fresh one.
    /// Results of passes started before the replacement are not merged into it.
    pub fn add_new(&mut self, owner: ObjectHandle) -> &mut ComponentData {
        let revision = self.next_revision;
        self.next_revision += 1;

        let index = match self.by_owner.get(&owner) {
            Some(&index) => {
                self.records[index] = ComponentData::new(owner);
                self.revisions[index] = revision;
                index
            }
            None => {
                let index = self.records.len();
                self.records.push(ComponentData::new(owner));
                self.revisions.push(revision);
                self.by_owner.insert(owner, index);
                index
            }
        };
        &mut self.records[index]
    }

    /// Record for `owner`, if any
    pub fn get(&self, owner: ObjectHandle) -> Option<&ComponentData> {
        self.by_owner.get(&owner).map(|&index| &self.records[index])
    }

    /// Mutable record for `owner`, if any
    pub fn get_mut(&mut self, owner: ObjectHandle) -> Option<&mut ComponentData> {
        let index = *self.by_owner.get(&owner)?;
        Some(&mut self.records[index])
    }

    /// Detach `owner` from its record. The record is skipped from now on and
    /// dropped by the next [`ComponentDataRegistry::prune_invalid`].
    pub fn invalidate(&mut self, owner: ObjectHandle) -> bool {
        match self.by_owner.remove(&owner) {
            Some(index) => {
                self.records[index].owner = None;
                true
            }
            None => false,
        }
    }

    /// Drop records without an owner. Returns how many were removed.
    pub fn prune_invalid(&mut self) -> usize {
        let before = self.records.len();
        let mut kept = 0;
        for index in 0..before {
            if self.records[index].is_valid() {
                self.records.swap(kept, index);
                self.revisions.swap(kept, index);
                kept += 1;
            }
        }
        self.records.truncate(kept);
        self.revisions.truncate(kept);

        let removed = before - kept;
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    /// Copy the valid records into `out` for a pass.
    ///
    /// `direct_energy` is handed over with the copy and cleared here so it is
    /// applied exactly once.
    pub fn take_snapshot(&mut self, out: &mut Vec<ComponentData>) {
        out.clear();
        for (record, &revision) in self.records.iter_mut().zip(&self.revisions) {
            if !record.is_valid() {
                continue;
            }
            let mut copy = record.clone();
            copy.revision = revision;
            out.push(copy);
            record.direct_energy = 0.0;
        }
    }

    /// Write the outcome of a pass back into the matching records.
    ///
    /// Records whose owner has since been invalidated or re-added are left alone.
    pub fn apply_result(&mut self, result: &[ComponentData]) -> usize {
        let mut applied = 0;
        for computed in result {
            let Some(owner) = computed.owner else {
                continue;
            };
            let Some(&index) = self.by_owner.get(&owner) else {
                continue;
            };
            if self.revisions[index] != computed.revision {
                continue;
            }
            self.records[index].absorb(computed);
            applied += 1;
        }
        applied
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentData> + '_ {
        self.records.iter()
    }

    fn reindex(&mut self) {
        self.by_owner.clear();
        for (index, record) in self.records.iter().enumerate() {
            if let Some(owner) = record.owner {
                self.by_owner.insert(owner, index);
            }
        }
    }
}
