//! Module stack: attachment metadata and the capability graph.
//!
//! The stack owns every attached module together with its resolved
//! [`AttachmentMetadata`] and keeps three invariants at all times:
//!
//! - summed capacity cost never exceeds the stack capacity
//! - every attached module's `requires` is covered by the union of `provides`
//! - no two modules share a `(slot, index)` attachment point
//!
//! Modules are listed in `(slot, index, id)` order. That order is the
//! tie-break used by actuator arbitration, so it must be stable across runs.
//!
//! # Example
//!
//! ```
//! use mechkit_core::stack::ModuleStack;
//! use mechkit_core::modules::{MovementModule, PowerCoreModule};
//!
//! let mut stack = ModuleStack::new(4);
//! assert!(stack.attach(Box::new(MovementModule::new("drive"))).is_err());
//!
//! stack.attach(Box::new(PowerCoreModule::new("core"))).unwrap();
//! stack.attach(Box::new(MovementModule::new("drive"))).unwrap();
//! assert!(stack.has_capability("mobility.drive"));
//! assert!(stack.detach(&"core".into()).is_err());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StackError;
use crate::ids::{Capability, ModuleId};
use crate::module::Module;

/// Resolved attachment of a module, owned by the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Slot bucket.
    pub slot: String,
    /// Position within the slot.
    pub index: u32,
    /// Capabilities contributed to the stack.
    pub provides: BTreeSet<Capability>,
    /// Capabilities the module depends on.
    pub requires: BTreeSet<Capability>,
    /// Capacity consumed.
    pub capacity_cost: u32,
}

/// One attached module as seen in a [`StackSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedModule {
    /// Module id.
    pub id: ModuleId,
    /// Module title.
    pub title: String,
    /// Resolved attachment.
    pub metadata: AttachmentMetadata,
}

/// Comparable view of the whole stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSnapshot {
    /// Stack capacity.
    pub capacity: u32,
    /// Summed capacity cost of attached modules.
    pub used: u32,
    /// Union of provided capabilities.
    pub capabilities: Vec<Capability>,
    /// Attached modules in stack order.
    pub modules: Vec<AttachedModule>,
}

struct StackEntry {
    module: Box<dyn Module>,
    metadata: AttachmentMetadata,
}

/// Ordered set of attached modules with capacity and capability checks.
pub struct ModuleStack {
    capacity: u32,
    entries: BTreeMap<ModuleId, StackEntry>,
    /// Module ids sorted by `(slot, index, id)`.
    order: Vec<ModuleId>,
    capabilities: BTreeSet<Capability>,
}

impl fmt::Debug for ModuleStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleStack")
            .field("capacity", &self.capacity)
            .field("order", &self.order)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl ModuleStack {
    /// Creates an empty stack with the given capacity.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
            order: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Attaches a module and returns its resolved metadata.
    ///
    /// Checks run in this order: duplicate id, free auto index, capacity, required
    /// capabilities (against the current union plus the module's own
    /// `provides`), then attachment point. Nothing changes on failure.
    ///
    /// # Errors
    ///
    /// [`StackError::AlreadyAttached`], [`StackError::SlotExhausted`], [`StackError::CapacityExceeded`],
    /// [`StackError::MissingCapability`] or [`StackError::AttachmentOccupied`].
    pub fn attach(&mut self, module: Box<dyn Module>) -> Result<AttachmentMetadata, StackError> {
        let definition = module.definition();
        let id = definition.id.clone();
        if self.entries.contains_key(&id) {
            return Err(StackError::AlreadyAttached(id));
        }

        let slot = definition.attachment.slot.clone();
        let index = match definition.attachment.index {
            Some(index) => index,
            None => self.next_index(&slot).ok_or_else(|| StackError::SlotExhausted {
                module: id.clone(),
                slot: slot.clone(),
            })?,
        };
        let metadata = AttachmentMetadata {
            slot,
            index,
            provides: definition.provides.clone(),
            requires: definition.requires.clone(),
            capacity_cost: definition.capacity_cost,
        };

        let used = self.used_capacity();
        if used.saturating_add(metadata.capacity_cost) > self.capacity {
            return Err(StackError::CapacityExceeded {
                module: id,
                required: metadata.capacity_cost,
                available: self.capacity.saturating_sub(used),
            });
        }

        if let Some(missing) = metadata
            .requires
            .iter()
            .find(|cap| !self.capabilities.contains(*cap) && !metadata.provides.contains(*cap))
        {
            return Err(StackError::MissingCapability {
                module: id,
                capability: missing.clone(),
            });
        }

        if self
            .entries
            .values()
            .any(|e| e.metadata.slot == metadata.slot && e.metadata.index == metadata.index)
        {
            return Err(StackError::AttachmentOccupied {
                slot: metadata.slot,
                index: metadata.index,
            });
        }

        debug!(module = %id, slot = %metadata.slot, index = metadata.index, "module attached to stack");
        self.entries.insert(
            id,
            StackEntry {
                module,
                metadata: metadata.clone(),
            },
        );
        self.reorder();
        self.rebuild_capabilities();
        Ok(metadata)
    }

    /// Detaches a module and hands it back.
    ///
    /// Returns `Ok(None)` for an unknown id. The removal only commits if
    /// every remaining module still finds its `requires` in the reduced
    /// capability set; capacity cannot be violated by a detach.
    ///
    /// # Errors
    ///
    /// [`StackError::DependencyWouldBreak`] naming the first dependent module
    /// in stack order. The stack is unchanged in that case.
    pub fn detach(&mut self, id: &ModuleId) -> Result<Option<Box<dyn Module>>, StackError> {
        if !self.entries.contains_key(id) {
            return Ok(None);
        }

        let remaining: BTreeSet<&Capability> = self
            .entries
            .iter()
            .filter(|(other, _)| *other != id)
            .flat_map(|(_, e)| e.metadata.provides.iter())
            .collect();

        for dependent in self.order.iter().filter(|other| *other != id) {
            let entry = &self.entries[dependent];
            if let Some(capability) = entry.metadata.requires.iter().find(|cap| !remaining.contains(cap)) {
                return Err(StackError::DependencyWouldBreak {
                    module: id.clone(),
                    capability: capability.clone(),
                    dependent: dependent.clone(),
                });
            }
        }

        let entry = self.entries.remove(id);
        self.reorder();
        self.rebuild_capabilities();
        debug!(module = %id, "module detached from stack");
        Ok(entry.map(|e| e.module))
    }

    /// Iterates attached modules in `(slot, index, id)` order.
    pub fn list(&self) -> impl Iterator<Item = (&ModuleId, &AttachmentMetadata)> {
        self.order.iter().map(|id| (id, &self.entries[id].metadata))
    }

    /// Attached module ids in stack order.
    #[must_use]
    pub fn ids(&self) -> &[ModuleId] {
        &self.order
    }

    /// Returns true if any attached module provides `capability`.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|cap| cap.as_str() == capability)
    }

    /// Union of provided capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Returns the attached module with this id.
    #[must_use]
    pub fn get_module(&self, id: &ModuleId) -> Option<&dyn Module> {
        self.entries.get(id).map(|e| e.module.as_ref())
    }

    /// Returns the attached module with this id, mutably.
    pub fn get_module_mut(&mut self, id: &ModuleId) -> Option<&mut (dyn Module + 'static)> {
        self.entries.get_mut(id).map(|e| e.module.as_mut())
    }

    /// Returns the resolved metadata of an attached module.
    #[must_use]
    pub fn metadata(&self, id: &ModuleId) -> Option<&AttachmentMetadata> {
        self.entries.get(id).map(|e| &e.metadata)
    }

    /// Position of the module in stack order, used as the arbitration tie-break.
    #[must_use]
    pub fn order_index(&self, id: &ModuleId) -> Option<usize> {
        self.order.iter().position(|other| other == id)
    }

    /// Stack capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Summed capacity cost of attached modules.
    #[must_use]
    pub fn used_capacity(&self) -> u32 {
        self.entries.values().map(|e| e.metadata.capacity_cost).sum()
    }

    /// Number of attached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comparable view of the stack.
    #[must_use]
    pub fn snapshot(&self) -> StackSnapshot {
        StackSnapshot {
            capacity: self.capacity,
            used: self.used_capacity(),
            capabilities: self.capabilities.iter().cloned().collect(),
            modules: self
                .order
                .iter()
                .map(|id| {
                    let entry = &self.entries[id];
                    AttachedModule {
                        id: id.clone(),
                        title: entry.module.definition().title.clone(),
                        metadata: entry.metadata.clone(),
                    }
                })
                .collect(),
        }
    }

    /// One past the highest index in `slot`, or `None` past `u32::MAX`.
    fn next_index(&self, slot: &str) -> Option<u32> {
        match self
            .entries
            .values()
            .filter(|e| e.metadata.slot == slot)
            .map(|e| e.metadata.index)
            .max()
        {
            Some(highest) => highest.checked_add(1),
            None => Some(0),
        }
    }

    fn reorder(&mut self) {
        let mut order: Vec<ModuleId> = self.entries.keys().cloned().collect();
        order.sort_by(|a, b| {
            let ma = &self.entries[a].metadata;
            let mb = &self.entries[b].metadata;
            ma.slot
                .cmp(&mb.slot)
                .then(ma.index.cmp(&mb.index))
                .then_with(|| a.cmp(b))
        });
        self.order = order;
    }

    fn rebuild_capabilities(&mut self) {
        self.capabilities = self
            .entries
            .values()
            .flat_map(|e| e.metadata.provides.iter().cloned())
            .collect();
    }
}
