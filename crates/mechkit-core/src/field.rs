//! Harvestable resource field around the chassis.
//!
//! Nodes are generated from [`FieldConfig::seed`] with a ChaCha8 RNG, so the
//! same config always yields the same field. Depleted nodes stay in place
//! with quantity 0 and are skipped by [`ResourceField::scan`] and
//! [`ResourceField::nearest`].

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ids::ResourceId;

/// Largest usable [`FieldConfig::extent`]; larger values are clamped.
pub const MAX_EXTENT: f32 = 1.0e6;

/// Parameters of the generated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// RNG seed.
    pub seed: u64,
    /// Number of nodes to generate.
    pub node_count: u32,
    /// Nodes are placed in `[-extent, extent]` on both axes, with `extent`
    /// clamped to [`MAX_EXTENT`].
    pub extent: f32,
    /// Smallest initial node quantity.
    pub min_quantity: u32,
    /// Largest initial node quantity.
    pub max_quantity: u32,
    /// Resource kinds to pick from.
    pub resources: Vec<ResourceId>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            node_count: 16,
            extent: 50.0,
            min_quantity: 5,
            max_quantity: 20,
            resources: vec![ResourceId::new("ore"), ResourceId::new("ice"), ResourceId::new("silicon")],
        }
    }
}

/// One harvestable deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Node id, unique within the field.
    pub id: u32,
    /// Resource it yields.
    pub resource: ResourceId,
    /// World position.
    pub position: Vec2,
    /// Units left.
    pub quantity: u32,
}

/// A node found by a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanHit {
    /// Node id.
    pub node_id: u32,
    /// Resource it yields.
    pub resource: ResourceId,
    /// World position.
    pub position: Vec2,
    /// Distance from the scan origin.
    pub distance: f32,
    /// Units left.
    pub quantity: u32,
}

/// The set of resource nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceField {
    nodes: Vec<ResourceNode>,
    next_id: u32,
}

impl ResourceField {
    /// An empty field.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Generates a field deterministically from `config`.
    #[must_use]
    pub fn generate(config: &FieldConfig) -> Self {
        let mut field = Self::empty();
        if config.resources.is_empty() {
            return field;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let extent = if config.extent.is_finite() {
            config.extent.abs().min(MAX_EXTENT)
        } else {
            0.0
        };
        let low = config.min_quantity.min(config.max_quantity);
        let high = config.min_quantity.max(config.max_quantity);

        for _ in 0..config.node_count {
            let resource = config.resources[rng.gen_range(0..config.resources.len())].clone();
            let position = Vec2::new(rng.gen_range(-extent..=extent), rng.gen_range(-extent..=extent));
            let quantity = rng.gen_range(low..=high);
            field.add_node(resource, position, quantity);
        }
        field
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self, resource: ResourceId, position: Vec2, quantity: u32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(ResourceNode {
            id,
            resource,
            position,
            quantity,
        });
        id
    }

    /// All nodes in id order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: u32) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Non-depleted nodes within `radius` of `origin`, nearest first; ties go
    /// to the lower id.
    #[must_use]
    pub fn scan(&self, origin: Vec2, radius: f32) -> Vec<ScanHit> {
        let mut hits: Vec<ScanHit> = self
            .nodes
            .iter()
            .filter(|n| n.quantity > 0)
            .filter_map(|n| {
                let distance = n.position.distance(origin);
                (distance <= radius).then(|| ScanHit {
                    node_id: n.id,
                    resource: n.resource.clone(),
                    position: n.position,
                    distance,
                    quantity: n.quantity,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.node_id.cmp(&b.node_id)));
        hits
    }

    /// Closest non-depleted node of `resource` within `reach`.
    #[must_use]
    pub fn nearest(&self, origin: Vec2, resource: &ResourceId, reach: f32) -> Option<&ResourceNode> {
        self.nodes
            .iter()
            .filter(|n| n.quantity > 0 && &n.resource == resource)
            .map(|n| (n, n.position.distance(origin)))
            .filter(|(_, distance)| *distance <= reach)
            .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)))
            .map(|(n, _)| n)
    }

    /// Takes up to `amount` units from a node and returns how many were taken.
    /// Unknown ids yield 0.
    pub fn harvest(&mut self, node_id: u32, amount: u32) -> u32 {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return 0;
        };
        let taken = amount.min(node.quantity);
        node.quantity -= taken;
        taken
    }

    /// Units left across all nodes of `resource`.
    #[must_use]
    pub fn remaining(&self, resource: &ResourceId) -> u32 {
        self.nodes
            .iter()
            .filter(|n| &n.resource == resource)
            .map(|n| n.quantity)
            .sum()
    }
}
