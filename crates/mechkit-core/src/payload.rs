//! Typed payloads carried across the bus, the actuator queue and actions.
//!
//! Every payload is a closed enum, so shape checks happen once at the call
//! boundary (a module matches on the variant it expects) instead of
//! inspecting loosely-typed maps at runtime.
//!
//! - [`TelemetryValue`]: values published on the bus
//! - [`ActuatorPayload`]: requests queued per actuator channel
//! - [`ActionPayload`]: arguments to [`Chassis::invoke_action`](crate::chassis::Chassis::invoke_action)
//! - [`ActionResult`]: what an action hands back to its caller

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::field::ScanHit;
use crate::ids::{ResourceId, SlotId};
use crate::inventory::{StoreResult, TransferOutcome, WithdrawResult};

// =============================================================================
// Telemetry
// =============================================================================

/// A telemetry value published by a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum TelemetryValue {
    /// Boolean flag.
    Bool(bool),
    /// Scalar reading.
    Number(f64),
    /// Free text (labels, recipe names, signal names).
    Text(String),
    /// 2D vector reading.
    Vector(Vec2),
    /// Ordered list of values.
    List(Vec<TelemetryValue>),
}

impl TelemetryValue {
    /// Returns the scalar if this is a `Number`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the text if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for TelemetryValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for TelemetryValue {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for TelemetryValue {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for TelemetryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for TelemetryValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec2> for TelemetryValue {
    fn from(v: Vec2) -> Self {
        Self::Vector(v)
    }
}

// =============================================================================
// Actuators
// =============================================================================

/// Payload of an actuator request.
///
/// The built-in channels expect `Linear` on `movement.linear`, `Angular` on
/// `movement.angular` and `PowerDraw` on `power.draw`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActuatorPayload {
    /// Target linear velocity.
    Linear {
        /// Velocity in units per second.
        velocity: Vec2,
    },
    /// Target angular velocity.
    Angular {
        /// Rate in radians per second.
        rate: f32,
    },
    /// Energy drawn and heat produced this tick.
    PowerDraw {
        /// Energy to drain.
        energy: f32,
        /// Heat to add.
        heat: f32,
    },
}

impl ActuatorPayload {
    /// Returns true if every number in the payload is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Linear { velocity } => velocity.is_finite(),
            Self::Angular { rate } => rate.is_finite(),
            Self::PowerDraw { energy, heat } => energy.is_finite() && heat.is_finite(),
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Status signal shown by the status module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    /// Nothing to report.
    Idle,
    /// Working on a task.
    Active,
    /// Needs attention.
    Warning,
    /// Something failed.
    Fault,
}

impl Signal {
    /// Lowercase name used in telemetry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Warning => "warning",
            Self::Fault => "fault",
        }
    }
}

/// Arguments passed to a module action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionPayload {
    /// No arguments.
    Empty,
    /// A linear velocity.
    Linear {
        /// Velocity in units per second.
        velocity: Vec2,
    },
    /// An angular velocity.
    Angular {
        /// Rate in radians per second.
        rate: f32,
    },
    /// An amount of a resource.
    Resource {
        /// Resource kind.
        resource: ResourceId,
        /// Amount requested.
        amount: u32,
    },
    /// A slot-to-slot move.
    SlotTransfer {
        /// Source slot.
        source: SlotId,
        /// Target slot.
        target: SlotId,
        /// Units to move, or the whole source stack.
        amount: Option<u32>,
    },
    /// An exchange with a named storage box.
    Depot {
        /// Storage box id.
        box_id: String,
        /// Resource kind.
        resource: ResourceId,
        /// Amount requested.
        amount: u32,
    },
    /// A crafting recipe name.
    Recipe {
        /// Recipe id.
        recipe: String,
    },
    /// A scan radius.
    Scan {
        /// Radius in world units.
        radius: f32,
    },
    /// A status signal.
    Signal {
        /// Signal to show.
        signal: Signal,
        /// Optional text shown next to the signal.
        message: Option<String>,
    },
}

/// Result returned by a module action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum ActionResult {
    /// The action completed with nothing to report.
    Done,
    /// Outcome of storing into inventory or a box.
    Stored(StoreResult),
    /// Outcome of withdrawing from inventory or a box.
    Withdrawn(WithdrawResult),
    /// Outcome of a slot-to-slot transfer.
    Transfer(TransferOutcome),
    /// Units pulled out of the resource field.
    Harvested {
        /// Resource kind.
        resource: ResourceId,
        /// Units that reached the inventory.
        amount: u32,
    },
    /// Field nodes found by a scan.
    Scan(Vec<ScanHit>),
    /// A crafting job was started.
    Crafting {
        /// Recipe id.
        recipe: String,
        /// Seconds until completion.
        duration: f32,
    },
    /// The signal now shown.
    Signal(Signal),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_actuator_payloads_are_detected() {
        assert!(ActuatorPayload::Angular { rate: 1.0 }.is_finite());
        assert!(!ActuatorPayload::Angular { rate: f32::NAN }.is_finite());
        assert!(!ActuatorPayload::Linear {
            velocity: Vec2::new(f32::INFINITY, 0.0)
        }
        .is_finite());
        assert!(!ActuatorPayload::PowerDraw {
            energy: 1.0,
            heat: f32::NAN
        }
        .is_finite());
    }

    #[test]
    fn telemetry_value_accessors() {
        assert_eq!(TelemetryValue::from(2.5_f64).as_number(), Some(2.5));
        assert_eq!(TelemetryValue::from(true).as_bool(), Some(true));
        assert_eq!(TelemetryValue::from("idle").as_text(), Some("idle"));
        assert_eq!(TelemetryValue::from(true).as_number(), None);
    }

    #[test]
    fn action_payload_json_shape() {
        let payload = ActionPayload::Resource {
            resource: ResourceId::new("ore"),
            amount: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "resource");
        assert_eq!(json["resource"], "ore");
        assert_eq!(json["amount"], 3);
    }
}
