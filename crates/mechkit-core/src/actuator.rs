//! Actuator requests, per-channel queues and arbitration.
//!
//! Modules never write physical state. During a tick they queue
//! [`ActuatorRequest`]s on named channels (`movement.linear`, ...); after all
//! modules have run, the chassis picks exactly one winner per channel and
//! hands it to that channel's [`ChannelHandler`].
//!
//! # Arbitration order
//!
//! Requests are ranked by:
//! 1. `priority`, highest first
//! 2. `order` (position in the module stack), lowest first
//! 3. `module_id`, lexicographically smallest first
//!
//! Losing requests are discarded for the tick. Channels without a handler are
//! dropped silently.
//!
//! # Example
//!
//! ```
//! use mechkit_core::actuator::{ActuatorQueue, ActuatorRequest};
//! use mechkit_core::payload::ActuatorPayload;
//!
//! let mut queue = ActuatorQueue::new();
//! queue.push("movement.angular", ActuatorRequest::new("a", ActuatorPayload::Angular { rate: 1.0 }, 1, 0));
//! queue.push("movement.angular", ActuatorRequest::new("b", ActuatorPayload::Angular { rate: 2.0 }, 5, 1));
//!
//! let ranked = queue.take_ranked();
//! let (channel, requests) = &ranked[0];
//! assert_eq!(channel, "movement.angular");
//! assert_eq!(requests[0].module_id.as_str(), "b");
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ids::ModuleId;
use crate::payload::ActuatorPayload;
use crate::state::PhysicalState;

/// Channel setting the linear velocity.
pub const MOVEMENT_LINEAR: &str = "movement.linear";
/// Channel setting the angular velocity.
pub const MOVEMENT_ANGULAR: &str = "movement.angular";
/// Channel draining energy and adding heat.
pub const POWER_DRAW: &str = "power.draw";

// =============================================================================
// Requests and Queue
// =============================================================================

/// A module's demand on one actuator channel for the current tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorRequest {
    /// Requesting module.
    pub module_id: ModuleId,
    /// Requested change.
    pub payload: ActuatorPayload,
    /// Higher wins.
    pub priority: i32,
    /// Stack position of the requester; lower wins ties.
    pub order: usize,
}

impl ActuatorRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(module_id: &str, payload: ActuatorPayload, priority: i32, order: usize) -> Self {
        Self {
            module_id: ModuleId::new(module_id),
            payload,
            priority,
            order,
        }
    }

    /// Total arbitration order: the winner sorts first.
    #[must_use]
    pub fn rank(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.order.cmp(&other.order))
            .then_with(|| self.module_id.cmp(&other.module_id))
    }
}

/// Pending requests grouped by channel.
///
/// Requests accumulate; nothing is overwritten until the queue is drained.
#[derive(Debug, Clone, Default)]
pub struct ActuatorQueue {
    channels: BTreeMap<String, Vec<ActuatorRequest>>,
}

impl ActuatorQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to a channel.
    pub fn push(&mut self, channel: &str, request: ActuatorRequest) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(request);
    }

    /// Requests currently queued on a channel.
    #[must_use]
    pub fn pending(&self, channel: &str) -> &[ActuatorRequest] {
        self.channels.get(channel).map_or(&[], Vec::as_slice)
    }

    /// Total number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.values().all(Vec::is_empty)
    }

    /// Drops every request made by `module_id`.
    pub fn remove_module(&mut self, module_id: &ModuleId) {
        for requests in self.channels.values_mut() {
            requests.retain(|r| &r.module_id != module_id);
        }
        self.channels.retain(|_, requests| !requests.is_empty());
    }

    /// Empties the queue, returning each non-empty channel with its requests
    /// sorted winner-first. Channels come out in name order.
    pub fn take_ranked(&mut self) -> Vec<(String, Vec<ActuatorRequest>)> {
        std::mem::take(&mut self.channels)
            .into_iter()
            .filter(|(_, requests)| !requests.is_empty())
            .map(|(channel, mut requests)| {
                requests.sort_by(ActuatorRequest::rank);
                (channel, requests)
            })
            .collect()
    }
}

// =============================================================================
// Channel Handlers
// =============================================================================

/// What a channel handler sees for one arbitration round.
#[derive(Debug, Clone, Copy)]
pub struct ChannelInvocation<'a> {
    /// Channel name.
    pub channel: &'a str,
    /// The winning request.
    pub request: &'a ActuatorRequest,
    /// Every request for the channel this tick, winner first.
    pub all_requests: &'a [ActuatorRequest],
}

/// Applies the winning request of a channel to physical state.
///
/// Called exactly once per channel per tick, and only when the channel had
/// at least one request. Closures with the matching signature implement this
/// trait, which keeps test handlers short.
pub trait ChannelHandler {
    /// Applies the winner.
    fn apply(&self, invocation: &ChannelInvocation<'_>, state: &mut PhysicalState);
}

impl<F> ChannelHandler for F
where
    F: Fn(&ChannelInvocation<'_>, &mut PhysicalState),
{
    fn apply(&self, invocation: &ChannelInvocation<'_>, state: &mut PhysicalState) {
        self(invocation, state);
    }
}

/// Sets linear velocity from `ActuatorPayload::Linear`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDrive;

impl ChannelHandler for LinearDrive {
    fn apply(&self, invocation: &ChannelInvocation<'_>, state: &mut PhysicalState) {
        match invocation.request.payload {
            ActuatorPayload::Linear { velocity } => state.linear_velocity = velocity,
            other => warn!(channel = invocation.channel, payload = ?other, "ignored mismatched payload"),
        }
    }
}

/// Sets angular velocity from `ActuatorPayload::Angular`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AngularDrive;

impl ChannelHandler for AngularDrive {
    fn apply(&self, invocation: &ChannelInvocation<'_>, state: &mut PhysicalState) {
        match invocation.request.payload {
            ActuatorPayload::Angular { rate } => state.angular_velocity = rate,
            other => warn!(channel = invocation.channel, payload = ?other, "ignored mismatched payload"),
        }
    }
}

/// Drains energy and adds heat from `ActuatorPayload::PowerDraw`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerDraw;

impl ChannelHandler for PowerDraw {
    fn apply(&self, invocation: &ChannelInvocation<'_>, state: &mut PhysicalState) {
        match invocation.request.payload {
            ActuatorPayload::PowerDraw { energy, heat } => state.draw_power(energy, heat),
            other => warn!(channel = invocation.channel, payload = ?other, "ignored mismatched payload"),
        }
    }
}
