//! Physical state of a chassis.
//!
//! Modules never write this directly. They read a snapshot through
//! [`ModuleContext`](crate::module::ModuleContext) and change it by queueing
//! actuator requests; the chassis applies the arbitration winners, then
//! integrates motion and dissipates heat.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Position, orientation, velocities, energy and heat of a chassis.
///
/// # Example
///
/// ```
/// use mechkit_core::state::PhysicalState;
/// use glam::Vec2;
///
/// let mut state = PhysicalState::with_energy(50.0);
/// state.linear_velocity = Vec2::new(2.0, 0.0);
/// state.integrate(0.5);
/// assert_eq!(state.position, Vec2::new(1.0, 0.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalState {
    /// World position.
    pub position: Vec2,
    /// Heading in radians, kept in `(-pi, pi]`.
    pub orientation: f32,
    /// Linear velocity in units per second.
    pub linear_velocity: Vec2,
    /// Angular velocity in radians per second.
    pub angular_velocity: f32,
    /// Stored energy.
    pub energy: f32,
    /// Accumulated heat.
    pub heat: f32,
}

impl Default for PhysicalState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            orientation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            energy: 0.0,
            heat: 0.0,
        }
    }
}

impl PhysicalState {
    /// Creates a resting state at the origin with the given energy.
    #[must_use]
    pub fn with_energy(energy: f32) -> Self {
        Self {
            energy,
            ..Self::default()
        }
    }

    /// Advances position and orientation by `step_seconds`.
    pub fn integrate(&mut self, step_seconds: f32) {
        self.position += self.linear_velocity * step_seconds;
        self.orientation = normalize_angle(self.orientation + self.angular_velocity * step_seconds);
    }

    /// Removes up to `step_seconds * rate` heat, never going below zero.
    pub fn dissipate_heat(&mut self, step_seconds: f32, rate: f32) {
        let cooled = (step_seconds * rate).max(0.0).min(self.heat);
        self.heat = (self.heat - cooled).max(0.0);
    }

    /// Drains energy (floored at zero) and adds heat.
    pub fn draw_power(&mut self, energy: f32, heat: f32) {
        self.energy = (self.energy - energy.max(0.0)).max(0.0);
        self.heat += heat.max(0.0);
    }
}

/// Wraps an angle into `(-pi, pi]`.
///
/// ```
/// use mechkit_core::state::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert_eq!(normalize_angle(-PI), PI);
/// assert!((normalize_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-5);
/// ```
#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    mod integration_tests {
        use super::*;

        #[test]
        fn position_advances_by_velocity() {
            let mut state = PhysicalState::default();
            state.linear_velocity = Vec2::new(3.0, -1.0);
            state.integrate(2.0);
            assert_eq!(state.position, Vec2::new(6.0, -2.0));
        }

        #[test]
        fn orientation_wraps_past_pi() {
            let mut state = PhysicalState::default();
            state.orientation = 3.0;
            state.angular_velocity = 1.0;
            state.integrate(1.0);
            assert!((state.orientation - (4.0 - TAU)).abs() < EPSILON);
            assert!(state.orientation > -PI && state.orientation <= PI);
        }

        #[test]
        fn negative_pi_maps_to_pi() {
            assert!((normalize_angle(-PI) - PI).abs() < EPSILON);
            assert!((normalize_angle(PI) - PI).abs() < EPSILON);
            assert!(normalize_angle(0.0).abs() < EPSILON);
        }
    }

    mod thermal_tests {
        use super::*;

        #[test]
        fn heat_dissipates_at_rate() {
            let mut state = PhysicalState::default();
            state.heat = 10.0;
            state.dissipate_heat(1.0, 5.0);
            assert!((state.heat - 5.0).abs() < EPSILON);
        }

        #[test]
        fn heat_never_goes_negative() {
            let mut state = PhysicalState::default();
            state.heat = 2.0;
            state.dissipate_heat(1.0, 5.0);
            assert_eq!(state.heat, 0.0);
        }

        #[test]
        fn power_draw_floors_energy() {
            let mut state = PhysicalState::with_energy(3.0);
            state.draw_power(5.0, 1.5);
            assert_eq!(state.energy, 0.0);
            assert!((state.heat - 1.5).abs() < EPSILON);
        }
    }
}
