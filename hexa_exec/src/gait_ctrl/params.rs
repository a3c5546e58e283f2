//! Parameters structure for GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::ops::Neg;
use std::time::Duration;

use super::Side;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A joint angle delta given separately for the left and right sides of the body.
///
/// Servos on opposite sides are mirror images of each other, so the same physical motion needs
/// opposite signs on each side.
///
/// Units: degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideDelta {
    pub left: f64,
    pub right: f64,
}

/// Parameters for gait control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {

    // ---- TIMING ----

    /// Delay after each phase of a turn.
    ///
    /// Units: milliseconds
    pub turn_delay_ms: u64,

    /// Delay after each phase of a forward stride.
    ///
    /// Units: milliseconds
    pub forward_delay_ms: u64,

    // ---- DELTAS ----

    /// Horizontal delta applied to every leg at the start of a clockwise turn.
    ///
    /// Units: degrees
    pub turn_cw_delta_deg: f64,

    /// Horizontal delta applied to every leg at the start of a counter clockwise turn.
    ///
    /// Units: degrees
    pub turn_ccw_delta_deg: f64,

    /// Vertical delta raising a leg off the ground.
    pub rise_delta_deg: SideDelta,

    /// Horizontal delta swinging a leg forwards. The grounded legs are given the negated delta.
    pub forward_delta_deg: SideDelta,

    /// Horizontal delta used to pull the body back in an attack.
    pub aggro_delta_deg: SideDelta,

    // ---- SEQUENCING ----

    /// Number of strides taken by a single forward command.
    pub stride_count: u32,

    /// Maximum number of actions waiting behind the running one. Once full new actions are
    /// rejected. Zero means actions are only accepted while the executor is idle.
    pub queue_len: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SideDelta {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// The same delta on both sides.
    pub fn uniform(delta: f64) -> Self {
        Self::new(delta, delta)
    }

    /// No motion.
    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    pub fn for_side(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

impl Neg for SideDelta {
    type Output = SideDelta;

    fn neg(self) -> Self::Output {
        SideDelta::new(-self.left, -self.right)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::dual_bank()
    }
}

impl Params {

    /// Gait tuned for the two bank, 18 servo hexapod.
    pub fn dual_bank() -> Self {
        Self {
            turn_delay_ms: 125,
            forward_delay_ms: 125,
            turn_cw_delta_deg: 30.0,
            turn_ccw_delta_deg: -30.0,
            rise_delta_deg: SideDelta::new(-30.0, 30.0),
            forward_delta_deg: SideDelta::new(-15.0, 15.0),
            aggro_delta_deg: SideDelta::new(-45.0, 45.0),
            stride_count: 5,
            queue_len: 4,
        }
    }

    /// Gait tuned for the single bank, 16 servo hexapod.
    ///
    /// This build's horizontal servos turn the other way round, hence the inverted turn deltas.
    pub fn single_bank() -> Self {
        Self {
            turn_delay_ms: 80,
            forward_delay_ms: 80,
            turn_cw_delta_deg: -30.0,
            turn_ccw_delta_deg: 30.0,
            ..Self::dual_bank()
        }
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    pub fn forward_delay(&self) -> Duration {
        Duration::from_millis(self.forward_delay_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_profiles() {
        let dual = Params::dual_bank();
        let single = Params::single_bank();

        assert_eq!(dual.turn_delay(), Duration::from_millis(125));
        assert_eq!(single.forward_delay(), Duration::from_millis(80));
        assert_eq!(dual.turn_cw_delta_deg, -single.turn_cw_delta_deg);
        assert_eq!(dual.rise_delta_deg, single.rise_delta_deg);
        assert_eq!(dual.stride_count, 5);
    }

    #[test]
    fn test_side_delta() {
        let d = SideDelta::new(-15.0, 15.0);

        assert_eq!(d.for_side(Side::Left), -15.0);
        assert_eq!(d.for_side(Side::Right), 15.0);
        assert_eq!(-d, SideDelta::new(15.0, -15.0));
        assert_eq!(SideDelta::zero().for_side(Side::Right), 0.0);
    }

    #[test]
    fn test_params_from_toml() {
        let p: Params = util::params::parse(
            r#"
            turn_delay_ms = 100
            forward_delay_ms = 90
            turn_cw_delta_deg = 25.0
            turn_ccw_delta_deg = -25.0
            rise_delta_deg = { left = -20.0, right = 20.0 }
            forward_delta_deg = { left = -10.0, right = 10.0 }
            aggro_delta_deg = { left = -40.0, right = 40.0 }
            stride_count = 3
            queue_len = 0
            "#,
        )
        .unwrap();

        assert_eq!(p.forward_delay(), Duration::from_millis(90));
        assert_eq!(p.rise_delta_deg, SideDelta::new(-20.0, 20.0));
        assert_eq!(p.queue_len, 0);
    }
}
