//! Phase planning for gait actions
//!
//! Each [`GaitAction`] expands into an ordered list of [`Phase`]s. A phase is a batch of logical
//! joint demands (base angle plus delta, before any reversed mounting is accounted for) followed by
//! an optional delay. Planning is pure, so the same plan can be executed on hardware or inspected
//! in tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use super::{GaitAction, Joint, Leg, LegTopology, Params, SideDelta, Tripod};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A demanded angle for one joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointDemand {
    pub leg: Leg,
    pub joint: Joint,

    /// Logical angle of the joint, the reversal for reversed servos is applied at dispatch.
    ///
    /// Units: degrees
    pub angle_deg: f64,
}

/// A batch of joint demands followed by an optional delay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Phase {
    pub demands: Vec<JointDemand>,
    pub delay: Option<Duration>,
}

/// Builds a single phase out of tripod moves.
struct PhaseBuilder<'a> {
    topology: &'a LegTopology,
    phase: Phase,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitAction {

    /// Expand the action into its phases for the given topology and gait parameters.
    pub fn plan(&self, topology: &LegTopology, params: &Params) -> Vec<Phase> {
        match *self {
            GaitAction::StandStill => vec![stand_still(topology).build()],
            GaitAction::TurnClockwise => turn(
                topology,
                params,
                Tripod::A,
                params.turn_cw_delta_deg
            ),
            GaitAction::TurnCounterClockwise => turn(
                topology,
                params,
                Tripod::B,
                params.turn_ccw_delta_deg
            ),
            GaitAction::Forward => forward(topology, params),
            GaitAction::Attack => vec![
                PhaseBuilder::new(topology)
                    .horizontal(Tripod::A, params.aggro_delta_deg)
                    .horizontal(Tripod::B, params.aggro_delta_deg)
                    .vertical(Tripod::A, SideDelta::zero())
                    .vertical(Tripod::B, SideDelta::zero())
                    .build()
            ],
            GaitAction::Test { offset_deg } => vec![
                PhaseBuilder::new(topology)
                    .horizontal(Tripod::A, SideDelta::zero())
                    .horizontal(Tripod::B, SideDelta::zero())
                    .vertical(Tripod::A, SideDelta::new(-offset_deg, offset_deg))
                    .vertical(Tripod::B, SideDelta::new(-offset_deg, offset_deg))
                    .build()
            ],
        }
    }
}

/// Every horizontal and vertical joint back to its base angle.
fn stand_still(topology: &LegTopology) -> PhaseBuilder<'_> {
    PhaseBuilder::new(topology)
        .horizontal(Tripod::A, SideDelta::zero())
        .horizontal(Tripod::B, SideDelta::zero())
        .vertical(Tripod::A, SideDelta::zero())
        .vertical(Tripod::B, SideDelta::zero())
}

/// Turn on the spot.
///
/// All legs are swung while grounded, dragging the body round, then each tripod in turn is lifted
/// and swung back to base.
fn turn(
    topology: &LegTopology,
    params: &Params,
    first: Tripod,
    delta_deg: f64
) -> Vec<Phase> {
    let delay = params.turn_delay();
    let second = first.other();

    vec![
        // Rotate while grounded
        PhaseBuilder::new(topology)
            .horizontal(first, SideDelta::uniform(delta_deg))
            .horizontal(second, SideDelta::uniform(delta_deg))
            .delay(delay),

        // Raise the first tripod and bring it back to base
        PhaseBuilder::new(topology)
            .vertical(first, params.rise_delta_deg)
            .horizontal(first, SideDelta::zero())
            .delay(delay),

        PhaseBuilder::new(topology)
            .vertical(first, SideDelta::zero())
            .delay(delay),

        // Same for the second tripod
        PhaseBuilder::new(topology)
            .vertical(second, params.rise_delta_deg)
            .horizontal(second, SideDelta::zero())
            .delay(delay),

        PhaseBuilder::new(topology)
            .vertical(second, SideDelta::zero())
            .delay(delay),
    ]
}

/// Tripod walk forwards.
///
/// In each half stride one tripod is raised and swung forwards while the grounded tripod swings
/// backwards, pushing the body forwards.
fn forward(topology: &LegTopology, params: &Params) -> Vec<Phase> {
    let delay = params.forward_delay();
    let fwd = params.forward_delta_deg;

    let half_stride = |raised: Tripod| {
        let grounded = raised.other();

        PhaseBuilder::new(topology)
            .vertical(raised, params.rise_delta_deg)
            .vertical(grounded, SideDelta::zero())
            .horizontal(raised, fwd)
            .horizontal(grounded, -fwd)
            .delay(delay)
    };

    let mut phases = Vec::with_capacity(2 * params.stride_count as usize + 1);

    for _ in 0..params.stride_count {
        phases.push(half_stride(Tripod::A));
        phases.push(half_stride(Tripod::B));
    }

    phases.push(stand_still(topology).delay(delay));

    phases
}

impl<'a> PhaseBuilder<'a> {
    fn new(topology: &'a LegTopology) -> Self {
        Self {
            topology,
            phase: Phase::default(),
        }
    }

    /// Set the horizontal joints of the tripod to base plus the side's delta.
    fn horizontal(self, tripod: Tripod, delta: SideDelta) -> Self {
        self.tripod_joint(tripod, Joint::Horizontal, delta)
    }

    /// Set the vertical joints of the tripod to base plus the side's delta.
    fn vertical(self, tripod: Tripod, delta: SideDelta) -> Self {
        self.tripod_joint(tripod, Joint::Vertical, delta)
    }

    fn tripod_joint(mut self, tripod: Tripod, joint: Joint, delta: SideDelta) -> Self {
        for &leg in tripod.legs().iter() {
            if let Some(base_deg) = self.topology.base_angle(leg, joint) {
                self.phase.demands.push(JointDemand {
                    leg,
                    joint,
                    angle_deg: base_deg + delta.for_side(leg.side()),
                });
            }
        }
        self
    }

    fn delay(mut self, delay: Duration) -> Phase {
        self.phase.delay = Some(delay);
        self.phase
    }

    fn build(self) -> Phase {
        self.phase
    }
}
