//! Worker thread executing gait actions one at a time, so that phases from two actions are never
//! interleaved on the servos.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    mpsc::Receiver,
    Arc,
};

use log::{debug, info};

use crate::servo_ctrl::{PwmDriver, ServoHat};

use super::{plan::JointDemand, GaitAction, LegTopology, Params, Suspend};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State owned by the worker thread.
pub(super) struct Worker<D: PwmDriver, S: Suspend> {
    pub banks: Vec<ServoHat<D>>,
    pub topology: LegTopology,
    pub params: Params,
    pub suspend: S,

    /// Incremented by every stop request
    pub epoch: Arc<AtomicU64>,

    /// Number of actions submitted but not yet finished or discarded
    pub pending: Arc<AtomicUsize>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(super) enum WorkerSignal {
    /// Execute the action, unless a stop has been requested since it was submitted in `epoch`
    Run {
        action: GaitAction,
        epoch: u64,
    },

    /// The worker should stop once everything queued before this signal is done
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D: PwmDriver, S: Suspend> Worker<D, S> {

    /// Command every mapped knee to its base angle.
    pub fn init_knees(&mut self) {
        let knees: Vec<JointDemand> = self
            .topology
            .joints()
            .filter(|(_, joint, _)| *joint == super::Joint::Knee)
            .filter_map(|(leg, joint, _)| {
                self.topology.base_angle(leg, joint).map(|angle_deg| JointDemand {
                    leg,
                    joint,
                    angle_deg,
                })
            })
            .collect();

        for d in knees.iter() {
            self.dispatch(d);
        }
    }

    /// Process signals until told to stop or the executor goes away, then hand back the banks.
    pub fn run(mut self, rx: Receiver<WorkerSignal>) -> Vec<ServoHat<D>> {
        while let Ok(signal) = rx.recv() {
            match signal {
                WorkerSignal::Stop => break,
                WorkerSignal::Run { action, epoch } => {
                    if epoch == self.epoch.load(Ordering::SeqCst) {
                        self.execute(action, epoch);
                    } else {
                        debug!("Discarding {} queued before a stop", action);
                    }

                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }

        debug!("Gait worker exiting");

        self.banks
    }

    /// Execute every phase of the action in sequence, abandoning it if a stop is requested.
    fn execute(&mut self, action: GaitAction, epoch: u64) {
        let phases = action.plan(&self.topology, &self.params);
        let num_phases = phases.len();

        info!("Executing {} ({} phases)", action, num_phases);

        for (i, phase) in phases.iter().enumerate() {
            // Only checked between phases, a started phase always completes
            if self.epoch.load(Ordering::SeqCst) != epoch {
                info!("{} stopped after {} of {} phases", action, i, num_phases);
                return;
            }

            debug!("{} phase {}/{}: {} demands", action, i + 1, num_phases, phase.demands.len());

            for d in phase.demands.iter() {
                self.dispatch(d);
            }

            if let Some(delay) = phase.delay {
                self.suspend.suspend_for(delay);
            }
        }
    }

    /// Send a logical joint demand to the servo driving the joint.
    fn dispatch(&mut self, demand: &JointDemand) {
        let leg_cfg = self.topology.leg(demand.leg);

        let joint_cfg = match leg_cfg.joint(demand.joint) {
            Some(j) => j,
            None => return,
        };

        self.banks[leg_cfg.bank].set_angle(
            joint_cfg.channel,
            joint_cfg.servo_angle(demand.angle_deg)
        );
    }
}
