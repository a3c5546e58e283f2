//! # Gait Control Module
//!
//! Gait control turns high level locomotion actions (stand, turn, walk forward, attack, calibrate)
//! into timed batches of joint angles, and sends them to the servo banks through the leg topology.
//!
//! Actions are executed by a single worker thread which owns the banks. Submitted actions are
//! queued in a bounded FIFO, so at most one action is ever in flight and the phases of two actions
//! can never be interleaved on the servos.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
pub mod plan;
pub mod topology;
mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        mpsc::{sync_channel, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};

use crate::servo_ctrl::{PwmDriver, ServoHat};
use worker::{Worker, WorkerSignal};

pub use cmd::*;
pub use params::*;
pub use topology::{Joint, JointAddr, Leg, LegTopology, Side, TopologyConfig, TopologyError, Tripod};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of legs on the hexapod.
pub const NUM_LEGS: usize = 6;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Delay primitive used between the phases of a gait.
pub trait Suspend {
    /// Wait for the given duration before returning.
    fn suspend_for(&mut self, duration: Duration);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Suspends the calling thread with [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSuspend;

/// Gait executor for one or more servo banks.
///
/// The executor owns its banks for its whole lifetime. Call [`GaitExecutor::shutdown`] to finish
/// all queued actions and close every bank exactly once.
pub struct GaitExecutor<D: PwmDriver + Send + 'static> {
    worker_jh: Option<JoinHandle<Vec<ServoHat<D>>>>,
    worker_sender: Option<SyncSender<WorkerSignal>>,

    epoch: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,

    /// Most actions that may be running or queued at once
    max_pending: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GaitError {
    #[error("An action is already in progress and the action queue is full")]
    Busy,

    #[error("The topology uses {expected} banks but {found} were provided")]
    BankCountMismatch {
        expected: usize,
        found: usize,
    },

    #[error("Could not start the gait worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("The gait worker thread panicked")]
    WorkerPanicked,

    #[error("The gait worker thread is no longer running")]
    WorkerStopped,

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Suspend for ThreadSuspend {
    fn suspend_for(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<D: PwmDriver + Send + 'static> GaitExecutor<D> {

    /// Create a new executor driving `banks` through `topology`.
    ///
    /// Every knee in the topology is set to its base angle before this returns. On error the banks
    /// are closed.
    pub fn new<S>(
        mut banks: Vec<ServoHat<D>>,
        topology: LegTopology,
        params: Params,
        suspend: S
    ) -> Result<Self, GaitError>
    where
        S: Suspend + Send + 'static
    {
        if banks.len() != topology.num_banks() {
            let found = banks.len();
            banks.iter_mut().for_each(|b| b.close());

            return Err(GaitError::BankCountMismatch {
                expected: topology.num_banks(),
                found,
            })
        }

        let epoch = Arc::new(AtomicU64::new(0));
        let pending = Arc::new(AtomicUsize::new(0));

        // Room for every action `submit` can admit, plus the final stop signal
        let max_pending = params.queue_len + 1;
        let (worker_sender, rx) = sync_channel(params.queue_len + 2);

        let mut worker = Worker {
            banks,
            topology,
            params,
            suspend,
            epoch: epoch.clone(),
            pending: pending.clone(),
        };

        worker.init_knees();

        info!(
            "Gait executor starting with {} bank(s), queue length {}",
            worker.banks.len(),
            worker.params.queue_len
        );

        // On failure the worker is dropped, which releases its banks
        let worker_jh = thread::Builder::new()
            .name("gait_ctrl::worker".into())
            .spawn(move || worker.run(rx))
            .map_err(GaitError::WorkerSpawn)?;

        Ok(Self {
            worker_jh: Some(worker_jh),
            worker_sender: Some(worker_sender),
            epoch,
            pending,
            max_pending,
        })
    }

    /// Create an executor for the two bank hexapod, using the built in topology and gait.
    pub fn new_dual<S>(right: ServoHat<D>, left: ServoHat<D>, suspend: S) -> Result<Self, GaitError>
    where
        S: Suspend + Send + 'static
    {
        // Indexed by topology::RIGHT_BANK and topology::LEFT_BANK
        let banks = vec![right, left];

        Self::new(banks, LegTopology::dual_bank(), Params::dual_bank(), suspend)
    }

    /// Create an executor for the single bank hexapod, using the built in topology and gait.
    pub fn new_single<S>(hat: ServoHat<D>, suspend: S) -> Result<Self, GaitError>
    where
        S: Suspend + Send + 'static
    {
        Self::new(vec![hat], LegTopology::single_bank(), Params::single_bank(), suspend)
    }

    pub fn stand_still(&self) -> Result<(), GaitError> {
        self.submit(GaitAction::StandStill)
    }

    pub fn turn_clockwise(&self) -> Result<(), GaitError> {
        self.submit(GaitAction::TurnClockwise)
    }

    pub fn turn_counter_clockwise(&self) -> Result<(), GaitError> {
        self.submit(GaitAction::TurnCounterClockwise)
    }

    pub fn forward(&self) -> Result<(), GaitError> {
        self.submit(GaitAction::Forward)
    }

    pub fn attack(&self) -> Result<(), GaitError> {
        self.submit(GaitAction::Attack)
    }

    /// Move to the calibration stance, with the vertical joints offset by `offset_deg`.
    pub fn test(&self, offset_deg: f64) -> Result<(), GaitError> {
        self.submit(GaitAction::Test { offset_deg })
    }

    /// Submit an action to be executed after all previously submitted ones.
    ///
    /// Returns immediately. The action is rejected with [`GaitError::Busy`] if one action is
    /// running and `queue_len` more are already waiting.
    pub fn submit(&self, action: GaitAction) -> Result<(), GaitError> {
        let sender = self.worker_sender.as_ref().ok_or(GaitError::WorkerStopped)?;

        // Reserve a slot before sending so the worker can never decrement first
        let max_pending = self.max_pending;
        if self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n < max_pending { Some(n + 1) } else { None }
            })
            .is_err()
        {
            warn!("Rejected {}, gait executor busy", action);
            return Err(GaitError::Busy)
        }

        let signal = WorkerSignal::Run {
            action,
            epoch: self.epoch.load(Ordering::SeqCst),
        };

        match sender.try_send(signal) {
            Ok(()) => {
                debug!("Submitted {}", action);
                Ok(())
            }
            Err(e) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);

                match e {
                    TrySendError::Full(_) => {
                        warn!("Rejected {}, gait executor busy", action);
                        Err(GaitError::Busy)
                    }
                    TrySendError::Disconnected(_) => Err(GaitError::WorkerStopped),
                }
            }
        }
    }

    /// Handle a command, as parsed from a script.
    pub fn handle_cmd(&self, cmd: GaitCmd) -> Result<(), GaitError> {
        match cmd {
            GaitCmd::Action(a) => self.submit(a),
            GaitCmd::Stop => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Stop the running action once its current phase is complete, and discard every action
    /// submitted before this call.
    pub fn stop(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Gait stop requested (epoch {})", epoch);
    }

    /// Returns true if an action is running or waiting to run.
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Finish every queued action, stop the worker and close all banks.
    pub fn shutdown(mut self) -> Result<(), GaitError> {
        self.shutdown_worker()
    }

    fn shutdown_worker(&mut self) -> Result<(), GaitError> {
        let worker_jh = match self.worker_jh.take() {
            Some(jh) => jh,
            None => return Ok(()),
        };

        // Blocking send, the stop signal must queue behind everything already submitted. If the
        // worker has already gone the join below reports why.
        if let Some(sender) = self.worker_sender.take() {
            sender.send(WorkerSignal::Stop).ok();
        }

        let mut banks = worker_jh.join().map_err(|_| GaitError::WorkerPanicked)?;

        for bank in banks.iter_mut() {
            bank.close();
        }

        info!("Gait executor shut down");

        Ok(())
    }
}

impl<D: PwmDriver + Send + 'static> Drop for GaitExecutor<D> {
    fn drop(&mut self) {
        if self.worker_jh.is_some() {
            warn!("Gait executor dropped without shutdown, shutting down now");

            if let Err(e) = self.shutdown_worker() {
                warn!("Could not shut down the gait executor: {}", e);
            }
        }
    }
}
