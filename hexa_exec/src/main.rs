//! # Hexapod Executable
//!
//! This executable drives the hexapod's legs from a gait script:
//! - Brings up the servo boards (real PCA9685 boards on the Raspberry Pi, simulated elsewhere)
//! - Starts the gait executor for the selected build of the hexapod
//! - Feeds the script's commands to the executor as they become due

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameters for the hexapod executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use std::{path::PathBuf, thread, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, warn};
use structopt::StructOpt;

// Internal
use hexa_lib::{
    gait_ctrl::{GaitCmd, GaitError, GaitExecutor, ThreadSuspend},
    servo_ctrl::PwmDriver,
};
use params::{HexaExecParams, Variant};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period at which the script is polled for new commands.
const POLL_PERIOD: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "hexa_exec", about = "Drive the hexapod from a gait script")]
struct Opts {
    /// Gait script to run, overrides the script in the parameters
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Restart the script each time it finishes
    #[structopt(short, long = "loop")]
    loop_script: bool,

    /// Hexapod build to drive, "single" or "dual", overrides the parameters
    #[structopt(short, long)]
    variant: Option<Variant>,

    /// Log every servo write
    #[structopt(long)]
    trace_servos: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "hexa_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let servo_level = if opts.trace_servos {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    logger_init(LevelFilter::Debug, servo_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Hexapod Executable\n");
    info!("Running on: {:#?}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: HexaExecParams = util::params::load("hexa_exec.toml")
        .wrap_err("Could not load hexa_exec params")?;

    let variant = opts.variant.unwrap_or(params.variant);
    let loop_script = opts.loop_script || params.loop_script;

    info!("Parameters loaded, driving the {} hexapod", variant);

    // ---- LOAD SCRIPT ----

    let script_path = match (opts.script.clone(), params.script.as_ref()) {
        (Some(p), _) => p,
        (None, Some(p)) => {
            let mut path = host::get_sw_root().wrap_err("Could not get the software root")?;
            path.push(p);
            path
        }
        (None, None) => {
            return Err(color_eyre::eyre::eyre!(
                "No script given on the command line or in the parameters"
            ))
        }
    };

    info!("Loading script from {:?}", script_path);

    let script: ScriptInterpreter<GaitCmd> = ScriptInterpreter::new(&script_path)
        .wrap_err("Failed to load script")?;

    info!(
        "Script loaded, {} commands over {:.1} s",
        script.get_num_cmds(),
        script.get_duration()
    );

    // Keep a copy of the inputs alongside the session's log
    let param_path = util::params::param_file_path("hexa_exec.toml")
        .wrap_err("Could not find the hexa_exec params")?;
    for input in [Some(param_path.as_path()), script.get_script_path()].iter().flatten() {
        match session.archive_file(input) {
            Ok(p) => debug!("Archived {:?} to {:?}", input, p),
            Err(e) => warn!("{}", e),
        }
    }

    // ---- GAIT EXECUTOR INITIALISATION ----

    let gait_params = params.gait_params(variant);
    let topology = params.topology(variant)
        .wrap_err("Invalid topology in the parameters")?;

    #[cfg(all(target_arch = "arm", target_os = "linux"))]
    let banks = {
        use hexa_lib::servo_ctrl::pca9685::open_hat;

        match variant {
            Variant::DualBank => vec![
                open_hat("right", params.i2c_bus, params.right_address, params.timing)
                    .wrap_err("Could not open the right servo board")?,
                open_hat("left", params.i2c_bus, params.left_address, params.timing)
                    .wrap_err("Could not open the left servo board")?,
            ],
            Variant::SingleBank => vec![
                open_hat("single", params.i2c_bus, params.single_address, params.timing)
                    .wrap_err("Could not open the servo board")?,
            ],
        }
    };

    #[cfg(not(all(target_arch = "arm", target_os = "linux")))]
    let banks = {
        use hexa_lib::servo_ctrl::{sim::SimDriver, ServoHat};

        warn!("Not running on the Raspberry Pi, servo boards are simulated");

        let names: &[&str] = match variant {
            Variant::DualBank => &["right", "left"],
            Variant::SingleBank => &["single"],
        };

        names
            .iter()
            .map(|n| ServoHat::new(n, SimDriver::new(n), params.timing))
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Could not create the simulated servo boards")?
    };

    let exec = GaitExecutor::new(banks, topology, gait_params, ThreadSuspend)
        .wrap_err("Failed to start the gait executor")?;

    info!("Initialisation complete, running script");

    // ---- MAIN LOOP ----

    run_script(&exec, script, loop_script);

    // ---- SHUTDOWN ----

    info!("Script complete, shutting down");

    exec.shutdown().wrap_err("Gait executor did not shut down cleanly")?;

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Feed the script's commands to the executor until the script ends.
///
/// Looping scripts are rewound once the executor has finished every action from the previous run.
fn run_script<D>(
    exec: &GaitExecutor<D>,
    mut script: ScriptInterpreter<GaitCmd>,
    loop_script: bool
)
where
    D: PwmDriver + Send + 'static
{
    loop {
        match script.get_pending_cmds() {
            PendingCmds::None => (),
            PendingCmds::Some(cmds) => {
                for cmd in cmds {
                    debug!("Script command: {:?}", cmd);

                    match exec.handle_cmd(cmd) {
                        Ok(()) => (),
                        Err(GaitError::Busy) => warn!("Dropping {:?}, executor busy", cmd),
                        Err(e) => {
                            warn!("Could not execute {:?}: {}", cmd, e);
                            return
                        }
                    }
                }
            }
            PendingCmds::EndOfScript => {
                if !loop_script {
                    return
                }

                if !exec.is_busy() {
                    info!("Restarting script");
                    script.rewind();
                }
            }
        }

        thread::sleep(POLL_PERIOD);
    }
}
