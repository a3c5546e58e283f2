//! Session management
//!
//! Each run of an executable is a session. The session owns a directory under
//! `$HEXA_SW_ROOT/<sessions_dir>` holding the run's log, plus copies of the
//! parameters and script the run used so that a walk can be reproduced with
//! the exact calibration it had. The session also fixes the epoch that all
//! log and script timestamps are relative to.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Start time of the session, set once per process.
static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Session directory timestamp, in chrono's strftime syntax.
const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Sub directory of the session holding archived inputs.
const ARCHIVE_DIR: &str = "inputs";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current session.
#[derive(Clone, Debug)]
pub struct Session {
    /// Name of the executable which started the session
    pub exec_name: String,

    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (HEXA_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("A session has already been started in this process")]
    AlreadyStarted,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot archive {0:?} into the session: {1}")]
    CannotArchive(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session, creating `$HEXA_SW_ROOT/{sessions_dir}/{exec_name}_{timestamp}/`.
    ///
    /// Only one session may be started per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        let epoch = Utc::now();
        SESSION_EPOCH
            .try_init_once(|| epoch)
            .map_err(|_| SessionError::AlreadyStarted)?;

        Self::create_in(&root.join(sessions_dir), exec_name, &epoch)
    }

    /// Create the session's directories under `sessions_path`.
    fn create_in(
        sessions_path: &Path,
        exec_name: &str,
        epoch: &DateTime<Utc>
    ) -> Result<Self, SessionError> {
        let session_root = sessions_path.join(session_dir_name(exec_name, epoch));

        fs::create_dir_all(session_root.join(ARCHIVE_DIR))
            .map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            exec_name: exec_name.to_string(),
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
        })
    }

    /// Copy an input file (parameters, script) into the session, returning the path of the copy.
    pub fn archive_file<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, SessionError> {
        let path = path.as_ref();

        let file_name = path
            .file_name()
            .ok_or_else(|| SessionError::CannotArchive(
                path.to_path_buf(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file")
            ))?;

        let dest = self.session_root.join(ARCHIVE_DIR).join(file_name);

        fs::copy(path, &dest)
            .map_err(|e| SessionError::CannotArchive(path.to_path_buf(), e))?;

        Ok(dest)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - If no session has been started.
pub fn get_elapsed_seconds() -> f64 {
    let elapsed = Utc::now() - *get_epoch();

    time::duration_to_seconds(elapsed).unwrap_or(std::f64::NAN)
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - If no session has been started.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("No session has been started, cannot get the epoch"),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn session_dir_name(exec_name: &str, epoch: &DateTime<Utc>) -> String {
    format!("{}_{}", exec_name, epoch.format(DIR_TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hexa_session_{}_{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_session_dir_name() {
        let epoch = Utc.ymd(2021, 3, 14).and_hms(15, 9, 26);

        assert_eq!(session_dir_name("hexa_exec", &epoch), "hexa_exec_20210314_150926");
    }

    #[test]
    fn test_create_and_archive() {
        let dir = scratch_dir("archive");
        let epoch = Utc.ymd(2021, 3, 14).and_hms(15, 9, 26);

        let session = Session::create_in(&dir, "hexa_exec", &epoch).unwrap();

        assert!(session.session_root.join(ARCHIVE_DIR).is_dir());
        assert_eq!(session.log_file_path.file_name().unwrap(), "hexa_exec.log");

        let input = dir.join("walk.hxs");
        fs::write(&input, "1.0: forward;\n").unwrap();

        let copy = session.archive_file(&input).unwrap();
        assert_eq!(fs::read_to_string(copy).unwrap(), "1.0: forward;\n");

        assert!(matches!(
            session.archive_file(dir.join("missing.toml")),
            Err(SessionError::CannotArchive(_, _))
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
