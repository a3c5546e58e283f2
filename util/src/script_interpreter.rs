//! # Script interpreter module
//!
//! This module provides an interpreter for timed command scripts. A script is
//! a list of `<time_s>: <command>;` entries, for example:
//!
//! ```text
//! 0.5: stand;
//! 1.0: forward;
//! 3.0: test 5.0;
//! ```
//!
//! The payload of each entry is parsed with the command type's `FromStr`
//! implementation, so the interpreter is independent of the command set.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Clone, Debug)]
pub struct Command<C> {
    /// The time the command is supposed to execute at, relative to the start
    /// of the script
    exec_time_s: f64,

    /// The command to run
    cmd: C
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_cmds` to acquire a list of commands that need executing.
pub struct ScriptInterpreter<C> {
    script_path: Option<PathBuf>,
    script: Vec<Command<C>>,
    cmds: VecDeque<Command<C>>,
    start_time_s: Option<f64>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, String)
}

#[derive(Debug, PartialEq)]
pub enum PendingCmds<C> {
    None,
    Some(Vec<C>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C> ScriptInterpreter<C>
where
    C: FromStr + Clone,
    C::Err: Display
{

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_script_str(&script)?;
        interp.script_path = Some(path);

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {

        let mut cmds: Vec<Command<C>> = vec![];

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Parse the exec time
            let exec_time_s: f64 = match cap[1].parse() {
                Ok(t) => t,
                Err(e) => return Err(
                    ScriptError::InvalidTimestamp(format!("{}", e)))
            };

            // Parse the command from the payload
            let cmd = match cap[3].trim().parse::<C>() {
                Ok(c) => c,
                Err(e) => return Err(ScriptError::InvalidCmd(
                    exec_time_s, e.to_string()
                ))
            };

            cmds.push(Command {
                exec_time_s,
                cmd
            });
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        // Scripts don't have to be written in order
        cmds.sort_by(|a, b| a.exec_time_s
            .partial_cmp(&b.exec_time_s)
            .unwrap_or(std::cmp::Ordering::Equal));

        Ok(ScriptInterpreter {
            script_path: None,
            cmds: cmds.iter().cloned().collect(),
            script: cmds,
            start_time_s: None
        })
    }

    /// Return a vector of pending commands based on the session clock.
    ///
    /// The script's clock starts on the first call to this function.
    pub fn get_pending_cmds(&mut self) -> PendingCmds<C> {
        let now_s = get_elapsed_seconds();
        let start_s = *self.start_time_s.get_or_insert(now_s);

        self.get_pending_cmds_at(now_s - start_s)
    }

    /// Return a vector of pending commands whose execution time is lower than
    /// `script_time_s`, the number of seconds since the start of the script.
    pub fn get_pending_cmds_at(&mut self, script_time_s: f64) -> PendingCmds<C> {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript
        }

        let mut cmd_vec: Vec<C> = vec![];

        // Pop commands from the front of the queue until the exec times are
        // larger than the current time.
        while let Some(front) = self.cmds.front() {
            if front.exec_time_s >= script_time_s {
                break;
            }
            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        if cmd_vec.is_empty() {
            PendingCmds::None
        }
        else {
            PendingCmds::Some(cmd_vec)
        }
    }

    /// Restart the script from the beginning.
    ///
    /// The script clock restarts on the next call to `get_pending_cmds`.
    pub fn rewind(&mut self) {
        self.cmds = self.script.iter().cloned().collect();
        self.start_time_s = None;
    }

    /// Get the path the script was loaded from, if any.
    pub fn get_script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Get the number of commands in the script
    pub fn get_num_cmds(&self) -> usize {
        self.script.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.script.last() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Cmd {
        Ping,
        Wait(f64),
    }

    impl FromStr for Cmd {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let mut words = s.split_whitespace();
            match (words.next(), words.next()) {
                (Some("ping"), None) => Ok(Cmd::Ping),
                (Some("wait"), Some(t)) => t
                    .parse()
                    .map(Cmd::Wait)
                    .map_err(|_| format!("bad wait time {}", t)),
                _ => Err(format!("unknown command \"{}\"", s)),
            }
        }
    }

    #[test]
    fn test_pending_cmds() {
        let mut interp: ScriptInterpreter<Cmd> = ScriptInterpreter::from_script_str(
            "2.0: wait 1.5;\n\
             0.5: ping;\n\
             0.5: ping;\n",
        )
        .unwrap();

        assert_eq!(interp.get_num_cmds(), 3);
        assert_eq!(interp.get_duration(), 2.0);

        assert_eq!(interp.get_pending_cmds_at(0.1), PendingCmds::None);
        assert_eq!(
            interp.get_pending_cmds_at(1.0),
            PendingCmds::Some(vec![Cmd::Ping, Cmd::Ping])
        );
        assert_eq!(interp.get_pending_cmds_at(1.5), PendingCmds::None);
        assert_eq!(
            interp.get_pending_cmds_at(2.5),
            PendingCmds::Some(vec![Cmd::Wait(1.5)])
        );
        assert_eq!(interp.get_pending_cmds_at(3.0), PendingCmds::EndOfScript);

        interp.rewind();
        assert_eq!(
            interp.get_pending_cmds_at(10.0),
            PendingCmds::Some(vec![Cmd::Ping, Cmd::Ping, Cmd::Wait(1.5)])
        );
    }

    #[test]
    fn test_script_path() {
        let path = std::env::temp_dir()
            .join(format!("hexa_script_path_{}.hxs", std::process::id()));
        std::fs::write(&path, "0.0: ping;\n").unwrap();

        let from_file: ScriptInterpreter<Cmd> = ScriptInterpreter::new(&path).unwrap();
        assert_eq!(from_file.get_script_path(), Some(path.as_path()));

        let from_str: ScriptInterpreter<Cmd> =
            ScriptInterpreter::from_script_str("0.0: ping;\n").unwrap();
        assert_eq!(from_str.get_script_path(), None);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script_str("nothing to see here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script_str("1.0: jump;"),
            Err(ScriptError::InvalidCmd(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::new("/this/script/does/not/exist.hxs"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
