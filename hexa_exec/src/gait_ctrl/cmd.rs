//! Commands passed into GaitCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A gait action, executed as a sequence of phases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GaitAction {
    /// Return every leg to its neutral stance.
    StandStill,
    /// Turn clockwise on the spot.
    TurnClockwise,
    /// Turn counter clockwise on the spot.
    TurnCounterClockwise,
    /// Walk forwards a fixed number of strides, then stand still.
    Forward,
    /// Pull the body back aggressively.
    Attack,
    /// Hold the calibrated base stance, with the vertical joints offset by `offset_deg`, to check
    /// the alignment of the legs.
    Test {
        offset_deg: f64
    },
}

/// A command accepted by the executable, from scripts for instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GaitCmd {
    /// Queue an action
    Action(GaitAction),
    /// Stop the running action after its current phase and drop all queued actions
    Stop,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GaitCmdParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command \"{0}\"")]
    Unknown(String),

    #[error("Invalid argument \"{1}\" for command \"{0}\"")]
    InvalidArg(String, String),

    #[error("Too many arguments for command \"{0}\"")]
    TooManyArgs(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitAction {
    /// Short name of the action, as used in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            GaitAction::StandStill => "stand",
            GaitAction::TurnClockwise => "cw",
            GaitAction::TurnCounterClockwise => "ccw",
            GaitAction::Forward => "forward",
            GaitAction::Attack => "attack",
            GaitAction::Test { .. } => "test",
        }
    }
}

impl fmt::Display for GaitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaitAction::Test { offset_deg } => write!(f, "test {}", offset_deg),
            a => f.write_str(a.name()),
        }
    }
}

impl FromStr for GaitCmd {
    type Err = GaitCmdParseError;

    /// Parse a command such as `forward`, `cw` or `test 5.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();

        let name = words.next().ok_or(GaitCmdParseError::Empty)?;
        let arg = words.next();

        if words.next().is_some() {
            return Err(GaitCmdParseError::TooManyArgs(name.to_string()))
        }

        let cmd = match (name, arg) {
            ("stop", None) => GaitCmd::Stop,
            ("stand", None) => GaitCmd::Action(GaitAction::StandStill),
            ("cw", None) => GaitCmd::Action(GaitAction::TurnClockwise),
            ("ccw", None) => GaitCmd::Action(GaitAction::TurnCounterClockwise),
            ("forward", None) => GaitCmd::Action(GaitAction::Forward),
            ("attack", None) => GaitCmd::Action(GaitAction::Attack),
            ("test", None) => GaitCmd::Action(GaitAction::Test { offset_deg: 0.0 }),
            ("test", Some(a)) => match a.parse::<f64>() {
                Ok(offset_deg) if offset_deg.is_finite() =>
                    GaitCmd::Action(GaitAction::Test { offset_deg }),
                _ => return Err(GaitCmdParseError::InvalidArg(
                    name.to_string(), a.to_string()
                ))
            },
            ("stop", Some(_))
            | ("stand", Some(_))
            | ("cw", Some(_))
            | ("ccw", Some(_))
            | ("forward", Some(_))
            | ("attack", Some(_)) => return Err(GaitCmdParseError::TooManyArgs(name.to_string())),
            _ => return Err(GaitCmdParseError::Unknown(name.to_string()))
        };

        Ok(cmd)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("stand".parse(), Ok(GaitCmd::Action(GaitAction::StandStill)));
        assert_eq!("  cw ".parse(), Ok(GaitCmd::Action(GaitAction::TurnClockwise)));
        assert_eq!("ccw".parse(), Ok(GaitCmd::Action(GaitAction::TurnCounterClockwise)));
        assert_eq!("forward".parse(), Ok(GaitCmd::Action(GaitAction::Forward)));
        assert_eq!("attack".parse(), Ok(GaitCmd::Action(GaitAction::Attack)));
        assert_eq!("stop".parse(), Ok(GaitCmd::Stop));
        assert_eq!(
            "test".parse(),
            Ok(GaitCmd::Action(GaitAction::Test { offset_deg: 0.0 }))
        );
        assert_eq!(
            "test -7.5".parse(),
            Ok(GaitCmd::Action(GaitAction::Test { offset_deg: -7.5 }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<GaitCmd>(), Err(GaitCmdParseError::Empty));
        assert_eq!(
            "jump".parse::<GaitCmd>(),
            Err(GaitCmdParseError::Unknown(String::from("jump")))
        );
        assert_eq!(
            "test high".parse::<GaitCmd>(),
            Err(GaitCmdParseError::InvalidArg(String::from("test"), String::from("high")))
        );
        assert_eq!(
            "forward 3".parse::<GaitCmd>(),
            Err(GaitCmdParseError::TooManyArgs(String::from("forward")))
        );
        assert_eq!(
            "test 1.0 2.0".parse::<GaitCmd>(),
            Err(GaitCmdParseError::TooManyArgs(String::from("test")))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(GaitAction::TurnCounterClockwise.to_string(), "ccw");
        assert_eq!(GaitAction::Test { offset_deg: 2.5 }.to_string(), "test 2.5");
    }
}
