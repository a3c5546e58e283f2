//! # Hexapod Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::Deserialize;

use hexa_lib::{
    gait_ctrl::{GaitError, LegTopology, Params as GaitParams, TopologyConfig},
    servo_ctrl::PwmTiming,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct HexaExecParams {

    /// Which build of the hexapod is being driven
    pub variant: Variant,

    /// Raspberry Pi I2C bus the servo boards are on
    pub i2c_bus: u8,

    /// Address of the right hand board of the dual bank build
    pub right_address: u8,

    /// Address of the left hand board of the dual bank build
    pub left_address: u8,

    /// Address of the board of the single bank build
    pub single_address: u8,

    /// Script to run, relative to the software root, if none is given on the command line
    pub script: Option<String>,

    /// Restart the script once it has finished
    #[serde(default)]
    pub loop_script: bool,

    #[serde(default)]
    pub timing: PwmTiming,

    /// Gait override, the variant's built in gait is used otherwise
    pub gait: Option<GaitParams>,

    /// Topology override, the variant's built in topology is used otherwise
    pub topology: Option<TopologyConfig>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// One 16 channel board, no knees on the mid legs
    SingleBank,

    /// Two boards, one per side of the body
    DualBank,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown variant \"{0}\", expected \"single\" or \"dual\"")]
pub struct ParseVariantError(String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HexaExecParams {
    pub fn gait_params(&self, variant: Variant) -> GaitParams {
        match self.gait {
            Some(ref g) => g.clone(),
            None => match variant {
                Variant::SingleBank => GaitParams::single_bank(),
                Variant::DualBank => GaitParams::dual_bank(),
            },
        }
    }

    pub fn topology(&self, variant: Variant) -> Result<LegTopology, GaitError> {
        match self.topology {
            Some(ref t) => Ok(LegTopology::try_from(t.clone())?),
            None => Ok(match variant {
                Variant::SingleBank => LegTopology::single_bank(),
                Variant::DualBank => LegTopology::dual_bank(),
            }),
        }
    }
}

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" | "single_bank" => Ok(Variant::SingleBank),
            "dual" | "dual_bank" => Ok(Variant::DualBank),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::SingleBank => f.write_str("single bank"),
            Variant::DualBank => f.write_str("dual bank"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS: &str = r#"
        variant = "dual_bank"
        i2c_bus = 1
        right_address = 0x40
        left_address = 0x41
        single_address = 0x40
        script = "scripts/calibrate.hxs"
        "#;

    #[test]
    fn test_defaults() {
        let p: HexaExecParams = util::params::parse(PARAMS).unwrap();

        assert_eq!(p.variant, Variant::DualBank);
        assert_eq!(p.left_address, 0x41);
        assert!(!p.loop_script);
        assert_eq!(p.timing, PwmTiming::default());
        assert_eq!(p.gait_params(Variant::SingleBank), GaitParams::single_bank());
        assert_eq!(p.topology(Variant::DualBank).unwrap(), LegTopology::dual_bank());
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("single".parse::<Variant>().unwrap(), Variant::SingleBank);
        assert_eq!("dual_bank".parse::<Variant>().unwrap(), Variant::DualBank);
        assert!("triple".parse::<Variant>().is_err());
    }
}
