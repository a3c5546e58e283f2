//! Leg topology table
//!
//! Maps each logical (leg, joint) pair onto a (bank, channel) pair and holds the calibration data
//! of every joint: its base angle and whether its servo is mounted reversed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

// Internal
use crate::servo_ctrl::{MAX_ANGLE_DEG, MAX_CHANNEL, MIN_ANGLE_DEG};
use super::NUM_LEGS;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Index of the right hand bank in the dual bank layout.
pub const RIGHT_BANK: usize = 0;

/// Index of the left hand bank in the dual bank layout.
pub const LEFT_BANK: usize = 1;

/// Base angle of every knee.
///
/// Units: degrees
pub const KNEE_BASE_DEG: f64 = 90.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The six legs of the hexapod.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    RightFront,
    RightMid,
    RightBack,
    LeftFront,
    LeftMid,
    LeftBack,
}

/// The side of the body a leg is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// The joints of a leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Hip joint swinging the leg forwards and backwards
    Horizontal,
    /// Hip joint raising and lowering the leg
    Vertical,
    Knee,
}

/// The two alternating sets of three legs used by the tripod gait.
///
/// Tripods are diagonal rather than one per side, so that three legs spread over both sides of
/// the body always support it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tripod {
    /// Right front, left mid, right back
    A,
    /// Left front, right mid, left back
    B,
}

/// Errors raised when building a [`LegTopology`].
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("No entry for the {0} leg")]
    MissingLeg(Leg),

    #[error("The {0} leg has more than one entry")]
    DuplicateLeg(Leg),

    #[error("The {0} leg is on bank {1} but there are only {2} banks")]
    UnknownBank(Leg, usize, usize),

    #[error("The {0} leg's {1:?} joint uses channel {2} which doesn't exist")]
    InvalidChannel(Leg, Joint, u8),

    #[error("The {0} leg's {1:?} joint has a base angle of {2} deg, outside of [0, 180]")]
    InvalidBaseAngle(Leg, Joint, f64),

    #[error("Bank {0} channel {1} is used by both {2} {3:?} and {4} {5:?}")]
    SharedChannel(usize, u8, Leg, Joint, Leg, Joint),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The bank and channel driving a joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JointAddr {
    pub bank: usize,
    pub channel: u8,
}

/// Calibration of a single joint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    /// Channel on the leg's bank
    pub channel: u8,

    /// The neutral angle of the joint, all gait deltas are applied relative to this.
    ///
    /// Units: degrees
    pub base_deg: f64,

    /// If true the servo is mounted the other way round, and is sent `180 - angle`.
    #[serde(default)]
    pub reversed: bool,
}

/// Configuration of a single leg.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegConfig {
    pub leg: Leg,

    /// Index of the bank all of this leg's joints are on
    pub bank: usize,

    pub horizontal: JointConfig,

    pub vertical: JointConfig,

    /// Some layouts don't have a knee on every leg
    #[serde(default)]
    pub knee: Option<JointConfig>,
}

/// Serialised form of a topology, as found in parameter files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub num_banks: usize,
    pub legs: Vec<LegConfig>,
}

/// Validated, read-only leg topology.
#[derive(Clone, Debug, PartialEq)]
pub struct LegTopology {
    num_banks: usize,

    /// Leg configs in `Leg::ALL` order, always `NUM_LEGS` long
    legs: Vec<LegConfig>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Leg {
    /// All legs in index order.
    pub const ALL: [Leg; NUM_LEGS] = [
        Leg::RightFront,
        Leg::RightMid,
        Leg::RightBack,
        Leg::LeftFront,
        Leg::LeftMid,
        Leg::LeftBack,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn side(self) -> Side {
        match self {
            Leg::RightFront | Leg::RightMid | Leg::RightBack => Side::Right,
            Leg::LeftFront | Leg::LeftMid | Leg::LeftBack => Side::Left,
        }
    }

    /// The tripod this leg belongs to.
    pub fn tripod(self) -> Tripod {
        if Tripod::A.legs().contains(&self) {
            Tripod::A
        } else {
            Tripod::B
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Leg::RightFront => "right front",
            Leg::RightMid => "right mid",
            Leg::RightBack => "right back",
            Leg::LeftFront => "left front",
            Leg::LeftMid => "left mid",
            Leg::LeftBack => "left back",
        };
        f.write_str(s)
    }
}

impl Tripod {
    pub fn legs(self) -> [Leg; 3] {
        match self {
            Tripod::A => [Leg::RightFront, Leg::LeftMid, Leg::RightBack],
            Tripod::B => [Leg::LeftFront, Leg::RightMid, Leg::LeftBack],
        }
    }

    pub fn other(self) -> Tripod {
        match self {
            Tripod::A => Tripod::B,
            Tripod::B => Tripod::A,
        }
    }
}

impl JointConfig {
    fn new(channel: u8, base_deg: f64) -> Self {
        Self {
            channel,
            base_deg,
            reversed: false,
        }
    }

    fn new_reversed(channel: u8, base_deg: f64) -> Self {
        Self {
            channel,
            base_deg,
            reversed: true,
        }
    }

    /// The angle to send to the servo for a logical joint angle.
    pub fn servo_angle(&self, angle_deg: f64) -> f64 {
        if self.reversed {
            MAX_ANGLE_DEG - angle_deg
        } else {
            angle_deg
        }
    }
}

impl LegConfig {
    pub fn joint(&self, joint: Joint) -> Option<&JointConfig> {
        match joint {
            Joint::Horizontal => Some(&self.horizontal),
            Joint::Vertical => Some(&self.vertical),
            Joint::Knee => self.knee.as_ref(),
        }
    }

    fn joints(&self) -> Vec<(Joint, &JointConfig)> {
        [Joint::Horizontal, Joint::Vertical, Joint::Knee]
            .iter()
            .filter_map(|&j| self.joint(j).map(|c| (j, c)))
            .collect()
    }
}

impl LegTopology {

    /// The two bank layout: right legs on bank 0 (`RIGHT_BANK`), left legs on bank 1
    /// (`LEFT_BANK`), each leg using channels `4n`, `4n+1`, `4n+2` of its bank.
    ///
    /// Both mid legs use replacement servos on their vertical joint which turn the other way.
    pub fn dual_bank() -> Self {
        let leg = |leg, bank, first_channel: u8, h_base, v_base, v_reversed| LegConfig {
            leg,
            bank,
            horizontal: JointConfig::new(first_channel, h_base),
            vertical: if v_reversed {
                JointConfig::new_reversed(first_channel + 1, v_base)
            } else {
                JointConfig::new(first_channel + 1, v_base)
            },
            knee: Some(JointConfig::new(first_channel + 2, KNEE_BASE_DEG)),
        };

        Self {
            num_banks: 2,
            legs: vec![
                leg(Leg::RightFront, RIGHT_BANK, 0, 75.0, 75.0, false),
                leg(Leg::RightMid, RIGHT_BANK, 4, 105.0, 65.0, true),
                leg(Leg::RightBack, RIGHT_BANK, 8, 120.0, 75.0, false),
                leg(Leg::LeftFront, LEFT_BANK, 0, 95.0, 120.0, false),
                leg(Leg::LeftMid, LEFT_BANK, 4, 100.0, 110.0, true),
                leg(Leg::LeftBack, LEFT_BANK, 8, 70.0, 130.0, false),
            ],
        }
    }

    /// The single 16 channel bank layout. The mid legs have no knee.
    pub fn single_bank() -> Self {
        let leg = |leg, channel: u8, h_base, v_base, has_knee: bool| LegConfig {
            leg,
            bank: 0,
            horizontal: JointConfig::new(channel, h_base),
            vertical: JointConfig::new(channel + 1, v_base),
            knee: if has_knee {
                Some(JointConfig::new(channel + 2, KNEE_BASE_DEG))
            } else {
                None
            },
        };

        Self {
            num_banks: 1,
            legs: vec![
                leg(Leg::RightFront, 0, 70.0, 70.0, true),
                leg(Leg::RightMid, 3, 90.0, 70.0, false),
                leg(Leg::RightBack, 5, 110.0, 70.0, true),
                leg(Leg::LeftFront, 8, 110.0, 110.0, true),
                leg(Leg::LeftMid, 11, 90.0, 110.0, false),
                leg(Leg::LeftBack, 13, 70.0, 110.0, true),
            ],
        }
    }

    /// Number of banks the topology spans.
    pub fn num_banks(&self) -> usize {
        self.num_banks
    }

    pub fn leg(&self, leg: Leg) -> &LegConfig {
        &self.legs[leg.index()]
    }

    /// Get the joint's calibration, or `None` if the leg doesn't have this joint.
    pub fn joint(&self, leg: Leg, joint: Joint) -> Option<&JointConfig> {
        self.leg(leg).joint(joint)
    }

    /// Get the bank and channel driving a joint.
    pub fn channel_for(&self, leg: Leg, joint: Joint) -> Option<JointAddr> {
        let bank = self.leg(leg).bank;
        self.joint(leg, joint).map(|j| JointAddr {
            bank,
            channel: j.channel,
        })
    }

    /// Get the base angle of a joint.
    pub fn base_angle(&self, leg: Leg, joint: Joint) -> Option<f64> {
        self.joint(leg, joint).map(|j| j.base_deg)
    }

    /// Returns true if the joint's servo is mounted reversed. Missing joints are not reversed.
    pub fn is_reversed(&self, leg: Leg, joint: Joint) -> bool {
        self.joint(leg, joint).map(|j| j.reversed).unwrap_or(false)
    }

    /// Iterate over every mapped joint in leg order.
    pub fn joints(&self) -> impl Iterator<Item = (Leg, Joint, JointAddr)> + '_ {
        self.legs.iter().flat_map(move |l| {
            l.joints().into_iter().map(move |(j, c)| {
                (
                    l.leg,
                    j,
                    JointAddr {
                        bank: l.bank,
                        channel: c.channel,
                    },
                )
            })
        })
    }

    /// Convert back into the serialisable form.
    pub fn to_config(&self) -> TopologyConfig {
        TopologyConfig {
            num_banks: self.num_banks,
            legs: self.legs.clone(),
        }
    }
}

impl TryFrom<TopologyConfig> for LegTopology {
    type Error = TopologyError;

    fn try_from(config: TopologyConfig) -> Result<Self, Self::Error> {
        let mut slots: [Option<LegConfig>; NUM_LEGS] = [None; NUM_LEGS];
        let mut used: HashMap<JointAddr, (Leg, Joint)> = HashMap::new();

        for leg_cfg in config.legs.iter() {
            let leg = leg_cfg.leg;

            if slots[leg.index()].is_some() {
                return Err(TopologyError::DuplicateLeg(leg));
            }

            if leg_cfg.bank >= config.num_banks {
                return Err(TopologyError::UnknownBank(leg, leg_cfg.bank, config.num_banks));
            }

            for (joint, joint_cfg) in leg_cfg.joints().into_iter() {
                if joint_cfg.channel > MAX_CHANNEL {
                    return Err(TopologyError::InvalidChannel(leg, joint, joint_cfg.channel));
                }

                if !(MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&joint_cfg.base_deg) {
                    return Err(TopologyError::InvalidBaseAngle(leg, joint, joint_cfg.base_deg));
                }

                let addr = JointAddr {
                    bank: leg_cfg.bank,
                    channel: joint_cfg.channel,
                };
                if let Some((other_leg, other_joint)) = used.insert(addr, (leg, joint)) {
                    return Err(TopologyError::SharedChannel(
                        addr.bank,
                        addr.channel,
                        other_leg,
                        other_joint,
                        leg,
                        joint,
                    ));
                }
            }

            slots[leg.index()] = Some(*leg_cfg);
        }

        let mut legs = Vec::with_capacity(NUM_LEGS);
        for (leg, slot) in Leg::ALL.iter().zip(slots.iter()) {
            match slot {
                Some(l) => legs.push(*l),
                None => return Err(TopologyError::MissingLeg(*leg)),
            }
        }

        Ok(Self {
            num_banks: config.num_banks,
            legs,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tripods() {
        let a: HashSet<Leg> = Tripod::A.legs().iter().copied().collect();
        let b: HashSet<Leg> = Tripod::B.legs().iter().copied().collect();

        assert!(a.is_disjoint(&b));
        assert_eq!(a.union(&b).count(), NUM_LEGS);

        // Each tripod spans both sides of the body
        for t in [Tripod::A, Tripod::B].iter() {
            let sides: HashSet<Side> = t.legs().iter().map(|l| l.side()).collect();
            assert_eq!(sides.len(), 2);
            assert_eq!(t.other().other(), *t);
        }

        for leg in Leg::ALL.iter() {
            assert!(leg.tripod().legs().contains(leg));
        }
    }

    #[test]
    fn test_dual_bank_lookup() {
        let topo = LegTopology::dual_bank();

        assert_eq!(topo.num_banks(), 2);
        assert_eq!(
            topo.channel_for(Leg::RightMid, Joint::Vertical),
            Some(JointAddr { bank: RIGHT_BANK, channel: 5 })
        );
        assert_eq!(
            topo.channel_for(Leg::LeftBack, Joint::Knee),
            Some(JointAddr { bank: LEFT_BANK, channel: 10 })
        );
        assert_eq!(topo.base_angle(Leg::RightFront, Joint::Horizontal), Some(75.0));
        assert_eq!(topo.base_angle(Leg::LeftBack, Joint::Vertical), Some(130.0));
        assert_eq!(topo.base_angle(Leg::LeftMid, Joint::Knee), Some(KNEE_BASE_DEG));

        assert!(topo.is_reversed(Leg::RightMid, Joint::Vertical));
        assert!(topo.is_reversed(Leg::LeftMid, Joint::Vertical));
        assert!(!topo.is_reversed(Leg::RightMid, Joint::Horizontal));
        assert!(!topo.is_reversed(Leg::RightFront, Joint::Vertical));

        assert_eq!(topo.joints().count(), 18);
    }

    #[test]
    fn test_single_bank_lookup() {
        let topo = LegTopology::single_bank();

        assert_eq!(topo.num_banks(), 1);
        assert_eq!(topo.channel_for(Leg::RightMid, Joint::Knee), None);
        assert_eq!(topo.channel_for(Leg::LeftMid, Joint::Knee), None);
        assert_eq!(topo.base_angle(Leg::LeftMid, Joint::Knee), None);
        assert!(!topo.is_reversed(Leg::LeftMid, Joint::Knee));
        assert_eq!(
            topo.channel_for(Leg::LeftBack, Joint::Knee),
            Some(JointAddr { bank: 0, channel: 15 })
        );

        // All 16 channels used exactly once
        let channels: HashSet<u8> = topo.joints().map(|(_, _, a)| a.channel).collect();
        assert_eq!(topo.joints().count(), 16);
        assert_eq!(channels.len(), 16);
    }

    #[test]
    fn test_builtin_layouts_are_valid() {
        for topo in [LegTopology::dual_bank(), LegTopology::single_bank()].iter() {
            let rebuilt = LegTopology::try_from(topo.to_config()).unwrap();
            assert_eq!(&rebuilt, topo);
        }
    }

    #[test]
    fn test_invalid_topologies() {
        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs.pop();
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::MissingLeg(Leg::LeftBack))
        ));

        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs[5] = cfg.legs[0];
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::DuplicateLeg(Leg::RightFront))
        ));

        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs[3].bank = 2;
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::UnknownBank(Leg::LeftFront, 2, 2))
        ));

        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs[1].horizontal.channel = 16;
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::InvalidChannel(Leg::RightMid, Joint::Horizontal, 16))
        ));

        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs[2].vertical.base_deg = 190.0;
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::InvalidBaseAngle(Leg::RightBack, Joint::Vertical, _))
        ));

        // Putting the left front leg on the right bank collides with the right front leg
        let mut cfg = LegTopology::dual_bank().to_config();
        cfg.legs[3].bank = RIGHT_BANK;
        assert!(matches!(
            LegTopology::try_from(cfg),
            Err(TopologyError::SharedChannel(RIGHT_BANK, 0, Leg::RightFront, Joint::Horizontal, Leg::LeftFront, Joint::Horizontal))
        ));
    }

    #[test]
    fn test_topology_from_toml() {
        let cfg: TopologyConfig = util::params::parse(
            r#"
            num_banks = 1

            [[legs]]
            leg = "right_front"
            bank = 0
            horizontal = { channel = 0, base_deg = 70.0 }
            vertical = { channel = 1, base_deg = 70.0 }
            knee = { channel = 2, base_deg = 90.0 }

            [[legs]]
            leg = "right_mid"
            bank = 0
            horizontal = { channel = 3, base_deg = 90.0 }
            vertical = { channel = 4, base_deg = 70.0, reversed = true }

            [[legs]]
            leg = "right_back"
            bank = 0
            horizontal = { channel = 5, base_deg = 110.0 }
            vertical = { channel = 6, base_deg = 70.0 }

            [[legs]]
            leg = "left_front"
            bank = 0
            horizontal = { channel = 8, base_deg = 110.0 }
            vertical = { channel = 9, base_deg = 110.0 }

            [[legs]]
            leg = "left_mid"
            bank = 0
            horizontal = { channel = 11, base_deg = 90.0 }
            vertical = { channel = 12, base_deg = 110.0 }

            [[legs]]
            leg = "left_back"
            bank = 0
            horizontal = { channel = 13, base_deg = 70.0 }
            vertical = { channel = 14, base_deg = 110.0 }
            "#,
        )
        .unwrap();

        let topo = LegTopology::try_from(cfg).unwrap();

        assert!(topo.is_reversed(Leg::RightMid, Joint::Vertical));
        assert_eq!(topo.channel_for(Leg::RightBack, Joint::Knee), None);
        assert_eq!(topo.base_angle(Leg::RightFront, Joint::Knee), Some(90.0));
        assert_eq!(topo.joints().count(), 13);
    }
}
