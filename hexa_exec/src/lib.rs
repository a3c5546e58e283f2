//! # Hexapod Library
//!
//! Servo and gait control for a six legged, tripod gait walking robot.
//!
//! - [`servo_ctrl`] maps joint angles onto PWM duty cycles for one 16 channel board (a bank).
//! - [`gait_ctrl`] sequences gait actions across one or two banks through the leg topology.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod gait_ctrl;
pub mod servo_ctrl;
