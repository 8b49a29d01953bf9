//! Core types for finite-control-set model predictive control of power converters.
//!
//! This crate holds the pieces every MPC solver needs but that carry no search logic:
//!
//! - [`levels`] - Converter level count and per-phase level sets
//! - [`switch`] - Three-phase switch positions
//! - [`space`] - Enumeration of all three-phase switch combinations
//! - [`constraint`] - The three-level no-direct-jump switching rule
//! - [`model`] - Discrete-time state-space plant models
//! - [`frames`] - abc / alpha-beta / dq frame helpers
//! - [`error`] - Error taxonomy shared by the workspace

pub mod constraint;
pub mod error;
pub mod frames;
pub mod levels;
pub mod model;
pub mod space;
pub mod switch;

pub use constraint::ConstraintChecker;
pub use error::{Error, Result};
pub use levels::ConverterLevels;
pub use model::DiscreteStateSpace;
pub use space::SwitchSpace;
pub use switch::SwitchPosition;
