//! `hookpid-modifiers` – ready-made [`Modifier`](hookpid_core::Modifier)s.
//!
//! | Modifier | Hooks | Effect |
//! |---|---|---|
//! | [`Windup`] | ModifyTerms | clamps `i` and the integral accumulator into `[lo, hi]` |
//! | [`SetpointReset`] | SetpointChange, BaseTerms | zeros the integral on a change, then pauses it |
//! | [`Freeze`] | BaseTerms | holds `i` for a duration or until unfrozen |
//! | [`SetpointRamp`] | SetpointChange, InitialConditions, BaseTerms | spreads a setpoint jump over time |
//! | [`BangBang`] | CalculateU | quantizes `u` into on / off / dead values |
//! | [`DeltaE`] | ModifyTerms | derivative on the error instead of the pv |
//! | [`Deadband`] | CalculateU | holds `u` while it moves less than a width |
//! | [`History`] | every event | bounded, timestamped record of events |
//! | [`Tracer`] | every event | logs events through `tracing` |
//!
//! # Example
//!
//! ```rust
//! use hookpid_core::Controller;
//! use hookpid_modifiers::{SetpointRamp, Windup};
//! use hookpid_types::Gains;
//!
//! let mut pid = Controller::new(
//!     Gains::new(1.0, 0.5, 0.0),
//!     vec![
//!         Box::new(SetpointRamp::new(2.0).unwrap()),
//!         Box::new(Windup::symmetric(10.0).unwrap()),
//!     ],
//! )
//! .unwrap();
//!
//! pid.set_setpoint(4.0).unwrap();
//! pid.compute(0.0, Some(1.0)).unwrap();
//! assert_eq!(pid.setpoint(), 2.0); // halfway up the ramp
//! ```

pub mod bang_bang;
pub mod deadband;
pub mod delta_e;
pub mod freeze;
pub mod history;
pub mod ramp;
pub mod setpoint_reset;
pub mod tracer;
pub mod windup;

pub use bang_bang::{BangBang, BangBangBuilder};
pub use deadband::Deadband;
pub use delta_e::DeltaE;
pub use freeze::Freeze;
pub use history::{History, Marker, Record};
pub use ramp::SetpointRamp;
pub use setpoint_reset::SetpointReset;
pub use tracer::Tracer;
pub use windup::Windup;
