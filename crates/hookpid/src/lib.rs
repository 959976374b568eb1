//! `hookpid` – PID controllers whose every calculation step can be hooked.
//!
//! This crate bundles the workspace for applications:
//!
//! | Module / re-export | Contents |
//! |---|---|
//! | [`Controller`], [`Modifier`], [`Event`], … | engine from `hookpid-core` |
//! | [`modifiers`] | ready-made modifiers from `hookpid-modifiers` |
//! | [`config`] | building a controller and its chain from TOML |
//! | [`telemetry`] | `tracing` subscriber and OTLP export setup |
//!
//! # Example
//!
//! ```rust
//! use hookpid::config::ControllerConfig;
//!
//! let cfg = ControllerConfig::from_toml_str(r#"
//!     [gains]
//!     kp = 2.0
//!
//!     [initial]
//!     setpoint = 1.0
//!
//!     [[modifiers]]
//!     type = "bang_bang"
//!     on_threshold = 0.5
//! "#).unwrap();
//!
//! let mut pid = cfg.build().unwrap();
//! assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 1.0);
//! assert_eq!(pid.compute(0.9, Some(1.0)).unwrap(), 0.0);
//! ```

pub mod config;
pub mod telemetry;

pub use hookpid_core::{
    Attachment, Controller, Event, Fields, Flow, HookResult, Interruption, Modifier, Schema,
    Shared, handle,
};
pub use hookpid_types::{
    Access, ControllerId, EventKind, Gains, PidError, PidResult, Real, Terms,
};

/// Ready-made modifiers.
pub mod modifiers {
    pub use hookpid_modifiers::*;
}
