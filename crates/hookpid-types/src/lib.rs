//! `hookpid-types` – shared vocabulary for the hookpid workspace.
//!
//! Every other crate speaks in these types: the controller gains, the
//! `(p, i, d)` term triple, the identity of a controller, the closed set of
//! hook event kinds, the access class of an event field and the single
//! error taxonomy ([`PidError`]).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Floating point type used by every controller computation.
pub type Real = f64;

/// Result alias used across the workspace.
pub type PidResult<T> = Result<T, PidError>;

// ────────────────────────────────────────────────────────────────────────────
// Controller vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Weights applied to the proportional, integral and derivative terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Gains {
    /// Proportional gain.
    #[serde(default)]
    pub kp: Real,
    /// Integral gain.
    #[serde(default)]
    pub ki: Real,
    /// Derivative gain.
    #[serde(default)]
    pub kd: Real,
}

impl Gains {
    pub fn new(kp: Real, ki: Real, kd: Real) -> Self {
        Self { kp, ki, kd }
    }

    /// Reject gain sets a controller cannot run with.
    ///
    /// # Errors
    ///
    /// [`PidError::InvalidArg`] when any gain is not finite or all three are
    /// zero.
    pub fn validate(&self) -> PidResult<()> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(PidError::InvalidArg(format!(
                "gains must be finite (kp={}, ki={}, kd={})",
                self.kp, self.ki, self.kd
            )));
        }
        if self.kp == 0.0 && self.ki == 0.0 && self.kd == 0.0 {
            return Err(PidError::InvalidArg(
                "kp/ki/kd must not all be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Weighted sum `p·kp + i·ki + d·kd`.
    pub fn combine(&self, terms: Terms) -> Real {
        terms.p * self.kp + terms.i * self.ki + terms.d * self.kd
    }
}

/// Unweighted proportional, integral and derivative terms of one computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Terms {
    pub p: Real,
    pub i: Real,
    pub d: Real,
}

impl Terms {
    pub fn new(p: Real, i: Real, d: Real) -> Self {
        Self { p, i, d }
    }
}

/// Stable identity of one controller instance.
///
/// Every event carries the id of the controller that created it; single-owner
/// modifiers compare ids to detect reuse across controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerId(Uuid);

impl ControllerId {
    /// Allocate a fresh, never-before-seen id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// The closed set of hook events a controller can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A modifier chain was attached to a new controller.
    Attached,
    /// The controller state was reset without "kick".
    InitialConditions,
    /// The setpoint is about to change.
    SetpointChange,
    /// First calculation phase: any of `e, p, i, d, u` may be supplied.
    BaseTerms,
    /// Second calculation phase: adjust `p, i, d, u` before combination.
    ModifyTerms,
    /// Final calculation phase: only `u` may still change.
    CalculateU,
    /// An earlier modifier stopped propagation of an event.
    HookStopped,
    /// An earlier modifier failed while handling an event.
    Failure,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Attached,
        EventKind::InitialConditions,
        EventKind::SetpointChange,
        EventKind::BaseTerms,
        EventKind::ModifyTerms,
        EventKind::CalculateU,
        EventKind::HookStopped,
        EventKind::Failure,
    ];

    /// Name of the modifier handler that receives this kind.
    pub fn handler_name(&self) -> &'static str {
        match self {
            EventKind::Attached => "on_attached",
            EventKind::InitialConditions => "on_initial_conditions",
            EventKind::SetpointChange => "on_setpoint_change",
            EventKind::BaseTerms => "on_base_terms",
            EventKind::ModifyTerms => "on_modify_terms",
            EventKind::CalculateU => "on_calculate_u",
            EventKind::HookStopped => "on_hook_stopped",
            EventKind::Failure => "on_failure",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Attached => "Attached",
            EventKind::InitialConditions => "InitialConditions",
            EventKind::SetpointChange => "SetpointChange",
            EventKind::BaseTerms => "BaseTerms",
            EventKind::ModifyTerms => "ModifyTerms",
            EventKind::CalculateU => "CalculateU",
            EventKind::HookStopped => "HookStopped",
            EventKind::Failure => "Failure",
        };
        f.write_str(name)
    }
}

/// How a handler may treat one event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Fixed forever after creation.
    ReadOnly,
    /// Unset at creation; accepts exactly one write, unreadable before it.
    WriteOnce,
    /// Any handler may overwrite it any number of times.
    ReadWrite,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every failure a controller, its events or its modifiers can report.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PidError {
    #[error("Access violation: field `{field}` of {event} is read-only")]
    ReadOnly { event: EventKind, field: String },

    #[error("Access violation: write-once field `{field}` of {event} was already written")]
    AlreadyWritten { event: EventKind, field: String },

    #[error("Access violation: field `{field}` of {event} has no value yet")]
    Unset { event: EventKind, field: String },

    #[error("Access violation: {event} has no field `{field}`")]
    NoSuchField { event: EventKind, field: String },

    #[error("Domain error: derivative term needs a non-zero interval (dt = 0)")]
    ZeroInterval,

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Attachment conflict: modifier `{modifier}` already belongs to controller {owner}")]
    AttachmentConflict { modifier: String, owner: ControllerId },

    #[error("Modifier `{modifier}` is already handling an event")]
    Busy { modifier: String },

    #[error("{0}")]
    Fault(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Modifier `{modifier}` (position {index}) failed on {event}: {source}")]
    Modifier {
        modifier: String,
        index: usize,
        event: EventKind,
        #[source]
        source: Box<PidError>,
    },
}

impl PidError {
    /// Strip every [`PidError::Modifier`] context layer.
    pub fn root_cause(&self) -> &PidError {
        let mut err = self;
        while let PidError::Modifier { source, .. } = err {
            err = source;
        }
        err
    }

    /// `true` for the access-violation family.
    pub fn is_access_violation(&self) -> bool {
        matches!(
            self.root_cause(),
            PidError::ReadOnly { .. }
                | PidError::AlreadyWritten { .. }
                | PidError::Unset { .. }
                | PidError::NoSuchField { .. }
        )
    }
}
