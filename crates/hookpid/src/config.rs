//! Declarative controller construction from TOML.
//!
//! A document names the gains, optional initial conditions and the modifier
//! chain in order.  Each `[[modifiers]]` entry is tagged with `type`:
//!
//! ```toml
//! [gains]
//! kp = 1.0
//! ki = 0.5
//!
//! [initial]
//! pv = 20.0
//! setpoint = 20.0
//!
//! [[modifiers]]
//! type = "ramp"
//! secs = 30.0
//!
//! [[modifiers]]
//! type = "windup"
//! limit = 5.0
//! ```
//!
//! | `type` | Keys |
//! |---|---|
//! | `windup` | `limit`, or `lo` and `hi` |
//! | `setpoint_reset` | `pause` (default 0) |
//! | `freeze` | none; freezing is a runtime call |
//! | `ramp` | `secs`, `hidden` (default false), `threshold` (default 0) |
//! | `bang_bang` | `on_threshold`, `off_threshold` (at least one), `on_value` (1), `off_value` (0), `dead_value` |
//! | `delta_e` | `kick_filter` (default false) |
//! | `deadband` | `width` |
//! | `history` | `capacity` |
//! | `tracer` | `label` (default empty) |
//!
//! The document only describes construction; controller state is never
//! written back.
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |---|---|
//! | `HOOKPID_KP` | `gains.kp` |
//! | `HOOKPID_KI` | `gains.ki` |
//! | `HOOKPID_KD` | `gains.kd` |
//!
//! Values that do not parse as numbers are ignored.

use std::fs;
use std::path::Path;

use hookpid_core::{Controller, Modifier};
use hookpid_modifiers::{
    BangBang, Deadband, DeltaE, Freeze, History, SetpointRamp, SetpointReset, Tracer, Windup,
};
use hookpid_types::{Gains, PidError, PidResult, Real};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControllerConfig {
    pub gains: Gains,

    /// Applied through `initial_conditions` after construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<InitialConfig>,

    /// Modifier chain, in dispatch order.
    #[serde(default)]
    pub modifiers: Vec<ModifierConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InitialConfig {
    #[serde(default)]
    pub pv: Option<Real>,
    #[serde(default)]
    pub setpoint: Option<Real>,
}

/// One entry of the modifier chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierConfig {
    Windup {
        #[serde(default)]
        limit: Option<Real>,
        #[serde(default)]
        lo: Option<Real>,
        #[serde(default)]
        hi: Option<Real>,
    },
    SetpointReset {
        #[serde(default)]
        pause: Real,
    },
    Freeze,
    Ramp {
        secs: Real,
        #[serde(default)]
        hidden: bool,
        #[serde(default)]
        threshold: Real,
    },
    BangBang {
        #[serde(default)]
        on_threshold: Option<Real>,
        #[serde(default)]
        off_threshold: Option<Real>,
        #[serde(default = "default_on_value")]
        on_value: Real,
        #[serde(default)]
        off_value: Real,
        #[serde(default)]
        dead_value: Option<Real>,
    },
    DeltaE {
        #[serde(default)]
        kick_filter: bool,
    },
    Deadband {
        width: Real,
    },
    History {
        capacity: usize,
    },
    Tracer {
        #[serde(default)]
        label: String,
    },
}

fn default_on_value() -> Real {
    1.0
}

impl ModifierConfig {
    /// Instantiate the described modifier.
    pub fn build(&self) -> PidResult<Box<dyn Modifier>> {
        let modifier: Box<dyn Modifier> = match self {
            ModifierConfig::Windup { limit, lo, hi } => match (limit, lo, hi) {
                (Some(w), None, None) => Box::new(Windup::symmetric(*w)?),
                (None, Some(lo), Some(hi)) => Box::new(Windup::new(*lo, *hi)?),
                _ => {
                    return Err(PidError::Config(
                        "windup needs either `limit` or both `lo` and `hi`".to_string(),
                    ));
                }
            },
            ModifierConfig::SetpointReset { pause } => Box::new(SetpointReset::new(*pause)?),
            ModifierConfig::Freeze => Box::new(Freeze::new()),
            ModifierConfig::Ramp {
                secs,
                hidden,
                threshold,
            } => Box::new(
                SetpointRamp::new(*secs)?
                    .hidden(*hidden)
                    .threshold(*threshold)?,
            ),
            ModifierConfig::BangBang {
                on_threshold,
                off_threshold,
                on_value,
                off_value,
                dead_value,
            } => Box::new(
                BangBang::builder()
                    .on_threshold(*on_threshold)
                    .off_threshold(*off_threshold)
                    .on_value(*on_value)
                    .off_value(*off_value)
                    .dead_value(*dead_value)
                    .build()?,
            ),
            ModifierConfig::DeltaE { kick_filter } => Box::new(DeltaE::new(*kick_filter)),
            ModifierConfig::Deadband { width } => Box::new(Deadband::new(*width)?),
            ModifierConfig::History { capacity } => Box::new(History::new(*capacity)?),
            ModifierConfig::Tracer { label } => Box::new(Tracer::new(label.clone())),
        };
        Ok(modifier)
    }
}

impl ControllerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> PidResult<Self> {
        toml::from_str(raw).map_err(|e| PidError::Config(format!("Failed to parse config: {e}")))
    }

    /// Read and parse `path`, then apply environment overrides.
    pub fn load_from(path: &Path) -> PidResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PidError::Config(format!("Failed to read config at {}: {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&raw)?;
        cfg.apply_env_overrides();
        debug!(path = %path.display(), modifiers = cfg.modifiers.len(), "controller config loaded");
        Ok(cfg)
    }

    /// Apply `HOOKPID_*` gain overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HOOKPID_KP")
            && let Ok(kp) = v.parse::<Real>()
        {
            self.gains.kp = kp;
        }
        if let Ok(v) = std::env::var("HOOKPID_KI")
            && let Ok(ki) = v.parse::<Real>()
        {
            self.gains.ki = ki;
        }
        if let Ok(v) = std::env::var("HOOKPID_KD")
            && let Ok(kd) = v.parse::<Real>()
        {
            self.gains.kd = kd;
        }
    }

    /// Serialize back to TOML, e.g. to write a template.
    pub fn to_toml_string(&self) -> PidResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PidError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Build the controller, attach the chain and apply `initial`.
    pub fn build(&self) -> PidResult<Controller> {
        let modifiers = self
            .modifiers
            .iter()
            .map(ModifierConfig::build)
            .collect::<PidResult<Vec<_>>>()?;
        let mut pid = Controller::new(self.gains, modifiers)?;
        if let Some(initial) = self.initial {
            pid.initial_conditions(initial.pv, initial.setpoint)?;
        }
        Ok(pid)
    }
}

/// JSON schema of [`ControllerConfig`], for editor tooling.
pub fn config_schema() -> RootSchema {
    schemars::schema_for!(ControllerConfig)
}
