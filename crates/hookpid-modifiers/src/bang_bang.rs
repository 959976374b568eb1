//! [`BangBang`] – quantize the output into on / off (/ dead) values.
//!
//! | Thresholds | On | Off | Dead |
//! |---|---|---|---|
//! | on only | `u >= on` | `u < on` | – |
//! | off only | `u > off` | `u <= off` | – |
//! | both | `u >= on` | `u <= off` | in between |
//!
//! Inside the dead zone `u` becomes `dead_value`, or passes through
//! unchanged when none is configured.
//!
//! ```rust
//! use hookpid_modifiers::BangBang;
//!
//! let relay = BangBang::builder()
//!     .on_threshold(1.0)
//!     .off_threshold(-1.0)
//!     .on_value(100.0)
//!     .off_value(0.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(relay.quantize(3.0), 100.0);
//! assert_eq!(relay.quantize(-3.0), 0.0);
//! assert_eq!(relay.quantize(0.5), 0.5);
//! ```

use hookpid_core::event::names::U;
use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};

#[derive(Debug, Clone, PartialEq)]
pub struct BangBang {
    on_threshold: Option<Real>,
    off_threshold: Option<Real>,
    on_value: Real,
    off_value: Real,
    dead_value: Option<Real>,
}

impl BangBang {
    pub fn builder() -> BangBangBuilder {
        BangBangBuilder::default()
    }

    /// Value `u` is replaced with.
    pub fn quantize(&self, u: Real) -> Real {
        let value = match (self.on_threshold, self.off_threshold) {
            (Some(on), None) => Some(if u >= on { self.on_value } else { self.off_value }),
            (None, Some(off)) => Some(if u > off { self.on_value } else { self.off_value }),
            (Some(on), Some(off)) => {
                if u >= on {
                    Some(self.on_value)
                } else if u <= off {
                    Some(self.off_value)
                } else {
                    self.dead_value
                }
            }
            (None, None) => None,
        };
        value.unwrap_or(u)
    }
}

impl Modifier for BangBang {
    fn on_calculate_u(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        let u = event.require(U)?;
        event.set_u(self.quantize(u))?;
        Ok(Flow::Continue)
    }
}

/// Builder for [`BangBang`]; both thresholds start at zero, on/off values at
/// one and zero.
#[derive(Debug, Clone)]
pub struct BangBangBuilder {
    on_threshold: Option<Real>,
    off_threshold: Option<Real>,
    on_value: Real,
    off_value: Real,
    dead_value: Option<Real>,
}

impl Default for BangBangBuilder {
    fn default() -> Self {
        Self {
            on_threshold: Some(0.0),
            off_threshold: Some(0.0),
            on_value: 1.0,
            off_value: 0.0,
            dead_value: None,
        }
    }
}

impl BangBangBuilder {
    /// `None` removes the threshold.
    pub fn on_threshold(mut self, threshold: impl Into<Option<Real>>) -> Self {
        self.on_threshold = threshold.into();
        self
    }

    /// `None` removes the threshold.
    pub fn off_threshold(mut self, threshold: impl Into<Option<Real>>) -> Self {
        self.off_threshold = threshold.into();
        self
    }

    pub fn on_value(mut self, value: Real) -> Self {
        self.on_value = value;
        self
    }

    pub fn off_value(mut self, value: Real) -> Self {
        self.off_value = value;
        self
    }

    pub fn dead_value(mut self, value: impl Into<Option<Real>>) -> Self {
        self.dead_value = value.into();
        self
    }

    /// # Errors
    ///
    /// [`PidError::InvalidArg`] when both thresholds are absent, a threshold
    /// is not finite, or `off > on`.
    pub fn build(self) -> PidResult<BangBang> {
        let finite = |t: Option<Real>| t.is_none_or(Real::is_finite);
        if !(finite(self.on_threshold) && finite(self.off_threshold)) {
            return Err(PidError::InvalidArg("bang-bang thresholds must be finite".to_string()));
        }
        match (self.on_threshold, self.off_threshold) {
            (None, None) => {
                return Err(PidError::InvalidArg(
                    "bang-bang needs an on or an off threshold".to_string(),
                ));
            }
            (Some(on), Some(off)) if off > on => {
                return Err(PidError::InvalidArg(format!(
                    "bang-bang off threshold ({off}) is above the on threshold ({on})"
                )));
            }
            _ => {}
        }
        Ok(BangBang {
            on_threshold: self.on_threshold,
            off_threshold: self.off_threshold,
            on_value: self.on_value,
            off_value: self.off_value,
            dead_value: self.dead_value,
        })
    }
}
