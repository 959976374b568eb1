//! [`Windup`] – integral anti-windup clamp.
//!
//! During `ModifyTerms` the controller's integral accumulator is clamped into
//! `[lo, hi]` and the clamped value becomes the `i` term.  Once the clamp
//! binds, further error in the same direction no longer raises `u`, and
//! error in the opposite direction lowers it on the very next tick.
//!
//! `Windup::symmetric(0.0)` means no limit and leaves the integral alone.

use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windup {
    bounds: Option<(Real, Real)>,
}

impl Windup {
    /// Clamp into `[lo, hi]`.
    ///
    /// # Errors
    ///
    /// [`PidError::InvalidArg`] when a bound is not finite or `lo > hi`.
    pub fn new(lo: Real, hi: Real) -> PidResult<Self> {
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(PidError::InvalidArg(format!(
                "windup bounds must be finite with lo <= hi (lo={lo}, hi={hi})"
            )));
        }
        Ok(Self {
            bounds: Some((lo, hi)),
        })
    }

    /// Clamp into `[-w, w]`; `w` must not be negative.  Zero disables the
    /// clamp.
    pub fn symmetric(w: Real) -> PidResult<Self> {
        if w < 0.0 || w.is_nan() {
            return Err(PidError::InvalidArg(format!(
                "windup ({w}) must not be negative"
            )));
        }
        if w == 0.0 {
            return Ok(Self { bounds: None });
        }
        Self::new(-w, w)
    }

    /// `None` when the clamp is disabled.
    pub fn bounds(&self) -> Option<(Real, Real)> {
        self.bounds
    }
}

impl Modifier for Windup {
    fn on_modify_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        let Some((lo, hi)) = self.bounds else {
            return Ok(Flow::Continue);
        };
        let clamped = pid.integration().clamp(lo, hi);
        pid.set_integration(clamped);
        event.set_i(clamped)?;
        Ok(Flow::Continue)
    }
}
