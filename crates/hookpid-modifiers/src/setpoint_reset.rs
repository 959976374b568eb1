//! [`SetpointReset`] – restart the integral when the setpoint moves.
//!
//! A setpoint change zeros the integral accumulator on the next computation
//! and then holds `i` at zero for a configured pause while the loop settles
//! into the new regime.  A pause of zero resets without pausing.

use hookpid_core::{Attachment, Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};

#[derive(Debug, Clone)]
pub struct SetpointReset {
    pause: Real,
    remaining: Real,
    triggered: bool,
    attachment: Attachment,
}

impl SetpointReset {
    /// # Errors
    ///
    /// [`PidError::InvalidArg`] when `pause` is negative or not finite.
    pub fn new(pause: Real) -> PidResult<Self> {
        if !(pause.is_finite() && pause >= 0.0) {
            return Err(PidError::InvalidArg(format!(
                "integration pause ({pause}) must be finite and non-negative"
            )));
        }
        Ok(Self {
            pause,
            remaining: 0.0,
            triggered: false,
            attachment: Attachment::new(),
        })
    }

    pub fn pause(&self) -> Real {
        self.pause
    }

    /// `true` while the integral is held at zero.
    pub fn is_paused(&self) -> bool {
        self.remaining > 0.0
    }
}

impl Modifier for SetpointReset {
    fn on_attached(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.attachment.claim("SetpointReset", event.owner())?;
        Ok(Flow::Continue)
    }

    fn on_initial_conditions(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.remaining = 0.0;
        self.triggered = false;
        Ok(Flow::Continue)
    }

    fn on_setpoint_change(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.triggered = true;
        Ok(Flow::Continue)
    }

    fn on_base_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        if self.triggered {
            pid.set_integration(0.0);
            self.remaining = self.pause;
            self.triggered = false;
            event.set_i(0.0)?;
        }
        if self.remaining > 0.0 {
            self.remaining -= pid.dt();
            event.set_i(0.0)?;
        }
        Ok(Flow::Continue)
    }
}
