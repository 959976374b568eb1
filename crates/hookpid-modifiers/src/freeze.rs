//! [`Freeze`] – hold the integral term at its current value.
//!
//! While frozen, `BaseTerms` supplies `i` from the accumulator so the
//! controller does not integrate.  A timed freeze counts down by each
//! computation's `dt`; an open-ended one lasts until [`Freeze::unfreeze`].
//! `initial_conditions` always unfreezes.

use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Hold {
    Thawed,
    For(Real),
    Indefinitely,
}

#[derive(Debug, Clone)]
pub struct Freeze {
    hold: Hold,
}

impl Default for Freeze {
    fn default() -> Self {
        Self::new()
    }
}

impl Freeze {
    pub fn new() -> Self {
        Self { hold: Hold::Thawed }
    }

    /// Freeze for `secs` of computation time.
    pub fn freeze_for(&mut self, secs: Real) -> PidResult<()> {
        if !(secs.is_finite() && secs >= 0.0) {
            return Err(PidError::InvalidArg(format!(
                "freeze duration ({secs}) must be finite and non-negative"
            )));
        }
        self.hold = if secs > 0.0 { Hold::For(secs) } else { Hold::Thawed };
        Ok(())
    }

    /// Freeze until [`Freeze::unfreeze`].
    pub fn freeze(&mut self) {
        self.hold = Hold::Indefinitely;
    }

    pub fn unfreeze(&mut self) {
        self.hold = Hold::Thawed;
    }

    pub fn is_frozen(&self) -> bool {
        self.hold != Hold::Thawed
    }

    /// Time left on a timed freeze.
    pub fn remaining(&self) -> Option<Real> {
        match self.hold {
            Hold::For(secs) => Some(secs),
            _ => None,
        }
    }
}

impl Modifier for Freeze {
    fn on_initial_conditions(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.unfreeze();
        Ok(Flow::Continue)
    }

    fn on_base_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        match self.hold {
            Hold::Thawed => {}
            Hold::Indefinitely => event.set_i(pid.integration())?,
            Hold::For(secs) => {
                event.set_i(pid.integration())?;
                let left = secs - pid.dt();
                self.hold = if left > 0.0 { Hold::For(left) } else { Hold::Thawed };
            }
        }
        Ok(Flow::Continue)
    }
}
