//! [`SetpointRamp`] – replace setpoint jumps with linear ramps.
//!
//! On a `SetpointChange` the ramp keeps the old setpoint in force and
//! remembers the requested one as its target.  Each later `BaseTerms` moves
//! the controller's setpoint a proportional step toward the target; after
//! the configured time has elapsed the setpoint lands exactly on the target.
//!
//! In **hidden** mode the controller's setpoint jumps immediately (so
//! [`Controller::setpoint`] reports the target) while the error fed to the
//! terms still follows the ramp.
//!
//! Changes no larger than the threshold, and every change while the ramp
//! time is zero, pass through unramped.  `initial_conditions` cancels any
//! ramp in progress.
//!
//! # Example
//!
//! ```rust
//! use hookpid_core::Controller;
//! use hookpid_modifiers::SetpointRamp;
//! use hookpid_types::Gains;
//!
//! let ramp = SetpointRamp::new(4.0).unwrap();
//! let mut pid = Controller::new(Gains::new(1.0, 0.0, 0.0), vec![Box::new(ramp)]).unwrap();
//!
//! pid.set_setpoint(8.0).unwrap();
//! assert_eq!(pid.setpoint(), 0.0);
//! for expected in [2.0, 4.0, 6.0, 8.0, 8.0] {
//!     pid.compute(0.0, Some(1.0)).unwrap();
//!     assert_eq!(pid.setpoint(), expected);
//! }
//! ```

use hookpid_core::event::names::{FROM, SETPOINT, TO};
use hookpid_core::{Attachment, Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};
use tracing::debug;

/// Fraction of the ramp time under which the remaining countdown counts as
/// finished.
const SNAP: Real = 1e-9;

#[derive(Debug, Clone)]
pub struct SetpointRamp {
    ramp_time: Real,
    hidden: bool,
    threshold: Real,
    start: Real,
    target: Real,
    countdown: Real,
    settle: bool,
    attachment: Attachment,
}

impl SetpointRamp {
    /// Ramp over `secs` seconds; zero disables ramping.
    ///
    /// # Errors
    ///
    /// [`PidError::InvalidArg`] when `secs` is negative or not finite.
    pub fn new(secs: Real) -> PidResult<Self> {
        check_ramp_time(secs)?;
        Ok(Self {
            ramp_time: secs,
            hidden: false,
            threshold: 0.0,
            start: 0.0,
            target: 0.0,
            countdown: 0.0,
            settle: false,
            attachment: Attachment::new(),
        })
    }

    /// Ramp only the error, not the reported setpoint.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Changes of at most `threshold` are applied without ramping.
    pub fn threshold(mut self, threshold: Real) -> PidResult<Self> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(PidError::InvalidArg(format!(
                "ramp threshold ({threshold}) must be finite and non-negative"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    /// Change the ramp time.
    ///
    /// A ramp in progress restarts from where it is now and covers the
    /// remaining distance in `secs`; zero finishes it on the next
    /// computation.
    pub fn set_ramp_time(&mut self, secs: Real) -> PidResult<()> {
        check_ramp_time(secs)?;
        if self.is_ramping() {
            self.start = self.ramped();
            if secs > 0.0 {
                self.countdown = secs;
            } else {
                self.countdown = 0.0;
                self.settle = true;
            }
        }
        self.ramp_time = secs;
        Ok(())
    }

    pub fn ramp_time(&self) -> Real {
        self.ramp_time
    }

    pub fn is_ramping(&self) -> bool {
        self.countdown > 0.0
    }

    /// Setpoint the ramp is heading to.
    pub fn target(&self) -> Real {
        self.target
    }

    /// Value the ramp currently applies.
    pub fn ramped(&self) -> Real {
        if !self.is_ramping() || self.ramp_time == 0.0 {
            return self.target;
        }
        let fraction = (self.ramp_time - self.countdown) / self.ramp_time;
        let value = self.start + (self.target - self.start) * fraction;
        if self.start < self.target {
            value.min(self.target)
        } else {
            value.max(self.target)
        }
    }

    fn reset(&mut self, setpoint: Real) {
        self.start = setpoint;
        self.target = setpoint;
        self.countdown = 0.0;
        self.settle = false;
    }
}

fn check_ramp_time(secs: Real) -> PidResult<()> {
    if !(secs.is_finite() && secs >= 0.0) {
        return Err(PidError::InvalidArg(format!(
            "ramp time ({secs}) must be finite and non-negative"
        )));
    }
    Ok(())
}

impl Modifier for SetpointRamp {
    fn on_attached(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.attachment.claim("SetpointRamp", event.owner())?;
        Ok(Flow::Continue)
    }

    fn on_initial_conditions(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        let setpoint = if event.is_set(SETPOINT) {
            event.require(SETPOINT)?
        } else {
            pid.setpoint()
        };
        self.reset(setpoint);
        Ok(Flow::Continue)
    }

    fn on_setpoint_change(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        let from = event.require(FROM)?;
        let to = event.require(TO)?;
        let current = if self.is_ramping() { self.ramped() } else { from };

        if to == self.target && self.is_ramping() {
            if !self.hidden {
                event.set_applied(from)?;
            }
            return Ok(Flow::Continue);
        }
        if self.ramp_time == 0.0 || (to - current).abs() <= self.threshold {
            self.reset(to);
            return Ok(Flow::Continue);
        }

        debug!(from = current, to, secs = self.ramp_time, hidden = self.hidden, "setpoint ramp started");
        self.start = current;
        self.target = to;
        self.countdown = self.ramp_time;
        self.settle = false;
        if !self.hidden {
            event.set_applied(from)?;
        }
        Ok(Flow::Continue)
    }

    fn on_base_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        if !self.is_ramping() && !self.settle {
            return Ok(Flow::Continue);
        }

        self.countdown -= pid.dt();
        let value = if self.countdown <= self.ramp_time * SNAP {
            self.countdown = 0.0;
            self.settle = false;
            self.target
        } else {
            self.ramped()
        };

        if self.hidden {
            event.set_e(value - pid.pv())?;
        } else {
            pid.set_setpoint(value)?;
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpid_types::Gains;

    fn ramped_controller(ramp: SetpointRamp) -> Controller {
        Controller::new(Gains::new(1.0, 0.0, 0.0), vec![Box::new(ramp)]).unwrap()
    }

    fn close(a: Real, b: Real) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
    }

    #[test]
    fn negative_ramp_time_is_rejected() {
        assert!(SetpointRamp::new(-1.0).is_err());
        assert!(SetpointRamp::new(1.0).unwrap().threshold(-0.1).is_err());
    }

    #[test]
    fn initial_conditions_do_not_ramp() {
        let setpoint = 5.0;
        let mut pid = ramped_controller(SetpointRamp::new(17.0).unwrap());
        pid.initial_conditions(Some(0.0), Some(setpoint)).unwrap();
        for (pv, u) in [(1.0, 4.0), (1.0, 4.0), (2.0, 3.0), (0.0, 5.0), (5.0, 0.0)] {
            assert_eq!(pid.compute(pv, Some(0.1)).unwrap(), u);
        }
    }

    #[test]
    fn ramp_is_linear_and_lands_on_target() {
        let ramp_time = 17.0;
        let setpoint = 5.0;
        let dt = 0.1;
        let mut pid = ramped_controller(SetpointRamp::new(ramp_time).unwrap());
        pid.initial_conditions(Some(0.0), Some(setpoint)).unwrap();

        pid.set_setpoint(2.0 * setpoint).unwrap();
        let mut ramped = setpoint;
        let ticks = (ramp_time / dt + 0.5) as usize;
        for _ in 0..ticks {
            let u = pid.compute(0.0, Some(dt)).unwrap();
            ramped += (setpoint / ramp_time) * dt;
            assert!(close(u, ramped), "{u} vs {ramped}");
        }

        pid.compute(0.0, Some(dt)).unwrap();
        assert_eq!(pid.setpoint(), 2.0 * setpoint);
        assert!(!pid.find_modifier::<SetpointRamp>().unwrap().is_ramping());
    }

    #[test]
    fn hidden_ramp_reports_the_target_but_ramps_the_error() {
        let mut pid = ramped_controller(SetpointRamp::new(4.0).unwrap().hidden(true));
        pid.set_setpoint(8.0).unwrap();
        assert_eq!(pid.setpoint(), 8.0);
        for expected in [2.0, 4.0, 6.0, 8.0, 8.0] {
            assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), expected);
            assert_eq!(pid.setpoint(), 8.0);
        }
    }

    #[test]
    fn small_changes_skip_the_ramp() {
        let mut pid = ramped_controller(SetpointRamp::new(10.0).unwrap().threshold(1.0).unwrap());
        pid.set_setpoint(0.5).unwrap();
        assert_eq!(pid.setpoint(), 0.5);
        pid.set_setpoint(5.0).unwrap();
        assert_eq!(pid.setpoint(), 0.5);
        assert!(pid.find_modifier::<SetpointRamp>().unwrap().is_ramping());
    }

    #[test]
    fn zero_ramp_time_passes_changes_through() {
        let mut pid = ramped_controller(SetpointRamp::new(0.0).unwrap());
        pid.set_setpoint(3.0).unwrap();
        assert_eq!(pid.setpoint(), 3.0);
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 3.0);
    }

    #[test]
    fn retiming_spreads_the_remaining_distance() {
        let mut pid = ramped_controller(SetpointRamp::new(4.0).unwrap());
        pid.set_setpoint(8.0).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 2.0);

        // 6 left to go, now over 2 seconds.
        pid.find_modifier_mut::<SetpointRamp>()
            .unwrap()
            .set_ramp_time(2.0)
            .unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 5.0);
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 8.0);
    }

    #[test]
    fn retiming_to_zero_finishes_next_tick() {
        let mut pid = ramped_controller(SetpointRamp::new(4.0).unwrap());
        pid.set_setpoint(8.0).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        pid.find_modifier_mut::<SetpointRamp>()
            .unwrap()
            .set_ramp_time(0.0)
            .unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 8.0);
    }

    #[test]
    fn new_request_mid_ramp_starts_from_the_current_value() {
        let mut pid = ramped_controller(SetpointRamp::new(4.0).unwrap());
        pid.set_setpoint(8.0).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 4.0);

        pid.set_setpoint(0.0).unwrap();
        assert_eq!(pid.setpoint(), 4.0);
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(pid.setpoint(), 3.0);
    }

    #[test]
    fn initial_conditions_cancel_a_ramp() {
        let mut pid = ramped_controller(SetpointRamp::new(4.0).unwrap());
        pid.set_setpoint(8.0).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        pid.initial_conditions(None, Some(1.0)).unwrap();
        let ramp = pid.find_modifier::<SetpointRamp>().unwrap();
        assert!(!ramp.is_ramping());
        assert_eq!(ramp.target(), 1.0);
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 1.0);
    }

    #[test]
    fn single_owner() {
        use hookpid_core::Shared;

        let ramp = Shared::new(SetpointRamp::new(1.0).unwrap());
        let gains = Gains::new(1.0, 0.0, 0.0);
        let _first = Controller::new(gains, vec![Box::new(ramp.clone())]).unwrap();
        let err = Controller::new(gains, vec![Box::new(ramp.clone())]).unwrap_err();
        assert!(matches!(err.root_cause(), PidError::AttachmentConflict { .. }));
    }
}
