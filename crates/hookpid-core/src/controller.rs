//! [`Controller`] – PID state plus the three-phase calculation pipeline.
//!
//! Every [`Controller::compute`] call runs:
//!
//! 1. **BaseTerms** – modifiers may supply any of `e, p, i, d, u`; whatever
//!    is still unset afterwards comes from the built-in formulas in
//!    [`crate::terms`].
//! 2. **ModifyTerms** – modifiers adjust `p, i, d` (and may pre-empt `u`).
//!    If `u` is still unset it becomes `p·kp + i·ki + d·kd`.
//! 3. **CalculateU** – only `u` may change; its final value is returned.
//!
//! Lifecycle calls dispatch their own events: construction sends
//! `Attached` then resets through [`Controller::initial_conditions`], and
//! [`Controller::set_setpoint`] sends `SetpointChange` for real changes only.
//!
//! # Example
//!
//! ```rust
//! use hookpid_core::Controller;
//! use hookpid_types::Gains;
//!
//! let mut pid = Controller::new(Gains::new(10.0, 2.0, 0.0), vec![]).unwrap();
//! pid.set_setpoint(1.0).unwrap();
//! assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 12.0);
//! assert_eq!(pid.compute(0.0, None).unwrap(), 14.0);
//! ```

use std::any::Any;

use hookpid_types::{ControllerId, EventKind, Gains, PidError, PidResult, Real, Terms};
use tracing::{debug, trace};

use crate::dispatch::Chain;
use crate::event::Event;
use crate::event::names::{D, DT, I, P, U};
use crate::modifier::Modifier;
use crate::terms;

/// A PID controller with an ordered chain of [`Modifier`]s.
pub struct Controller {
    id: ControllerId,
    gains: Gains,
    setpoint: Real,
    pv: Real,
    previous_pv: Real,
    integration: Real,
    dt: Real,
    last_terms: Terms,
    pub(crate) chain: Chain,
    pub(crate) depth: usize,
}

impl Controller {
    /// Build a controller and attach `modifiers` in order.
    ///
    /// # Errors
    ///
    /// - [`PidError::InvalidArg`] – gains are all zero or not finite.
    /// - Any failure raised while handling `Attached` or the initial
    ///   `InitialConditions` (for instance an attachment conflict).
    pub fn new(gains: Gains, modifiers: Vec<Box<dyn Modifier>>) -> PidResult<Self> {
        gains.validate()?;
        let mut pid = Self {
            id: ControllerId::new(),
            gains,
            setpoint: 0.0,
            pv: 0.0,
            previous_pv: 0.0,
            integration: 0.0,
            dt: 0.0,
            last_terms: Terms::default(),
            chain: Chain::new(modifiers),
            depth: 0,
        };
        debug!(controller = %pid.id, modifiers = ?pid.chain.names(), "attaching modifiers");
        pid.notify(Event::attached(pid.id))?;
        pid.initial_conditions(Some(0.0), Some(0.0))?;
        Ok(pid)
    }

    /// Reset state without "kick".
    ///
    /// `setpoint` is applied directly, without a `SetpointChange` dispatch.
    /// `pv` also clears the integral and makes the next derivative zero.
    /// The interval and the last term triple are always reset.
    pub fn initial_conditions(&mut self, pv: Option<Real>, setpoint: Option<Real>) -> PidResult<()> {
        self.dt = 0.0;
        if let Some(setpoint) = setpoint {
            self.setpoint = setpoint;
        }
        if let Some(pv) = pv {
            self.integration = 0.0;
            self.previous_pv = pv;
            self.pv = pv;
        }
        self.last_terms = Terms::default();
        debug!(controller = %self.id, ?pv, ?setpoint, "initial conditions");

        self.notify(Event::initial_conditions(self.id, pv, setpoint))?;
        Ok(())
    }

    /// Request a new setpoint.
    ///
    /// Writing the current value does nothing.  Otherwise modifiers see a
    /// `SetpointChange` and may substitute the value actually applied.
    pub fn set_setpoint(&mut self, value: Real) -> PidResult<()> {
        if value == self.setpoint {
            return Ok(());
        }
        let event = self.notify(Event::setpoint_change(self.id, self.setpoint, value))?;
        self.setpoint = event.applied()?.unwrap_or(value);
        debug!(controller = %self.id, requested = value, applied = self.setpoint, "setpoint changed");
        Ok(())
    }

    /// Run the pipeline for a new process variable reading.
    ///
    /// `dt` of `None` reuses the previous interval.
    ///
    /// # Errors
    ///
    /// - [`PidError::InvalidArg`] – `dt` is negative or not finite.
    /// - [`PidError::ZeroInterval`] – the derivative had to be computed with
    ///   `dt == 0`.
    /// - Any modifier failure, wrapped in [`PidError::Modifier`].
    pub fn compute(&mut self, pv: Real, dt: Option<Real>) -> PidResult<Real> {
        if let Some(dt) = dt {
            if !(dt.is_finite() && dt >= 0.0) {
                return Err(PidError::InvalidArg(format!(
                    "dt must be finite and non-negative, got {dt}"
                )));
            }
            self.dt = dt;
        }
        self.pv = pv;

        let mut base = self.notify(Event::base_terms(self.id, self.dt))?;
        self.fill_base_terms(&mut base)?;

        let mut modify = self.notify(base.clone_into(EventKind::ModifyTerms))?;
        let terms = Terms::new(modify.require(P)?, modify.require(I)?, modify.require(D)?);
        if !modify.is_set(U) {
            modify.set_u(self.gains.combine(terms))?;
        }
        self.last_terms = terms;

        let done = self.notify(modify.clone_into(EventKind::CalculateU))?;
        let u = done.require(U)?;
        trace!(controller = %self.id, pv, dt = self.dt, p = terms.p, i = terms.i, d = terms.d, u, "computed");
        Ok(u)
    }

    /// Built-in formulas for whatever `BaseTerms` left unset.
    fn fill_base_terms(&mut self, event: &mut Event) -> PidResult<()> {
        let dt = event.require(DT)?;
        let e = match event.e()? {
            Some(e) => e,
            None => {
                let e = terms::error(self.setpoint, self.pv);
                event.set_e(e)?;
                e
            }
        };
        if !event.is_set(P) {
            event.set_p(terms::proportional(e))?;
        }
        if !event.is_set(I) {
            self.integration = terms::integrate(self.integration, e, dt);
            event.set_i(self.integration)?;
        }
        if !event.is_set(D) {
            let d = if dt == 0.0 && event.is_set(U) {
                0.0
            } else {
                let d = terms::derivative(self.previous_pv, self.pv, dt)?;
                self.previous_pv = self.pv;
                d
            };
            event.set_d(d)?;
        }
        Ok(())
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// Replace the gains; the state is kept.
    pub fn set_gains(&mut self, gains: Gains) -> PidResult<()> {
        gains.validate()?;
        self.gains = gains;
        Ok(())
    }

    pub fn setpoint(&self) -> Real {
        self.setpoint
    }

    pub fn pv(&self) -> Real {
        self.pv
    }

    /// Overwrite the process variable without touching `previous_pv`.
    ///
    /// Unlike [`Controller::initial_conditions`], the next derivative sees
    /// the jump.
    pub fn set_pv(&mut self, pv: Real) {
        self.pv = pv;
    }

    pub fn previous_pv(&self) -> Real {
        self.previous_pv
    }

    /// Interval used by the most recent (or next) computation.
    pub fn dt(&self) -> Real {
        self.dt
    }

    /// Integral accumulator.
    pub fn integration(&self) -> Real {
        self.integration
    }

    /// Overwrite the integral accumulator; meant for modifiers.
    pub fn set_integration(&mut self, integration: Real) {
        self.integration = integration;
    }

    /// `(p, i, d)` of the last computation, zero after a reset.
    pub fn last_terms(&self) -> Terms {
        self.last_terms
    }

    /// Zero outside any dispatch.
    pub fn nesting_depth(&self) -> usize {
        self.depth
    }

    pub fn modifier_names(&self) -> &[String] {
        self.chain.names()
    }

    /// First modifier of type `T` in the chain.
    ///
    /// A modifier whose handler is currently running is not visible.
    pub fn find_modifier<T: Modifier>(&self) -> Option<&T> {
        self.chain
            .iter()
            .find_map(|m| <dyn Any>::downcast_ref::<T>(m))
    }

    /// Mutable variant of [`Controller::find_modifier`].
    pub fn find_modifier_mut<T: Modifier>(&mut self) -> Option<&mut T> {
        self.chain
            .iter_mut()
            .find_map(|m| <dyn Any>::downcast_mut::<T>(m))
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("gains", &self.gains)
            .field("setpoint", &self.setpoint)
            .field("pv", &self.pv)
            .field("previous_pv", &self.previous_pv)
            .field("integration", &self.integration)
            .field("dt", &self.dt)
            .field("last_terms", &self.last_terms)
            .field("modifiers", &self.chain.names())
            .finish()
    }
}
