//! [`Deadband`] – ignore output changes smaller than a band.

use hookpid_core::event::names::U;
use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, PidResult, Real};

/// Holds `u` at the last emitted value while the new value stays within
/// `width` of it.  `initial_conditions` forgets the last value.
#[derive(Debug, Clone)]
pub struct Deadband {
    width: Real,
    previous: Option<Real>,
}

impl Deadband {
    pub fn new(width: Real) -> PidResult<Self> {
        if !(width.is_finite() && width >= 0.0) {
            return Err(PidError::InvalidArg(format!(
                "deadband width ({width}) must be finite and non-negative"
            )));
        }
        Ok(Self {
            width,
            previous: None,
        })
    }

    pub fn width(&self) -> Real {
        self.width
    }
}

impl Modifier for Deadband {
    fn on_initial_conditions(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.previous = None;
        Ok(Flow::Continue)
    }

    fn on_calculate_u(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        let u = event.require(U)?;
        match self.previous {
            Some(previous) if (u - previous).abs() <= self.width => event.set_u(previous)?,
            _ => self.previous = Some(u),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpid_types::Gains;

    #[test]
    fn small_moves_are_held() {
        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![Box::new(Deadband::new(0.5).unwrap())],
        )
        .unwrap();
        pid.set_setpoint(10.0).unwrap();
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 10.0);
        assert_eq!(pid.compute(0.25, Some(1.0)).unwrap(), 10.0);
        assert_eq!(pid.compute(0.5, Some(1.0)).unwrap(), 10.0);
        assert_eq!(pid.compute(1.0, Some(1.0)).unwrap(), 9.0);
        // Measured against the last emitted value, not the last computed one.
        assert_eq!(pid.compute(1.4, Some(1.0)).unwrap(), 9.0);
    }

    #[test]
    fn initial_conditions_forget_the_held_value() {
        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![Box::new(Deadband::new(5.0).unwrap())],
        )
        .unwrap();
        pid.set_setpoint(2.0).unwrap();
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 2.0);
        pid.initial_conditions(Some(0.0), Some(4.0)).unwrap();
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 4.0);
    }

    #[test]
    fn negative_width_is_rejected() {
        assert!(Deadband::new(-1.0).is_err());
        assert_eq!(Deadband::new(0.0).unwrap().width(), 0.0);
    }
}
