//! [`DeltaE`] – derivative on the error instead of the process variable.
//!
//! Replaces `d` during `ModifyTerms` with `(e - previous e) / dt`.  The
//! first computation after `initial_conditions` has no previous error and
//! yields `d = 0`.  Unlike the built-in derivative this one does see
//! setpoint changes; with the kick filter on, the computation right after a
//! change repeats the previous `d` instead of spiking.

use hookpid_core::event::names::E;
use hookpid_core::{Attachment, Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{PidError, Real};

#[derive(Debug, Clone)]
pub struct DeltaE {
    kick_filter: bool,
    kick_ticks: u32,
    previous_e: Option<Real>,
    previous_d: Real,
    attachment: Attachment,
}

impl DeltaE {
    pub fn new(kick_filter: bool) -> Self {
        Self {
            kick_filter,
            kick_ticks: 0,
            previous_e: None,
            previous_d: 0.0,
            attachment: Attachment::new(),
        }
    }

    pub fn kick_filter(&self) -> bool {
        self.kick_filter
    }

    fn reset(&mut self) {
        self.kick_ticks = 0;
        self.previous_e = None;
        self.previous_d = 0.0;
    }
}

impl Default for DeltaE {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Modifier for DeltaE {
    fn on_attached(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.attachment.claim("DeltaE", event.owner())?;
        Ok(Flow::Continue)
    }

    fn on_initial_conditions(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.reset();
        Ok(Flow::Continue)
    }

    fn on_setpoint_change(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        if self.kick_filter {
            self.kick_ticks = 1;
        }
        Ok(Flow::Continue)
    }

    fn on_modify_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        let e = event.require(E)?;
        let d = match self.previous_e {
            None => 0.0,
            Some(_) if self.kick_ticks > 0 => {
                self.kick_ticks -= 1;
                self.previous_d
            }
            Some(previous) => {
                let dt = pid.dt();
                if dt == 0.0 {
                    return Err(PidError::ZeroInterval);
                }
                (e - previous) / dt
            }
        };
        event.set_d(d)?;
        self.previous_e = Some(e);
        self.previous_d = d;
        Ok(Flow::Continue)
    }
}
