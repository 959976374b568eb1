//! The [`Modifier`] trait – pluggable behaviour attached to a controller.
//!
//! A modifier implements any subset of the eight handlers, one per
//! [`EventKind`].  Handlers it leaves out fall back to
//! [`Modifier::on_default`], which itself does nothing unless overridden, so
//! a modifier that records everything only needs `on_default` and one that
//! clamps the integral only needs `on_modify_terms`.
//!
//! Each handler receives the event being dispatched and the controller that
//! dispatched it.  It answers with a [`Flow`]: [`Flow::Continue`] hands the
//! event to the next modifier, [`Flow::Stop`] ends propagation of this event
//! (later modifiers get a `HookStopped` notice instead).  Returning an error
//! aborts the operation that triggered the dispatch.
//!
//! # Example
//!
//! ```rust
//! use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
//! use hookpid_types::Gains;
//!
//! /// Never lets the output go negative.
//! struct NonNegative;
//!
//! impl Modifier for NonNegative {
//!     fn on_calculate_u(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
//!         if let Some(u) = event.u()? {
//!             event.set_u(u.max(0.0))?;
//!         }
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! let mut pid = Controller::new(Gains::new(10.0, 0.0, 0.0), vec![Box::new(NonNegative)]).unwrap();
//! assert_eq!(pid.compute(3.0, Some(1.0)).unwrap(), 0.0);
//! ```

use std::any::Any;

use hookpid_types::{ControllerId, EventKind, PidError, PidResult};

use crate::controller::Controller;
use crate::event::Event;

/// What the dispatcher should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Hand the event to the next modifier.
    Continue,
    /// End propagation of this event; later modifiers receive `HookStopped`.
    Stop,
}

/// Return type of every handler.
pub type HookResult = PidResult<Flow>;

/// A behaviour plug-in for a [`Controller`].
pub trait Modifier: Any {
    /// Name used in logs, errors and interruption payloads.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Fallback for every handler that is not overridden.
    fn on_default(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
        Ok(Flow::Continue)
    }

    fn on_attached(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_initial_conditions(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_setpoint_change(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_base_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_modify_terms(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_calculate_u(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_hook_stopped(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }

    fn on_failure(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        self.on_default(event, pid)
    }
}

/// Route `event` to the handler `modifier` provides for its kind.
pub fn handle(modifier: &mut dyn Modifier, event: &mut Event, pid: &mut Controller) -> HookResult {
    match event.kind() {
        EventKind::Attached => modifier.on_attached(event, pid),
        EventKind::InitialConditions => modifier.on_initial_conditions(event, pid),
        EventKind::SetpointChange => modifier.on_setpoint_change(event, pid),
        EventKind::BaseTerms => modifier.on_base_terms(event, pid),
        EventKind::ModifyTerms => modifier.on_modify_terms(event, pid),
        EventKind::CalculateU => modifier.on_calculate_u(event, pid),
        EventKind::HookStopped => modifier.on_hook_stopped(event, pid),
        EventKind::Failure => modifier.on_failure(event, pid),
    }
}

/// `crate::module::Type<Args>` → `Type`.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ────────────────────────────────────────────────────────────────────────────
// Single-owner check
// ────────────────────────────────────────────────────────────────────────────

/// Remembers which controller a single-owner modifier belongs to.
///
/// Modifiers with controller-specific state claim their owner from the
/// `Attached` event; attaching the same modifier again to that controller is
/// harmless, attaching it to another one is refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attachment(Option<ControllerId>);

impl Attachment {
    pub fn new() -> Self {
        Self(None)
    }

    /// Record `owner`, or fail if a different controller got here first.
    ///
    /// # Errors
    ///
    /// [`PidError::AttachmentConflict`] naming `modifier` and the existing
    /// owner.
    pub fn claim(&mut self, modifier: &str, owner: ControllerId) -> PidResult<()> {
        match self.0 {
            Some(existing) if existing != owner => Err(PidError::AttachmentConflict {
                modifier: modifier.to_string(),
                owner: existing,
            }),
            _ => {
                self.0 = Some(owner);
                Ok(())
            }
        }
    }

    pub fn owner(&self) -> Option<ControllerId> {
        self.0
    }
}
