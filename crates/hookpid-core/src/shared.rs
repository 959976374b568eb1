//! [`Shared`] – one modifier instance used by several chains.
//!
//! A chain normally owns its modifiers outright.  Wrapping a modifier in
//! `Shared` makes the sharing explicit: every clone of the handle forwards
//! to the same instance, and the caller keeps a handle to inspect or retune
//! it between computations.  A shared modifier that is re-entered while one
//! of its handlers is still running answers [`PidError::Busy`].
//!
//! Placing two clones of one handle in the *same* chain is unsupported: the
//! dispatcher only skips the slot that is running, so any notification the
//! modifier triggers reaches the second slot and fails with `Busy`.
//!
//! ```rust
//! use hookpid_core::{Controller, Event, Flow, HookResult, Modifier, Shared};
//! use hookpid_types::Gains;
//!
//! #[derive(Default)]
//! struct Ticks(usize);
//!
//! impl Modifier for Ticks {
//!     fn on_base_terms(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
//!         self.0 += 1;
//!         Ok(Flow::Continue)
//!     }
//! }
//!
//! let ticks = Shared::new(Ticks::default());
//! let gains = Gains::new(1.0, 0.0, 0.0);
//! let mut a = Controller::new(gains, vec![Box::new(ticks.clone())]).unwrap();
//! let mut b = Controller::new(gains, vec![Box::new(ticks.clone())]).unwrap();
//! a.compute(0.0, Some(1.0)).unwrap();
//! b.compute(0.0, Some(1.0)).unwrap();
//! assert_eq!(ticks.borrow().0, 2);
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use hookpid_types::PidError;

use crate::controller::Controller;
use crate::event::Event;
use crate::modifier::{HookResult, Modifier, handle};

/// Reference-counted handle to a modifier shared between chains.
pub struct Shared<M> {
    inner: Rc<RefCell<M>>,
    name: String,
}

impl<M: Modifier> Shared<M> {
    pub fn new(modifier: M) -> Self {
        let name = modifier.name().to_string();
        Self {
            inner: Rc::new(RefCell::new(modifier)),
            name,
        }
    }

    /// Borrow the wrapped modifier.
    ///
    /// # Panics
    ///
    /// When called from inside one of the modifier's own handlers.
    pub fn borrow(&self) -> Ref<'_, M> {
        self.inner.borrow()
    }

    /// Mutably borrow the wrapped modifier.
    ///
    /// # Panics
    ///
    /// When called from inside one of the modifier's own handlers.
    pub fn borrow_mut(&self) -> RefMut<'_, M> {
        self.inner.borrow_mut()
    }

    /// Number of live handles, this one included.
    pub fn handles(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl<M> Clone for Shared<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            name: self.name.clone(),
        }
    }
}

impl<M> std::fmt::Debug for Shared<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("name", &self.name)
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}

impl<M: Modifier> Modifier for Shared<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_default(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        let mut inner = self.inner.try_borrow_mut().map_err(|_| PidError::Busy {
            modifier: self.name.clone(),
        })?;
        handle(&mut *inner, event, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Flow;
    use hookpid_types::{EventKind, Gains};

    #[derive(Default)]
    struct Seen(Vec<EventKind>);

    impl Modifier for Seen {
        fn on_default(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
            self.0.push(event.kind());
            Ok(Flow::Continue)
        }
    }

    /// Moves the setpoint from inside `BaseTerms`, which re-enters the chain.
    struct Nudge;

    impl Modifier for Nudge {
        fn on_base_terms(&mut self, _event: &mut Event, pid: &mut Controller) -> HookResult {
            let next = pid.setpoint() + 1.0;
            pid.set_setpoint(next)?;
            Ok(Flow::Continue)
        }
    }

    #[test]
    fn name_is_taken_from_the_wrapped_modifier() {
        let shared = Shared::new(Seen::default());
        assert_eq!(shared.name(), "Seen");
        assert_eq!(shared.clone().name(), "Seen");
        assert_eq!(shared.handles(), 1);
    }

    #[test]
    fn specific_handlers_reach_the_wrapped_modifier() {
        let seen = Shared::new(Seen::default());
        let mut pid = Controller::new(Gains::new(1.0, 0.0, 0.0), vec![Box::new(seen.clone())]).unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(
            seen.borrow().0,
            vec![
                EventKind::Attached,
                EventKind::InitialConditions,
                EventKind::BaseTerms,
                EventKind::ModifyTerms,
                EventKind::CalculateU,
            ]
        );
    }

    #[test]
    fn reentering_a_shared_modifier_is_busy() {
        // The same shared instance sits twice in one chain; the nested
        // setpoint change reaches the second copy while the first is running.
        let nudge = Shared::new(Nudge);
        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![Box::new(nudge.clone()), Box::new(nudge.clone())],
        )
        .unwrap();

        let err = pid.compute(0.0, Some(1.0)).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &PidError::Busy {
                modifier: "Nudge".to_string()
            }
        );
    }
}
