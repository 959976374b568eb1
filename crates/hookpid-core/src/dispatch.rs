//! Dispatcher – delivers one event to a controller's modifier chain.
//!
//! Modifiers are visited in chain order.  While a handler runs, its modifier
//! is lifted out of the chain so the handler can borrow the controller
//! mutably; any notification it triggers (a ramp moving the setpoint, say)
//! reaches every other modifier but skips the one that caused it.
//!
//! | Handler returns | Dispatcher |
//! |---|---|
//! | `Ok(Flow::Continue)` | next modifier |
//! | `Ok(Flow::Stop)` | sends `HookStopped` to the modifiers after the stopper, then returns the event |
//! | `Err(e)` | sends `Failure` to the modifiers after the offender (best effort), then returns `PidError::Modifier` wrapping `e` |

use std::ops::Range;

use hookpid_types::{PidError, PidResult};
use tracing::{debug, trace, trace_span, warn};

use crate::controller::Controller;
use crate::event::Event;
use crate::modifier::{Flow, Modifier, handle};

/// Ordered modifier slots plus their names.
///
/// A slot is empty while its modifier is executing a handler further up the
/// call stack.
pub(crate) struct Chain {
    slots: Vec<Option<Box<dyn Modifier>>>,
    names: Vec<String>,
}

impl Chain {
    pub(crate) fn new(modifiers: Vec<Box<dyn Modifier>>) -> Self {
        let names = modifiers.iter().map(|m| m.name().to_string()).collect();
        Self {
            slots: modifiers.into_iter().map(Some).collect(),
            names,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    /// Modifiers not currently executing a handler.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &(dyn Modifier + 'static)> {
        self.slots.iter().flatten().map(|m| m.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Modifier + 'static)> {
        self.slots.iter_mut().flatten().map(|m| m.as_mut())
    }

    fn take(&mut self, index: usize) -> Option<Box<dyn Modifier>> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    fn restore(&mut self, index: usize, modifier: Box<dyn Modifier>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(modifier);
        }
    }

    fn remaining(&self, range: Range<usize>) -> Vec<String> {
        self.names.get(range).map(<[String]>::to_vec).unwrap_or_default()
    }
}

impl Controller {
    /// Dispatch `event` to the whole chain and return it as the last
    /// modifier left it.
    ///
    /// # Errors
    ///
    /// The first handler failure, wrapped in [`PidError::Modifier`].  A
    /// `Flow::Stop` is not an error.
    pub fn notify(&mut self, event: Event) -> PidResult<Event> {
        let end = self.chain.len();
        self.notify_range(event, 0..end)
    }

    fn notify_range(&mut self, mut event: Event, range: Range<usize>) -> PidResult<Event> {
        self.depth += 1;
        let span = trace_span!("notify", kind = %event.kind(), depth = self.depth);
        let outcome = span.in_scope(|| self.propagate(&mut event, range));
        self.depth -= 1;
        outcome.map(|()| event)
    }

    fn propagate(&mut self, event: &mut Event, range: Range<usize>) -> PidResult<()> {
        let end = range.end;
        for index in range {
            let Some(mut modifier) = self.chain.take(index) else {
                trace!(index, "modifier busy higher up the stack; skipped");
                continue;
            };
            trace!(index, handler = event.kind().handler_name(), "dispatching");
            let outcome = handle(modifier.as_mut(), event, self);
            self.chain.restore(index, modifier);

            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => return self.stopped(event, index, end),
                Err(err) => return Err(self.failed(event, err, index, end)),
            }
        }
        Ok(())
    }

    fn stopped(&mut self, event: &Event, index: usize, end: usize) -> PidResult<()> {
        let name = self.chain.names[index].clone();
        debug!(modifier = %name, index, event = %event.kind(), "propagation stopped");

        let remaining = self.chain.remaining(index + 1..end);
        let notice = Event::hook_stopped(self.id(), event.clone(), name, index, remaining);
        self.notify_range(notice, index + 1..end).map(|_| ())
    }

    fn failed(&mut self, event: &Event, err: PidError, index: usize, end: usize) -> PidError {
        let name = self.chain.names[index].clone();
        warn!(
            modifier = %name,
            index,
            handler = event.kind().handler_name(),
            error = %err,
            "modifier failed"
        );

        let remaining = self.chain.remaining(index + 1..end);
        let notice = Event::failure(
            self.id(),
            event.clone(),
            err.clone(),
            name.clone(),
            index,
            remaining,
        );
        if let Err(secondary) = self.notify_range(notice, index + 1..end) {
            warn!(modifier = %name, error = %secondary, "failure notification failed; discarded");
        }

        PidError::Modifier {
            modifier: name,
            index,
            event: event.kind(),
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::names::{P, U};
    use crate::modifier::HookResult;
    use hookpid_types::{EventKind, Gains};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records `"<label>:<Kind>"` for every event and reacts to one kind.
    struct Probe {
        label: &'static str,
        log: Log,
        on: Option<EventKind>,
        reaction: Reaction,
    }

    #[derive(Clone, Copy)]
    enum Reaction {
        Nothing,
        Stop,
        Fail,
        WriteP,
        Depth,
    }

    impl Probe {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: Rc::clone(log),
                on: None,
                reaction: Reaction::Nothing,
            }
        }

        fn on(mut self, kind: EventKind, reaction: Reaction) -> Self {
            self.on = Some(kind);
            self.reaction = reaction;
            self
        }
    }

    impl Modifier for Probe {
        fn name(&self) -> &str {
            self.label
        }

        fn on_default(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.label, event.kind()));
            if self.on != Some(event.kind()) {
                return Ok(Flow::Continue);
            }
            match self.reaction {
                Reaction::Nothing => Ok(Flow::Continue),
                Reaction::Stop => Ok(Flow::Stop),
                Reaction::Fail => Err(PidError::Fault(format!("{} broke", self.label))),
                Reaction::WriteP => {
                    event.set(P, 100.0)?;
                    Ok(Flow::Continue)
                }
                Reaction::Depth => {
                    self.log
                        .borrow_mut()
                        .push(format!("depth={}", pid.nesting_depth()));
                    Ok(Flow::Continue)
                }
            }
        }
    }

    fn controller(probes: Vec<Probe>) -> Controller {
        let chain = probes
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn Modifier>)
            .collect();
        Controller::new(Gains::new(1.0, 0.0, 0.0), chain).unwrap()
    }

    fn entries(log: &Log, kind: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|l| l.ends_with(kind))
            .cloned()
            .collect()
    }

    #[test]
    fn events_visit_modifiers_in_chain_order() {
        let log = Log::default();
        let mut pid = controller(vec![Probe::new("a", &log), Probe::new("b", &log)]);
        log.borrow_mut().clear();

        pid.compute(0.0, Some(1.0)).unwrap();
        assert_eq!(
            *log.borrow(),
            [
                "a:BaseTerms",
                "b:BaseTerms",
                "a:ModifyTerms",
                "b:ModifyTerms",
                "a:CalculateU",
                "b:CalculateU",
            ]
        );
    }

    #[test]
    fn stop_sends_exactly_one_hook_stopped_to_each_later_modifier() {
        let log = Log::default();
        let mut pid = controller(vec![
            Probe::new("a", &log),
            Probe::new("stopper", &log).on(EventKind::ModifyTerms, Reaction::Stop),
            Probe::new("c", &log),
            Probe::new("d", &log),
        ]);
        log.borrow_mut().clear();

        pid.compute(0.0, Some(1.0)).unwrap();

        assert_eq!(
            entries(&log, ":ModifyTerms"),
            ["a:ModifyTerms", "stopper:ModifyTerms"]
        );
        assert_eq!(
            entries(&log, ":HookStopped"),
            ["c:HookStopped", "d:HookStopped"]
        );
        // The pipeline carries on with the next phase.
        assert_eq!(entries(&log, ":CalculateU").len(), 4);
    }

    #[test]
    fn hook_stopped_payload_describes_the_stop() {
        let log = Log::default();
        let mut pid = controller(vec![
            Probe::new("stopper", &log).on(EventKind::SetpointChange, Reaction::Stop),
            Probe::new("late", &log),
        ]);

        let sent = Event::setpoint_change(pid.id(), 0.0, 4.0);
        let returned = pid.notify(sent.clone()).unwrap();
        assert_eq!(returned, sent);

        struct Capture(Option<Event>);
        impl Modifier for Capture {
            fn on_hook_stopped(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
                self.0 = Some(event.clone());
                Ok(Flow::Continue)
            }
        }
        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![
                Box::new(Probe::new("stopper", &log).on(EventKind::BaseTerms, Reaction::Stop)),
                Box::new(Capture(None)),
                Box::new(Probe::new("tail", &log)),
            ],
        )
        .unwrap();
        pid.compute(0.0, Some(1.0)).unwrap();

        let capture = pid.find_modifier::<Capture>().unwrap();
        let notice = capture.0.as_ref().unwrap();
        let why = notice.interruption().unwrap();
        assert_eq!(notice.owner(), pid.id());
        assert_eq!(why.event().kind(), EventKind::BaseTerms);
        assert_eq!(why.modifier(), "stopper");
        assert_eq!(why.index(), 0);
        assert_eq!(why.remaining(), ["Capture".to_string(), "tail".to_string()]);
        assert!(why.error().is_none());
    }

    #[test]
    fn failure_is_reported_downstream_and_re_raised() {
        let log = Log::default();
        let mut pid = controller(vec![
            Probe::new("a", &log),
            Probe::new("broken", &log).on(EventKind::ModifyTerms, Reaction::Fail),
            Probe::new("c", &log),
        ]);
        log.borrow_mut().clear();

        let err = pid.compute(0.0, Some(1.0)).unwrap_err();
        match &err {
            PidError::Modifier {
                modifier,
                index,
                event,
                source,
            } => {
                assert_eq!(modifier, "broken");
                assert_eq!(*index, 1);
                assert_eq!(*event, EventKind::ModifyTerms);
                assert_eq!(**source, PidError::Fault("broken broke".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(entries(&log, ":Failure"), ["c:Failure"]);
        assert!(entries(&log, ":ModifyTerms").iter().all(|l| !l.starts_with("c:")));
        assert!(entries(&log, ":CalculateU").is_empty());
    }

    #[test]
    fn secondary_failure_does_not_replace_the_original() {
        let log = Log::default();
        let mut pid = controller(vec![
            Probe::new("first", &log).on(EventKind::CalculateU, Reaction::Fail),
            Probe::new("second", &log).on(EventKind::Failure, Reaction::Fail),
            Probe::new("third", &log),
        ]);
        log.borrow_mut().clear();

        let err = pid.compute(0.0, Some(1.0)).unwrap_err();
        assert_eq!(err.root_cause(), &PidError::Fault("first broke".to_string()));
        // `second` failing on the Failure notice still informs `third`.
        assert_eq!(
            entries(&log, ":Failure"),
            ["second:Failure", "third:Failure"]
        );
        assert_eq!(pid.nesting_depth(), 0);
    }

    #[test]
    fn access_violation_in_a_handler_names_the_modifier() {
        let log = Log::default();
        let mut pid = controller(vec![
            Probe::new("writer", &log).on(EventKind::CalculateU, Reaction::WriteP),
        ]);
        let err = pid.compute(0.0, Some(1.0)).unwrap_err();
        assert!(err.is_access_violation());
        assert!(err.to_string().contains("writer"));
    }

    #[test]
    fn depth_counts_nested_notifications() {
        struct Mover;
        impl Modifier for Mover {
            fn on_base_terms(&mut self, _event: &mut Event, pid: &mut Controller) -> HookResult {
                pid.set_setpoint(pid.setpoint() + 1.0)?;
                Ok(Flow::Continue)
            }
        }

        let log = Log::default();
        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![
                Box::new(Mover),
                Box::new(Probe::new("depth", &log).on(EventKind::SetpointChange, Reaction::Depth)),
            ],
        )
        .unwrap();
        assert_eq!(pid.nesting_depth(), 0);
        log.borrow_mut().clear();

        pid.compute(0.0, Some(1.0)).unwrap();
        assert!(log.borrow().contains(&"depth=2".to_string()));
        assert_eq!(pid.nesting_depth(), 0);
        assert_eq!(pid.setpoint(), 1.0);
    }

    #[test]
    fn nested_notification_skips_the_triggering_modifier() {
        struct SelfAware {
            seen_change: bool,
        }
        impl Modifier for SelfAware {
            fn on_setpoint_change(&mut self, _event: &mut Event, _pid: &mut Controller) -> HookResult {
                self.seen_change = true;
                Ok(Flow::Continue)
            }
            fn on_base_terms(&mut self, _event: &mut Event, pid: &mut Controller) -> HookResult {
                pid.set_setpoint(7.0)?;
                Ok(Flow::Continue)
            }
        }

        let mut pid = Controller::new(
            Gains::new(1.0, 0.0, 0.0),
            vec![Box::new(SelfAware { seen_change: false })],
        )
        .unwrap();
        assert_eq!(pid.compute(0.0, Some(1.0)).unwrap(), 7.0);
        assert!(!pid.find_modifier::<SelfAware>().unwrap().seen_change);
    }

    #[test]
    fn notify_returns_the_modified_event() {
        struct Halve;
        impl Modifier for Halve {
            fn on_calculate_u(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
                let u = event.require(U)?;
                event.set(U, u / 2.0)?;
                Ok(Flow::Continue)
            }
        }
        let mut pid = Controller::new(Gains::new(1.0, 0.0, 0.0), vec![Box::new(Halve)]).unwrap();
        assert_eq!(pid.compute(-4.0, Some(1.0)).unwrap(), 2.0);
    }
}
