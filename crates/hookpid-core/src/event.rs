//! [`Event`] – the record threaded through a modifier chain at each hook
//! point.
//!
//! An event is created right before a dispatch round, handed to every
//! modifier in order (each sees the changes made by the ones before it) and
//! dropped afterwards.  The three calculation phases are linked by
//! [`Event::clone_into`]: the surviving values of `BaseTerms` seed
//! `ModifyTerms`, whose values seed `CalculateU`, with access classes taken
//! fresh from the next kind's schema.
//!
//! | Kind | Fields | Read-only |
//! |---|---|---|
//! | `Attached` | – | – |
//! | `InitialConditions` | `pv`, `setpoint` | all |
//! | `SetpointChange` | `from`, `to`, `applied` | `from`, `to` |
//! | `BaseTerms` | `e`, `p`, `i`, `d`, `u`, `dt` | `dt` |
//! | `ModifyTerms` | `e`, `p`, `i`, `d`, `u`, `dt` | `e`, `dt` |
//! | `CalculateU` | `e`, `p`, `i`, `d`, `u`, `dt` | all but `u` |
//! | `HookStopped` | [`Interruption`] | all |
//! | `Failure` | [`Interruption`] with error | all |
//!
//! The owning controller's id is part of every event and has no setter.

use hookpid_types::{Access, ControllerId, EventKind, PidError, PidResult, Real};

use crate::field::{Fields, Schema};

/// Field names used by the built-in event kinds.
pub mod names {
    pub const E: &str = "e";
    pub const P: &str = "p";
    pub const I: &str = "i";
    pub const D: &str = "d";
    pub const U: &str = "u";
    pub const DT: &str = "dt";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const APPLIED: &str = "applied";
    pub const PV: &str = "pv";
    pub const SETPOINT: &str = "setpoint";
}

use names::*;

const TERM_FIELDS: &[&str] = &[E, P, I, D, U, DT];

static ATTACHED: Schema = Schema {
    kind: EventKind::Attached,
    fields: &[],
    defaults: &[],
    read_only: &["*"],
    writable: &[],
};

static INITIAL_CONDITIONS: Schema = Schema {
    kind: EventKind::InitialConditions,
    fields: &[PV, SETPOINT],
    defaults: &[],
    read_only: &["*"],
    writable: &[],
};

static SETPOINT_CHANGE: Schema = Schema {
    kind: EventKind::SetpointChange,
    fields: &[FROM, TO, APPLIED],
    defaults: &[],
    read_only: &[FROM, TO],
    writable: &[],
};

static BASE_TERMS: Schema = Schema {
    kind: EventKind::BaseTerms,
    fields: TERM_FIELDS,
    defaults: &[],
    read_only: &[DT],
    writable: &[],
};

static MODIFY_TERMS: Schema = Schema {
    kind: EventKind::ModifyTerms,
    fields: TERM_FIELDS,
    defaults: &[],
    read_only: &[E, DT],
    writable: &[],
};

static CALCULATE_U: Schema = Schema {
    kind: EventKind::CalculateU,
    fields: TERM_FIELDS,
    defaults: &[],
    read_only: &["*"],
    writable: &[U],
};

static HOOK_STOPPED: Schema = Schema {
    kind: EventKind::HookStopped,
    fields: &[],
    defaults: &[],
    read_only: &["*"],
    writable: &[],
};

static FAILURE: Schema = Schema {
    kind: EventKind::Failure,
    fields: &[],
    defaults: &[],
    read_only: &["*"],
    writable: &[],
};

/// Schema of a built-in event kind.
pub fn schema(kind: EventKind) -> &'static Schema {
    match kind {
        EventKind::Attached => &ATTACHED,
        EventKind::InitialConditions => &INITIAL_CONDITIONS,
        EventKind::SetpointChange => &SETPOINT_CHANGE,
        EventKind::BaseTerms => &BASE_TERMS,
        EventKind::ModifyTerms => &MODIFY_TERMS,
        EventKind::CalculateU => &CALCULATE_U,
        EventKind::HookStopped => &HOOK_STOPPED,
        EventKind::Failure => &FAILURE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Interruption payload
// ────────────────────────────────────────────────────────────────────────────

/// Why propagation of an event ended early: carried by `HookStopped` and
/// `Failure` events.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Interruption {
    event: Event,
    modifier: String,
    index: usize,
    remaining: Vec<String>,
    error: Option<PidError>,
}

impl Interruption {
    /// Snapshot of the event as it was when propagation ended.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Name of the modifier that stopped or failed.
    pub fn modifier(&self) -> &str {
        &self.modifier
    }

    /// Chain position of that modifier.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Names of the modifiers that never saw the original event.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// The failure, for `Failure` events.
    pub fn error(&self) -> Option<&PidError> {
        self.error.as_ref()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Event
// ────────────────────────────────────────────────────────────────────────────

macro_rules! real_fields {
    ($($get:ident / $set:ident => $name:literal),* $(,)?) => {
        $(
            #[doc = concat!("Value of `", $name, "`; `None` while unset.")]
            pub fn $get(&self) -> PidResult<Option<Real>> {
                self.get($name)
            }

            #[doc = concat!("Write `", $name, "`, subject to its access class.")]
            pub fn $set(&mut self, value: Real) -> PidResult<()> {
                self.set($name, value)
            }
        )*
    };
}

/// One hook notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    owner: ControllerId,
    fields: Fields,
    interruption: Option<Box<Interruption>>,
}

impl Event {
    /// Build an event of any kind from raw initial values.
    pub fn new(kind: EventKind, owner: ControllerId, initial: &[(&str, Option<Real>)]) -> Self {
        Self {
            owner,
            fields: Fields::new(schema(kind), initial),
            interruption: None,
        }
    }

    pub fn attached(owner: ControllerId) -> Self {
        Self::new(EventKind::Attached, owner, &[])
    }

    /// `pv` and `setpoint` carry what the caller asked for; omitted values
    /// stay unset (and therefore write-once).
    pub fn initial_conditions(owner: ControllerId, pv: Option<Real>, setpoint: Option<Real>) -> Self {
        Self::new(
            EventKind::InitialConditions,
            owner,
            &[(PV, pv), (SETPOINT, setpoint)],
        )
    }

    pub fn setpoint_change(owner: ControllerId, from: Real, to: Real) -> Self {
        Self::new(
            EventKind::SetpointChange,
            owner,
            &[(FROM, Some(from)), (TO, Some(to))],
        )
    }

    pub fn base_terms(owner: ControllerId, dt: Real) -> Self {
        Self::new(EventKind::BaseTerms, owner, &[(DT, Some(dt))])
    }

    pub fn hook_stopped(
        owner: ControllerId,
        stopped: Event,
        modifier: String,
        index: usize,
        remaining: Vec<String>,
    ) -> Self {
        Self::interrupted(
            EventKind::HookStopped,
            owner,
            Interruption {
                event: stopped,
                modifier,
                index,
                remaining,
                error: None,
            },
        )
    }

    pub fn failure(
        owner: ControllerId,
        failed: Event,
        error: PidError,
        modifier: String,
        index: usize,
        remaining: Vec<String>,
    ) -> Self {
        Self::interrupted(
            EventKind::Failure,
            owner,
            Interruption {
                event: failed,
                modifier,
                index,
                remaining,
                error: Some(error),
            },
        )
    }

    fn interrupted(kind: EventKind, owner: ControllerId, interruption: Interruption) -> Self {
        Self {
            owner,
            fields: Fields::new(schema(kind), &[]),
            interruption: Some(Box::new(interruption)),
        }
    }

    /// Carry this event's field values into a new event of `kind`.
    ///
    /// The owner is kept, access classes come from the new kind's schema and
    /// any interruption payload is dropped.
    pub fn clone_into(&self, kind: EventKind) -> Event {
        Self {
            owner: self.owner,
            fields: self.fields.clone_into(schema(kind)),
            interruption: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.fields.kind()
    }

    /// Id of the controller that created this event.
    pub fn owner(&self) -> ControllerId {
        self.owner
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Payload of `HookStopped` and `Failure` events.
    pub fn interruption(&self) -> Option<&Interruption> {
        self.interruption.as_deref()
    }

    /// See [`Fields::get`].
    pub fn get(&self, name: &str) -> PidResult<Option<Real>> {
        self.fields.get(name)
    }

    /// See [`Fields::require`].
    pub fn require(&self, name: &str) -> PidResult<Real> {
        self.fields.require(name)
    }

    /// See [`Fields::set`].
    pub fn set(&mut self, name: &str, value: Real) -> PidResult<()> {
        self.fields.set(name, value)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.is_set(name)
    }

    pub fn access(&self, name: &str) -> Option<Access> {
        self.fields.access(name)
    }

    real_fields! {
        e / set_e => "e",
        p / set_p => "p",
        i / set_i => "i",
        d / set_d => "d",
        u / set_u => "u",
        applied / set_applied => "applied",
    }

    /// Interval of a calculation phase.
    pub fn dt(&self) -> PidResult<Option<Real>> {
        self.get(DT)
    }

    /// Setpoint before a `SetpointChange`.
    pub fn from(&self) -> PidResult<Option<Real>> {
        self.get(FROM)
    }

    /// Requested setpoint of a `SetpointChange`.
    pub fn to(&self) -> PidResult<Option<Real>> {
        self.get(TO)
    }

    /// Process variable passed to `initial_conditions`.
    pub fn pv(&self) -> PidResult<Option<Real>> {
        self.get(PV)
    }

    /// Raw setpoint passed to `initial_conditions`.
    pub fn setpoint(&self) -> PidResult<Option<Real>> {
        self.get(SETPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ControllerId {
        ControllerId::new()
    }

    /// Every calculation-phase event with all term fields populated.
    fn populated(kind: EventKind) -> Event {
        let mut base = Event::base_terms(owner(), 0.5);
        for (name, v) in [(E, 1.0), (P, 2.0), (I, 3.0), (D, 4.0), (U, 5.0)] {
            base.set(name, v).unwrap();
        }
        base.clone_into(kind)
    }

    #[test]
    fn base_terms_is_open_except_dt() {
        let mut ev = Event::base_terms(owner(), 0.1);
        for name in [E, P, I, D, U] {
            assert_eq!(ev.access(name), Some(Access::ReadWrite));
            assert_eq!(ev.get(name).unwrap(), None);
        }
        assert_eq!(ev.dt().unwrap(), Some(0.1));
        assert!(matches!(ev.set(DT, 1.0), Err(PidError::ReadOnly { .. })));
    }

    #[test]
    fn modify_terms_locks_e_and_dt() {
        let mut ev = populated(EventKind::ModifyTerms);
        assert_eq!(ev.kind(), EventKind::ModifyTerms);
        assert!(ev.set_e(0.0).is_err());
        assert!(ev.set(DT, 0.0).is_err());
        for name in [P, I, D, U] {
            ev.set(name, 9.0).unwrap();
        }
        assert_eq!(ev.e().unwrap(), Some(1.0));
    }

    #[test]
    fn calculate_u_only_accepts_u() {
        let mut ev = populated(EventKind::CalculateU);
        for name in [E, P, I, D, DT] {
            let err = ev.set(name, 0.0).unwrap_err();
            assert!(err.is_access_violation(), "{name} should be locked");
        }
        ev.set_u(-1.0).unwrap();
        ev.set_u(-2.0).unwrap();
        assert_eq!(ev.u().unwrap(), Some(-2.0));
    }

    #[test]
    fn every_declared_read_only_field_rejects_writes() {
        let id = owner();
        let samples = [
            Event::attached(id),
            Event::initial_conditions(id, Some(1.0), Some(2.0)),
            Event::setpoint_change(id, 1.0, 2.0),
            populated(EventKind::BaseTerms),
            populated(EventKind::ModifyTerms),
            populated(EventKind::CalculateU),
        ];
        for ev in samples {
            let schema = schema(ev.kind());
            for name in schema.fields.iter().filter(|n| schema.declares_read_only(n)) {
                let mut copy = ev.clone();
                assert!(
                    copy.set(name, 42.0).is_err(),
                    "{}.{} accepted a write",
                    ev.kind(),
                    name
                );
            }
        }
    }

    #[test]
    fn omitted_initial_condition_is_write_once() {
        let mut ev = Event::initial_conditions(owner(), Some(3.0), None);
        assert_eq!(ev.pv().unwrap(), Some(3.0));
        assert!(!ev.is_set(SETPOINT));
        assert!(matches!(ev.setpoint(), Err(PidError::Unset { .. })));
        ev.set(SETPOINT, 1.0).unwrap();
        assert!(matches!(
            ev.set(SETPOINT, 2.0),
            Err(PidError::AlreadyWritten { .. })
        ));
    }

    #[test]
    fn setpoint_change_applied_defaults_unset() {
        let mut ev = Event::setpoint_change(owner(), 0.0, 10.0);
        assert_eq!(ev.applied().unwrap(), None);
        assert!(ev.set(TO, 5.0).is_err());
        ev.set_applied(5.0).unwrap();
        assert_eq!(ev.applied().unwrap(), Some(5.0));
    }

    #[test]
    fn clone_into_keeps_owner_and_values() {
        let base = populated(EventKind::BaseTerms);
        let next = base.clone_into(EventKind::ModifyTerms);
        assert_eq!(next.owner(), base.owner());
        assert_eq!(next.p().unwrap(), Some(2.0));
        assert_eq!(next.dt().unwrap(), Some(0.5));
    }

    #[test]
    fn interruption_payload_is_exposed() {
        let id = owner();
        let stopped = Event::setpoint_change(id, 0.0, 1.0);
        let ev = Event::failure(
            id,
            stopped.clone(),
            PidError::Fault("boom".to_string()),
            "Broken".to_string(),
            1,
            vec!["After".to_string()],
        );
        let why = ev.interruption().unwrap();
        assert_eq!(why.event(), &stopped);
        assert_eq!(why.modifier(), "Broken");
        assert_eq!(why.index(), 1);
        assert_eq!(why.remaining(), ["After".to_string()]);
        assert_eq!(why.error(), Some(&PidError::Fault("boom".to_string())));
        assert!(Event::attached(id).interruption().is_none());
    }
}
