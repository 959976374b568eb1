//! Per-field access discipline for hook events.
//!
//! Every event kind is described by one static [`Schema`]: the names of its
//! fields, their default values and which of them are declared read-only
//! (`"*"` declares all of them, with [`Schema::writable`] naming the
//! exceptions). [`Fields`] instantiates a schema and enforces it at runtime:
//!
//! | Declared | Value at creation | Resulting [`Access`] |
//! |---|---|---|
//! | read-only | present | [`Access::ReadOnly`] |
//! | read-only | absent | [`Access::WriteOnce`] |
//! | writable | any | [`Access::ReadWrite`] |
//!
//! # Example
//!
//! ```
//! use hookpid_core::field::{Fields, Schema};
//! use hookpid_types::{Access, EventKind};
//!
//! static SCHEMA: Schema = Schema {
//!     kind: EventKind::SetpointChange,
//!     fields: &["from", "to", "applied"],
//!     defaults: &[],
//!     read_only: &["from", "to"],
//!     writable: &[],
//! };
//!
//! let mut fields = Fields::new(&SCHEMA, &[("from", Some(1.0)), ("to", Some(2.0))]);
//! assert_eq!(fields.access("applied"), Some(Access::ReadWrite));
//! assert!(fields.set("to", 3.0).is_err());
//! fields.set("applied", 1.5).unwrap();
//! assert_eq!(fields.get("applied").unwrap(), Some(1.5));
//! ```

use hookpid_types::{Access, EventKind, PidError, PidResult, Real};

/// Static description of the fields carried by one event kind.
#[derive(Debug)]
pub struct Schema {
    pub kind: EventKind,
    /// Field names, in display order.
    pub fields: &'static [&'static str],
    /// Values used when the creator supplies none.
    pub defaults: &'static [(&'static str, Real)],
    /// Fields declared read-only; `"*"` means every field.
    pub read_only: &'static [&'static str],
    /// Exceptions to a `"*"` read-only declaration.
    pub writable: &'static [&'static str],
}

impl Schema {
    /// `true` when `name` is declared read-only by this schema.
    pub fn declares_read_only(&self, name: &str) -> bool {
        if self.writable.contains(&name) {
            return false;
        }
        self.read_only.contains(&"*") || self.read_only.contains(&name)
    }

    fn default_for(&self, name: &str) -> Option<Real> {
        self.defaults
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: &'static str,
    access: Access,
    value: Option<Real>,
}

/// Runtime instance of a [`Schema`]: named real-valued slots with enforced
/// access classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    kind: EventKind,
    slots: Vec<Slot>,
}

impl Fields {
    /// Instantiate `schema`.
    ///
    /// Values come from `initial` when present there (and `Some`), otherwise
    /// from the schema defaults, otherwise the field starts unset.  Names in
    /// `initial` that the schema does not declare are ignored.
    pub fn new(schema: &Schema, initial: &[(&str, Option<Real>)]) -> Self {
        let slots = schema
            .fields
            .iter()
            .map(|&name| {
                let value = initial
                    .iter()
                    .find(|(n, _)| *n == name)
                    .and_then(|(_, v)| *v)
                    .or_else(|| schema.default_for(name));
                let access = match (schema.declares_read_only(name), value) {
                    (true, Some(_)) => Access::ReadOnly,
                    (true, None) => Access::WriteOnce,
                    (false, _) => Access::ReadWrite,
                };
                Slot {
                    name,
                    access,
                    value,
                }
            })
            .collect();
        Self {
            kind: schema.kind,
            slots,
        }
    }

    /// Copy the current values into a fresh instance of `schema`.
    ///
    /// Access classes are re-established from the new schema; nothing is
    /// shared with `self`.
    pub fn clone_into(&self, schema: &Schema) -> Fields {
        let initial: Vec<(&str, Option<Real>)> =
            self.slots.iter().map(|s| (s.name, s.value)).collect();
        Fields::new(schema, &initial)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Read a field; an unset field reads as `None`.
    ///
    /// # Errors
    ///
    /// - [`PidError::Unset`] – the field is write-once and not written yet.
    /// - [`PidError::NoSuchField`] – the kind has no such field.
    pub fn get(&self, name: &str) -> PidResult<Option<Real>> {
        let slot = self.slot(name)?;
        match (slot.access, slot.value) {
            (Access::WriteOnce, None) => Err(self.unset(name)),
            (_, value) => Ok(value),
        }
    }

    /// Read a field that must hold a value.
    pub fn require(&self, name: &str) -> PidResult<Real> {
        self.get(name)?.ok_or_else(|| self.unset(name))
    }

    /// Write a field.
    ///
    /// # Errors
    ///
    /// - [`PidError::ReadOnly`] – the field is read-only.
    /// - [`PidError::AlreadyWritten`] – the field is write-once and was
    ///   already written.
    /// - [`PidError::NoSuchField`] – the kind has no such field.
    pub fn set(&mut self, name: &str, value: Real) -> PidResult<()> {
        let kind = self.kind;
        let slot = self.slot_mut(name)?;
        match slot.access {
            Access::ReadOnly => Err(PidError::ReadOnly {
                event: kind,
                field: name.to_string(),
            }),
            Access::WriteOnce if slot.value.is_some() => Err(PidError::AlreadyWritten {
                event: kind,
                field: name.to_string(),
            }),
            Access::WriteOnce | Access::ReadWrite => {
                slot.value = Some(value);
                Ok(())
            }
        }
    }

    /// `true` when the field exists and holds a value.  Never fails.
    pub fn is_set(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.name == name && s.value.is_some())
    }

    /// Access class of `name`, or `None` if the kind has no such field.
    pub fn access(&self, name: &str) -> Option<Access> {
        self.slots.iter().find(|s| s.name == name).map(|s| s.access)
    }

    /// Field names and raw values, bypassing access checks.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<Real>)> + '_ {
        self.slots.iter().map(|s| (s.name, s.value))
    }

    fn slot(&self, name: &str) -> PidResult<&Slot> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PidError::NoSuchField {
                event: self.kind,
                field: name.to_string(),
            })
    }

    fn slot_mut(&mut self, name: &str) -> PidResult<&mut Slot> {
        let kind = self.kind;
        self.slots
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| PidError::NoSuchField {
                event: kind,
                field: name.to_string(),
            })
    }

    fn unset(&self, name: &str) -> PidError {
        PidError::Unset {
            event: self.kind,
            field: name.to_string(),
        }
    }
}
