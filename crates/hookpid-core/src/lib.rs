//! `hookpid-core` – hook-event engine of the hookpid workspace.
//!
//! A [`Controller`] computes PID outputs in three phases and, at each phase
//! and at every lifecycle step, dispatches an [`Event`] to its ordered chain
//! of [`Modifier`]s.  Each event kind carries a fixed set of fields with an
//! enforced access class (see [`field`]), so a modifier can only change what
//! that phase allows it to.
//!
//! | Module | Contents |
//! |---|---|
//! | [`field`] | `Schema` / `Fields`: read-only, write-once and read-write slots |
//! | [`event`] | `Event`, per-kind schemas, `Interruption` |
//! | [`modifier`] | `Modifier` trait, `Flow`, `Attachment` |
//! | [`shared`] | `Shared<M>` for modifiers used by several chains |
//! | `dispatch` | `Controller::notify`: ordering, `HookStopped`, `Failure` |
//! | [`controller`] | `Controller` state and calculation pipeline |
//! | [`terms`] | built-in error / integral / derivative formulas |

pub mod controller;
mod dispatch;
pub mod event;
pub mod field;
pub mod modifier;
pub mod shared;
pub mod terms;

pub use controller::Controller;
pub use event::{Event, Interruption};
pub use field::{Fields, Schema};
pub use modifier::{Attachment, Flow, HookResult, Modifier, handle};
pub use shared::Shared;
