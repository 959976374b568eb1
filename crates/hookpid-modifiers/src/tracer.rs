//! [`Tracer`] – log every event through `tracing`.

use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use tracing::debug;

/// Emits one `debug!` record per event it sees, tagged with `label`.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    label: String,
}

impl Tracer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Modifier for Tracer {
    fn on_default(&mut self, event: &mut Event, pid: &mut Controller) -> HookResult {
        let fields: Vec<String> = event
            .fields()
            .iter()
            .map(|(name, value)| match value {
                Some(v) => format!("{name}={v}"),
                None => format!("{name}=-"),
            })
            .collect();

        match event.interruption() {
            Some(why) => debug!(
                label = %self.label,
                controller = %event.owner(),
                kind = %event.kind(),
                depth = pid.nesting_depth(),
                by = why.modifier(),
                index = why.index(),
                error = ?why.error(),
                interrupted = %why.event().kind(),
                "hook event"
            ),
            None => debug!(
                label = %self.label,
                controller = %event.owner(),
                kind = %event.kind(),
                depth = pid.nesting_depth(),
                fields = %fields.join(" "),
                "hook event"
            ),
        }
        Ok(Flow::Continue)
    }
}
