use crate::core::gate::ConfirmationGate;
use crate::models::task_request::TaskSettings;
use crate::models::task_status::TaskEvent;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// What a running worker needs from its caller: somewhere to send events,
/// the gate it parks on, and the knobs it was started with.
#[derive(Clone)]
pub struct TaskContext {
    events: Sender<TaskEvent>,
    pub gate: Arc<ConfirmationGate>,
    pub settings: TaskSettings,
}

impl TaskContext {
    pub fn new(
        events: Sender<TaskEvent>,
        gate: Arc<ConfirmationGate>,
        settings: TaskSettings,
    ) -> Self {
        Self {
            events,
            gate,
            settings,
        }
    }

    /// Never blocks. A caller that went away only loses the event.
    pub fn emit(&self, event: TaskEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    pub fn progress(&self, message: impl Into<String>, error: bool) {
        self.emit(TaskEvent::Progress {
            message: message.into(),
            error,
        });
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(TaskEvent::Status(message.into()));
    }
}
