use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::GateError;

/// A human decision the backend asks for mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionRequest {
    pub message: String,
    /// Ordered. The value sent back is the 1-based position as a decimal string.
    pub choices: Vec<String>,
}

struct PendingIntervention {
    request: InterventionRequest,
    responder: oneshot::Sender<String>,
}

/// Single-slot suspension point between the turn loop and whoever answers
/// the intervention (a person at the terminal, a test).
#[derive(Default)]
pub struct InterventionGate {
    slot: Mutex<Option<PendingIntervention>>,
}

/// The suspended side of an open gate.
pub struct GateWaiter {
    receiver: oneshot::Receiver<String>,
}

impl GateWaiter {
    /// Resolves with the encoded choice, or None if the gate was cancelled.
    pub async fn wait(self) -> Option<String> {
        self.receiver.await.ok()
    }
}

impl InterventionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate. Only one may be pending; opening over an existing one
    /// is a caller bug and cancels the older waiter.
    pub fn open(&self, request: InterventionRequest) -> GateWaiter {
        let (responder, receiver) = oneshot::channel();
        let mut slot = self.slot();
        if slot.is_some() {
            warn!("intervention opened while another was pending; cancelling the older one");
        }
        debug!(choices = request.choices.len(), "intervention gate opened");
        *slot = Some(PendingIntervention { request, responder });
        GateWaiter { receiver }
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    pub fn pending(&self) -> Option<InterventionRequest> {
        self.slot().as_ref().map(|pending| pending.request.clone())
    }

    /// Resolves with the choice at 0-based `index`. The gate is torn down
    /// before the waiter wakes. Returns the value handed to the waiter.
    pub fn resolve(&self, index: usize) -> Result<String, GateError> {
        let mut slot = self.slot();
        let available = slot
            .as_ref()
            .map(|pending| pending.request.choices.len())
            .ok_or(GateError::NothingPending)?;
        if index >= available {
            return Err(GateError::OutOfRange { index, available });
        }

        let pending = slot.take().ok_or(GateError::NothingPending)?;
        drop(slot);

        let choice = (index + 1).to_string();
        if pending.responder.send(choice.clone()).is_err() {
            debug!("intervention resolved after its run went away");
        }
        Ok(choice)
    }

    pub fn resolve_label(&self, label: &str) -> Result<String, GateError> {
        let index = self
            .slot()
            .as_ref()
            .ok_or(GateError::NothingPending)?
            .request
            .choices
            .iter()
            .position(|choice| choice == label)
            .ok_or_else(|| GateError::UnknownLabel(label.to_string()))?;
        self.resolve(index)
    }

    /// Drops the pending gate, waking its waiter with None.
    pub fn cancel(&self) -> bool {
        self.slot().take().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingIntervention>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
