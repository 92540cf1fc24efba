use super::Alert;
use crate::error::GatewayError;
use crate::gateway::{PatchOutcome, PropertyStore};
use crate::normalize::PatchPayload;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the engine's in-flight marker. Dropping it clears the marker, so a save that is
/// abandoned (dropped, or cancelled mid-request) never locks the form.
#[derive(Debug)]
pub(super) struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Takes the marker, or `None` when a save already holds it.
    pub(super) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A save that has been started but not sent.
///
/// Holds its own handle to the store, so the engine stays free for rendering and edits while
/// the patch is in flight.
pub struct PendingSave<S: PropertyStore> {
    store: Arc<S>,
    object_id: String,
    payload: PatchPayload,
    in_flight: InFlight,
}

impl<S: PropertyStore> PendingSave<S> {
    pub(super) fn new(
        store: Arc<S>,
        object_id: String,
        payload: PatchPayload,
        in_flight: InFlight,
    ) -> Self {
        Self {
            store,
            object_id,
            payload,
            in_flight,
        }
    }

    /// The normalized values about to be patched.
    pub fn payload(&self) -> &PatchPayload {
        &self.payload
    }

    pub async fn send(self) -> SaveAttempt {
        let result = self.store.patch_values(&self.object_id, &self.payload).await;
        SaveAttempt {
            payload: self.payload,
            result,
            _in_flight: self.in_flight,
        }
    }
}

/// A sent save, waiting to be settled by the engine.
///
/// Dropping it unsettled releases the in-flight marker and leaves the edits dirty.
#[derive(Debug)]
pub struct SaveAttempt {
    payload: PatchPayload,
    result: Result<PatchOutcome, GatewayError>,
    _in_flight: InFlight,
}

impl SaveAttempt {
    pub(super) fn into_parts(self) -> (PatchPayload, Result<PatchOutcome, GatewayError>) {
        (self.payload, self.result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The remote accepted the patch.
    Saved { keys: Vec<String>, result: JsonValue },
    /// The remote answered with an error status.
    Rejected { status: u16, message: String },
    /// Nothing was edited; no request was made.
    Unchanged,
}

impl SaveOutcome {
    /// The alert to show the user, if any.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            SaveOutcome::Saved { keys, .. } => Some(Alert::success(format!(
                "Saved {} {}",
                keys.len(),
                if keys.len() == 1 { "property" } else { "properties" }
            ))),
            SaveOutcome::Rejected { message, .. } => {
                Some(Alert::danger(format!("Save failed: {}", message)))
            }
            SaveOutcome::Unchanged => None,
        }
    }
}
