//! The form engine.
//!
//! Owns the state of one form session: the schema, the values, the fetched option sets and the
//! set of keys edited since the last successful save. Rendering and normalization are pure
//! functions over that state; only mount, file upload and save touch the [`PropertyStore`].

use crate::error::FormError;
use crate::gateway::{FileUpload, PatchOutcome, PropertyStore, PropertyValues, UploadedFile};
use crate::normalize::build_patch;
use crate::render::{self, ControlInput, FormView, SaveButton};
use crate::schema::{FieldSchema, FieldType};
use crate::value::{FieldValue, FormState, OptionSet};
use ahash::AHashSet;
use save::InFlight;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

mod alert;
mod save;

pub use alert::{Alert, AlertKind, MountReport};
pub use save::{PendingSave, SaveAttempt, SaveOutcome};

pub struct FormEngine<S: PropertyStore> {
    schema: FieldSchema,
    store: Arc<S>,
    object_id: String,
    state: FormState,
    options: OptionSet,
    dirty: AHashSet<String>,
    in_flight: Arc<AtomicBool>,
}

impl<S: PropertyStore> FormEngine<S> {
    pub fn new(schema: FieldSchema, store: Arc<S>, object_id: impl Into<String>) -> Self {
        Self {
            schema,
            store,
            object_id: object_id.into(),
            state: FormState::new(),
            options: OptionSet::default(),
            dirty: AHashSet::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// True while a [`PendingSave`] or its [`SaveAttempt`] is alive.
    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Keys edited since mount or the last successful save, sorted.
    pub fn dirty_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.dirty.iter().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Loads current values and option sets.
    ///
    /// Both requests run concurrently and fail independently. A failed options fetch leaves
    /// every option list empty; a failed values fetch leaves the form blank. Either failure is
    /// reported as an alert, never as an error. A schema with no value keys or no option keys
    /// skips the matching request.
    pub async fn mount(&mut self) -> MountReport {
        let value_keys = self.schema.value_keys();
        let option_keys = self.schema.option_keys();
        let store = Arc::clone(&self.store);

        let values_fetch = async {
            if value_keys.is_empty() {
                Ok(PropertyValues::default())
            } else {
                store.fetch_values(&self.object_id, &value_keys).await
            }
        };
        let options_fetch = async {
            if option_keys.is_empty() {
                Ok(OptionSet::default())
            } else {
                store.fetch_options(&option_keys).await
            }
        };
        let (values, options) = tokio::join!(values_fetch, options_fetch);

        let mut report = MountReport::default();

        match options {
            Ok(options) => {
                debug!(count = options.len(), "loaded option sets");
                self.options = options;
                report.options_loaded = true;
            }
            Err(e) => {
                warn!(error = %e, "failed to load dropdown options");
                self.options = OptionSet::default();
                report
                    .alerts
                    .push(Alert::warning(format!("Could not load dropdown options: {}", e)));
            }
        }

        match values {
            Ok(values) => {
                let state = FormState::from_remote(&self.schema, &values, &self.options);
                debug!(count = state.len(), object_id = %self.object_id, "loaded values");
                self.state.replace(state);
                report.values_loaded = true;
            }
            Err(e) => {
                error!(error = %e, object_id = %self.object_id, "failed to load values");
                report
                    .alerts
                    .push(Alert::danger(format!("Could not load current values: {}", e)));
            }
        }

        self.dirty.clear();
        report
    }

    /// The visible sections and the save control.
    pub fn render(&self) -> FormView {
        FormView {
            sections: render::render_sections(&self.schema, &self.state, &self.options),
            save: SaveButton {
                enabled: !self.is_saving(),
                pending_changes: self.dirty.len(),
            },
        }
    }

    /// Applies host input to the field bound to `key`.
    ///
    /// On error the state is unchanged.
    pub fn edit(&mut self, key: &str, input: ControlInput) -> Result<(), FormError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        if !field.field_type.is_writable() {
            return Err(FormError::NotWritable(key.to_string()));
        }

        let control = render::render_field(field, self.state.get(key), &self.options);
        match control.capture(input)? {
            Some(value) => self.state.set(key, value),
            None => {
                self.state.remove(key);
            }
        }
        self.dirty.insert(key.to_string());
        Ok(())
    }

    /// Uploads a file and stores its url in the file-reference field `key`.
    pub async fn attach_file(
        &mut self,
        key: &str,
        upload: FileUpload,
    ) -> Result<UploadedFile, FormError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        if field.field_type != FieldType::FileReference {
            return Err(FormError::InputMismatch {
                key: key.to_string(),
                expected: "a file url",
            });
        }

        let uploaded = self.store.upload_file(&upload).await.map_err(|e| {
            error!(error = %e, file = %upload.file_name, "upload failed");
            FormError::from(e)
        })?;

        info!(key, url = %uploaded.url, "attached file");
        self.state.set(key, FieldValue::Text(uploaded.url.clone()));
        self.dirty.insert(key.to_string());
        Ok(uploaded)
    }

    /// Starts a save of the dirty keys.
    ///
    /// Returns `Ok(None)` when nothing was edited. While the returned save is in flight, further
    /// calls fail with [`FormError::SaveInFlight`]. The save stops being in flight when
    /// [`FormEngine::finish_save`] settles it, or when the pending save or its attempt is
    /// dropped unsettled; in the latter case the edits stay dirty.
    pub fn begin_save(&mut self) -> Result<Option<PendingSave<S>>, FormError> {
        if self.is_saving() {
            return Err(FormError::SaveInFlight);
        }

        let payload = build_patch(
            &self.schema,
            &self.state,
            self.dirty.iter().map(String::as_str),
        );
        if payload.is_empty() {
            debug!("nothing to save");
            return Ok(None);
        }

        let in_flight = InFlight::acquire(&self.in_flight).ok_or(FormError::SaveInFlight)?;
        debug!(keys = payload.len(), object_id = %self.object_id, "starting save");
        Ok(Some(PendingSave::new(
            Arc::clone(&self.store),
            self.object_id.clone(),
            payload,
            in_flight,
        )))
    }

    /// Settles a save started with [`FormEngine::begin_save`].
    ///
    /// On success a key stops being dirty only if its current value is still the one that was
    /// sent. A rejected or failed save leaves the state and the dirty set as they were.
    pub fn finish_save(&mut self, attempt: SaveAttempt) -> Result<SaveOutcome, FormError> {
        let (payload, result) = attempt.into_parts();

        match result {
            Ok(PatchOutcome::Applied { result }) => {
                let current = build_patch(
                    &self.schema,
                    &self.state,
                    payload.keys().map(String::as_str),
                );
                let keys: Vec<String> = payload.keys().cloned().collect();
                for key in &keys {
                    if current.get(key) == payload.get(key) {
                        self.dirty.remove(key);
                    }
                }
                info!(keys = keys.len(), object_id = %self.object_id, "saved");
                Ok(SaveOutcome::Saved { keys, result })
            }
            Ok(PatchOutcome::Rejected { status, message }) => {
                warn!(status, %message, "save rejected");
                Ok(SaveOutcome::Rejected { status, message })
            }
            Err(e) => {
                error!(error = %e, "save failed");
                Err(FormError::Gateway(e))
            }
        }
    }

    /// Begins, sends and settles a save in one step.
    pub async fn save(&mut self) -> Result<SaveOutcome, FormError> {
        match self.begin_save()? {
            None => Ok(SaveOutcome::Unchanged),
            Some(pending) => {
                let attempt = pending.send().await;
                self.finish_save(attempt)
            }
        }
    }
}
