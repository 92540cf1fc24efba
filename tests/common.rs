//! Common test utilities: a sample deal schema and an in-memory property store.
use async_trait::async_trait;
use dealform::gateway::{PropertyValues, UploadedFile};
use dealform::prelude::*;
use serde_json::json;
use std::result::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A deal form with a pipeline-gated section and one field of every kind.
#[allow(dead_code)]
pub const DEAL_SCHEMA_JSON: &str = r#"
{
  "sections": [
    {
      "name": "Overview",
      "fields": [
        { "key": "dealname", "label": "Deal name", "type": "text" },
        { "key": "pipeline", "label": "Pipeline", "type": "dropdown" },
        { "key": "amount", "label": "Amount", "type": "number" },
        { "key": "hs_object_id", "label": "Record ID", "type": "readonly" }
      ]
    },
    {
      "name": "Installation",
      "visibleWhen": { "key": "pipeline", "equals": "21960027" },
      "fields": [
        { "key": "install_date", "label": "Install date", "type": "date" },
        { "key": "site_ready", "label": "Site ready", "type": "checkbox" },
        { "key": "equipment", "label": "Equipment", "type": "multiselect" },
        {
          "key": "priority",
          "label": "Priority",
          "type": "dropdown",
          "options": [
            { "label": "Low", "value": "low" },
            { "label": "High", "value": "high" }
          ]
        }
      ]
    },
    {
      "name": "Large deals",
      "visibleWhen": { "key": "amount", "operator": "greaterThan", "value": 10000 },
      "fields": [
        { "key": "approval_notes", "label": "Approval notes", "type": "multiline" },
        {
          "key": "edit_contract",
          "label": "Edit contract",
          "type": "action",
          "modalField": { "key": "contract", "label": "Contract", "type": "file" }
        },
        { "key": "signature", "label": "Signature", "type": "signature-pad" }
      ]
    }
  ]
}
"#;

#[allow(dead_code)]
pub fn deal_schema() -> FieldSchema {
    FieldSchema::from_json(DEAL_SCHEMA_JSON).expect("sample schema is valid")
}

/// Remote values for a deal in the installation pipeline.
#[allow(dead_code)]
pub fn installation_deal() -> PropertyValues {
    [
        ("dealname", json!("Acme solar install")),
        ("pipeline", json!("21960027")),
        ("amount", json!("12500")),
        ("hs_object_id", json!("14310263921")),
        ("install_date", json!("2024-03-05")),
        ("site_ready", json!("true")),
        ("equipment", json!("panels;inverter")),
        ("priority", json!("high")),
        ("hs_lastmodifieddate", json!("2024-02-01T10:00:00Z")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[allow(dead_code)]
pub fn pipeline_options() -> OptionSet {
    let mut options = OptionSet::default();
    options.insert(
        "pipeline".to_string(),
        vec![
            SelectOption::new("Sales", "default"),
            SelectOption::new("Installation", "21960027"),
        ],
    );
    options.insert(
        "equipment".to_string(),
        vec![
            SelectOption::new("Solar panels", "panels"),
            SelectOption::new("Inverter", "inverter"),
            SelectOption::new("Battery", "battery"),
        ],
    );
    options
}

/// An in-memory [`PropertyStore`] that counts calls and records patches.
#[allow(dead_code)]
pub struct FakeStore {
    pub values: PropertyValues,
    pub options: OptionSet,
    pub fail_values: bool,
    pub fail_options: bool,
    /// Patches never complete, as with a request that hangs.
    pub stall_patch: bool,
    pub patch_outcome: PatchOutcome,
    pub values_calls: AtomicUsize,
    pub options_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
    pub patches: Mutex<Vec<PatchPayload>>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new(values: PropertyValues, options: OptionSet) -> Self {
        Self {
            values,
            options,
            fail_values: false,
            fail_options: false,
            stall_patch: false,
            patch_outcome: PatchOutcome::Applied {
                result: json!({ "id": "14310263921" }),
            },
            values_calls: AtomicUsize::new(0),
            options_calls: AtomicUsize::new(0),
            patch_calls: AtomicUsize::new(0),
            patches: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn last_patch(&self) -> Option<PatchPayload> {
        self.patches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PropertyStore for FakeStore {
    async fn fetch_options(&self, keys: &[String]) -> Result<OptionSet, GatewayError> {
        self.options_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_options {
            return Err(GatewayError::Remote {
                status: 500,
                message: "Internal error".to_string(),
            });
        }
        Ok(keys
            .iter()
            .filter_map(|k| self.options.get(k).map(|o| (k.clone(), o.clone())))
            .collect())
    }

    async fn fetch_values(
        &self,
        object_id: &str,
        keys: &[String],
    ) -> Result<PropertyValues, GatewayError> {
        self.values_calls.fetch_add(1, Ordering::SeqCst);
        if object_id.is_empty() {
            return Err(GatewayError::MissingParameters("objectId".to_string()));
        }
        if self.fail_values {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        Ok(keys
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn patch_values(
        &self,
        _object_id: &str,
        updates: &PatchPayload,
    ) -> Result<PatchOutcome, GatewayError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.patches.lock().unwrap().push(updates.clone());
        if self.stall_patch {
            std::future::pending::<()>().await;
        }
        Ok(self.patch_outcome.clone())
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, GatewayError> {
        Ok(UploadedFile {
            url: format!("https://files.example.com/{}", upload.file_name),
        })
    }
}
