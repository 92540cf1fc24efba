//! The property gateway: single-shot calls to the CRM's REST API.
//!
//! The form engine only sees the [`PropertyStore`] trait. [`CrmGateway`] implements it on top
//! of a [`Transport`], which is the seam tests replace.

use crate::error::GatewayError;
use crate::normalize::PatchPayload;
use crate::value::OptionSet;
use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

mod crm;
mod message;
mod transport;

pub use crm::CrmGateway;
pub use message::extract_remote_message;
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};

/// Current property values of a remote object, keyed by property name.
pub type PropertyValues = AHashMap<String, JsonValue>;

/// The result of a patch that reached the remote.
///
/// A rejection is not an `Err`: the remote answered, and the caller decides what to show.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    Applied { result: JsonValue },
    Rejected { status: u16, message: String },
}

/// A file to upload, with its content already base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    pub base64: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
}

/// A store of remote object properties.
///
/// `patch_values` is the only non-idempotent operation; callers must not retry it blindly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Fetches option lists. Keys without options are absent from the result.
    async fn fetch_options(&self, keys: &[String]) -> Result<OptionSet, GatewayError>;

    async fn fetch_values(
        &self,
        object_id: &str,
        keys: &[String],
    ) -> Result<PropertyValues, GatewayError>;

    async fn patch_values(
        &self,
        object_id: &str,
        updates: &PatchPayload,
    ) -> Result<PatchOutcome, GatewayError>;

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, GatewayError>;
}

/// How option lists are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsStrategy {
    /// One request per property; failures for a single key are skipped.
    #[default]
    PerProperty,
    /// One request for all properties plus one for pipelines; any unparseable body fails the
    /// batch.
    Batch,
}
