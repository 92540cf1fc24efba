//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the dealform crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use dealform::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let schema = FieldSchema::from_json(&std::fs::read_to_string("path/to/fields.json")?)?;
//! let state = FormState::new();
//!
//! for section in schema.sections() {
//!     let visibility = evaluate(section.condition.as_ref(), &state);
//!     println!("{}: {:?}", section.name, visibility);
//! }
//! # Ok(())
//! # }
//! ```

// Schema
pub use crate::schema::{Field, FieldSchema, FieldType, IntoSchema, Section, VisibilityCondition};

// Values and state
pub use crate::value::{DateValue, FieldValue, FormState, OptionSet, SelectOption};

// Engine
pub use crate::condition::{ConditionTrace, Visibility, evaluate, explain};
pub use crate::form::{Alert, AlertKind, FormEngine, MountReport, SaveOutcome};
pub use crate::normalize::{PatchPayload, build_patch, normalize};
pub use crate::render::{Control, ControlInput, ControlKind, FormView};

// Gateway
pub use crate::gateway::{CrmGateway, FileUpload, PatchOutcome, PropertyStore};
pub use crate::settings::GatewayConfig;

// Error types
pub use crate::error::{ConfigError, FormError, GatewayError, SchemaError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
