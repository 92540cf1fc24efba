//! # Dealform - CRM Record Form Engine
//!
//! **Dealform** drives an editable form over a remote CRM record (a deal, by default). A static
//! field schema describes sections of typed fields; the engine loads the record's current
//! values and dropdown options, renders one control per field, evaluates section visibility
//! on every render, and patches edited values back in the remote's own formats.
//!
//! ## Core Workflow
//!
//! 1.  **Load the Schema**: Parse the field-config JSON with [`FieldSchema::from_json`], or
//!     implement [`IntoSchema`](schema::IntoSchema) for your own document format.
//! 2.  **Connect a Store**: Build a [`CrmGateway`](gateway::CrmGateway) from a
//!     [`GatewayConfig`](settings::GatewayConfig), or implement
//!     [`PropertyStore`](gateway::PropertyStore) for another backend.
//! 3.  **Mount**: [`FormEngine::mount`] fetches values and options concurrently. A failure
//!     of either is reported as an alert and the form still renders.
//! 4.  **Render, Edit, Save**: [`FormEngine::render`] describes the visible controls,
//!     [`FormEngine::edit`] applies host input, and [`FormEngine::save`] normalizes and patches
//!     the edited keys.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dealform::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let schema = FieldSchema::from_json(&std::fs::read_to_string("fields.json")?)?;
//! let config = GatewayConfig::load(None)?;
//! let gateway = CrmGateway::from_config(&config)?;
//!
//! let mut form = FormEngine::new(schema, Arc::new(gateway), "14310263921");
//! for alert in form.mount().await.alerts {
//!     eprintln!("{}", alert);
//! }
//!
//! form.edit("amount", ControlInput::Number(1500.0))?;
//! println!("{}", form.render());
//!
//! if let Some(alert) = form.save().await?.alert() {
//!     println!("{}", alert);
//! }
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod error;
pub mod form;
pub mod gateway;
pub mod normalize;
pub mod prelude;
pub mod render;
pub mod schema;
pub mod settings;
pub mod value;
