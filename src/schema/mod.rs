pub mod config;
pub mod definition;

pub use config::*;
pub use definition::*;
