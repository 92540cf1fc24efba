pub mod field;
pub mod remote;
pub mod state;

pub use field::*;
pub use state::*;
