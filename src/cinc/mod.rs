pub mod parser;
pub mod status;
pub mod store;
pub mod types;

pub use status::StatusCommand;
pub use store::{NodeSource, NodeStore};
