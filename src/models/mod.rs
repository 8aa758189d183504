//! Data models for the dashboard backend.
//!
//! Serialized field names match the dashboard frontend's TypeScript interfaces.

mod history;
mod record;
mod server;

pub use history::*;
pub use record::*;
pub use server::*;
