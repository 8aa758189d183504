//! REST API module.
//!
//! Handlers answer with bare JSON bodies in the shapes the dashboard pages read.

mod player_count;
mod records;
mod servers;

pub use player_count::*;
pub use records::*;
pub use servers::*;

use axum::Json;

/// Response type of every JSON handler.
pub type ApiResult<T> = Result<Json<T>, crate::errors::AppError>;
