//! Shared building blocks for the site admin workspace.
//! - Logging setup used by every binary.
//! - Startup directory checks.
//! - Small response types reused by the HTTP layer.

pub mod types;
pub mod utils;
pub mod env;
