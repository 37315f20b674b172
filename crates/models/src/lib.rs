//! Relational persistence for site content and image metadata.
//! - `schema` creates the prefixed tables when missing.
//! - `content` and `images` hold the row-level queries.

pub mod errors;
pub mod db;
pub mod schema;
pub mod content;
pub mod images;

#[cfg(test)]
mod tests;
