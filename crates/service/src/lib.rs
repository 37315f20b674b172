//! Storage services behind the admin API.
//! - `content`: site text with ranked backend fallback and an in-memory snapshot.
//! - `images`: slot-addressed uploads, filesystem authoritative, database mirror.
//! - `db`: lazily connected relational handle shared by both.

pub mod content;
pub mod db;
pub mod errors;
pub mod images;
pub mod observability;
pub mod runtime;
pub mod storage;
#[cfg(test)]
pub mod test_support;
