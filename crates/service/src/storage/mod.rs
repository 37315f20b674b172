//! Storage abstractions for service layer
//!
//! Contains reusable file-backed stores shared by services that persist a
//! small JSON document instead of database rows.

pub mod json_document;
