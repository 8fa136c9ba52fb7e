//! Storage-facing types and queries for the invoice engine.
//!
//! `domain` holds one row type per upstream table plus the persisted invoice
//! snapshot; `db` holds the SQL that reads and writes them.

pub mod db;
pub mod domain;
