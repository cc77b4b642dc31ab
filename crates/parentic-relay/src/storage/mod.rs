//! SQLite storage for the Parentic relay.
//!
//! Persists completed chat turns and serves them back as per-child history.

mod db;
mod models;
mod queries;


pub use db::ChatDatabase;
pub use models::*;
pub use parentic_core::db::DatabaseError;
