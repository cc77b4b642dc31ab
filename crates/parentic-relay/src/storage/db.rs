//! SQLite database for the Parentic relay.

parentic_core::define_database!(ChatDatabase, "Chat database migrations complete");
