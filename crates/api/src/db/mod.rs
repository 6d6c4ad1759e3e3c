//! Shared database schema, migrations, and query builders.
//!
//! The registry database holds tenants and orgs; every tenant owns a
//! separate database file built from the tenant-schema migrations.

pub mod assets;
pub mod chat;
pub mod docs;
pub mod integrations;
pub mod invitations;
pub mod migrations;
pub mod roles;
pub mod sites;
pub mod spaces;
pub mod tables;
pub mod tenants;
pub mod tokens;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

/// A built statement: SQL text plus bound values.
pub type Built = (String, sea_query::Values);
