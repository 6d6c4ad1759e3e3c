//! Canonical migration definitions.
//!
//! `REGISTRY_MIGRATIONS` — the control-plane registry database.
//! `TENANT_MIGRATIONS` — the per-tenant schema, run at provisioning and
//! re-run (no-op via the `_migrations` ledger) on forced schema sync.

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

/// Registry-schema migrations.
pub const REGISTRY_MIGRATIONS: &[Migration] = &[(
    "0001_registry",
    include_str!("../../migrations/0001_registry.sql"),
)];

/// Per-tenant schema migrations.
pub const TENANT_MIGRATIONS: &[Migration] = &[(
    "0002_tenant_schema",
    include_str!("../../migrations/0002_tenant_schema.sql"),
)];
