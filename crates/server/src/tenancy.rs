//! Tenant registry, per-tenant database cache, and the request-scoped
//! tenant context.
//!
//! The registry database (`registry.db`) is the control plane: it knows every
//! tenant and org. Each tenant's data lives in its own database file under
//! `data_dir/tenants/<id>.db`, so rows of one tenant are physically invisible
//! to another. Handlers receive a [`TenantCtx`] extractor instead of any
//! ambient per-request state.

use anyhow::{Context, Result};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use jolli_api::db;
use jolli_api::db::migrations::{REGISTRY_MIGRATIONS, TENANT_MIGRATIONS};
use jolli_api::{crypto, service, ServiceError, TenantStatus};
use jolli_core::rbac;

use crate::error::ApiErr;
use crate::storage::{self, sq_execute, sq_query_row, TenantDb};
use crate::AppConfig;

pub const TENANT_HEADER: &str = "x-jolli-tenant";
pub const ORG_HEADER: &str = "x-jolli-org";

/// A registry tenant row.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub status: TenantStatus,
    pub created_at: String,
}

/// A registry org row.
#[derive(Debug, Clone)]
pub struct Org {
    pub id: String,
    pub tenant_id: String,
    pub slug: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: String,
}

/// Everything `provision` creates for a new tenant.
#[derive(Debug)]
pub struct Provisioned {
    pub tenant_id: String,
    pub org_id: String,
    pub invitation_token: String,
}

fn tenant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tenant> {
    let status: String = row.get(3)?;
    Ok(Tenant {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        status: TenantStatus::from_str(&status).unwrap_or(TenantStatus::Suspended),
        created_at: row.get(4)?,
    })
}

fn org_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Org> {
    Ok(Org {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        is_default: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// ── Registry ──────────────────────────────────────────────────────────────

/// Control-plane handle plus the keyed cache of tenant database handles.
#[derive(Clone)]
pub struct TenantRegistry {
    conn: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
    cache: Arc<Mutex<HashMap<String, TenantDb>>>,
}

impl TenantRegistry {
    /// Open (or create) the registry database under `data_dir`.
    pub fn open(data_dir: &std::path::Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = storage::open_database(&data_dir.join("registry.db"), REGISTRY_MIGRATIONS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            data_dir: data_dir.to_path_buf(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("registry mutex poisoned")
    }

    /// Look up a tenant by slug.
    pub fn resolve(&self, slug: &str) -> Option<Tenant> {
        let conn = self.conn();
        sq_query_row(&conn, db::tenants::get_by_slug(slug), tenant_from_row)
            .ok()
            .flatten()
    }

    /// Look up a tenant by id.
    pub fn tenant_by_id(&self, id: &str) -> Option<Tenant> {
        let conn = self.conn();
        sq_query_row(&conn, db::tenants::get_by_id(id), tenant_from_row)
            .ok()
            .flatten()
    }

    /// The default org of a tenant.
    pub fn default_org(&self, tenant_id: &str) -> Option<Org> {
        let conn = self.conn();
        sq_query_row(&conn, db::tenants::org_default(tenant_id), org_from_row)
            .ok()
            .flatten()
    }

    /// An org by id.
    pub fn org_get(&self, id: &str) -> Option<Org> {
        let conn = self.conn();
        sq_query_row(&conn, db::tenants::org_get(id), org_from_row)
            .ok()
            .flatten()
    }

    /// An org by slug within a tenant.
    pub fn org_by_slug(&self, tenant_id: &str, slug: &str) -> Option<Org> {
        let conn = self.conn();
        sq_query_row(&conn, db::tenants::org_by_slug(tenant_id, slug), org_from_row)
            .ok()
            .flatten()
    }

    /// Get or create the database handle for a tenant.
    ///
    /// Concurrent requests for the same tenant share one handle; creation
    /// happens under the cache lock so there is exactly one entry per tenant.
    /// `force_sync` re-runs tenant migrations and re-seeds RBAC data even on
    /// a cache hit (idempotent via the `_migrations` ledger and upserts).
    pub fn tenant_db(&self, tenant_id: &str, force_sync: bool) -> Result<TenantDb> {
        let mut cache = self.cache.lock().expect("tenant cache mutex poisoned");

        if let Some(handle) = cache.get(tenant_id) {
            if force_sync {
                let conn = handle.conn();
                storage::run_migrations(&conn, TENANT_MIGRATIONS)?;
                seed_rbac(&conn);
            }
            return Ok(handle.clone());
        }

        let tenant_dir = self.data_dir.join("tenants").join(tenant_id);
        let db_path = self.data_dir.join("tenants").join(format!("{tenant_id}.db"));
        let conn = storage::open_database(&db_path, TENANT_MIGRATIONS)
            .with_context(|| format!("opening tenant database {tenant_id}"))?;
        if force_sync {
            seed_rbac(&conn);
        }
        let handle = storage::tenant_db(conn, tenant_dir);
        cache.insert(tenant_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Provision a new tenant: registry rows, tenant database with seeded
    /// RBAC data, default org, and an admin invitation.
    pub fn provision(
        &self,
        slug: &str,
        name: &str,
        admin_email: &str,
    ) -> std::result::Result<Provisioned, ServiceError> {
        let slug = slug.trim().to_lowercase();
        jolli_core::validate::validate_slug(&slug)?;
        let admin_email = service::validate_email(admin_email)?;

        let tenant_id = Uuid::new_v4().to_string();
        let org_id = Uuid::new_v4().to_string();
        {
            let conn = self.conn();
            let taken = sq_query_row(&conn, db::tenants::slug_exists(&slug), |row| {
                row.get::<_, i64>(0)
            })
            .map_err(ServiceError::from_db("check tenant slug"))?
            .unwrap_or(0)
                > 0;
            if taken {
                return Err(ServiceError::Conflict("tenant slug already exists".into()));
            }

            sq_execute(
                &conn,
                db::tenants::insert(&tenant_id, &slug, name, TenantStatus::Active.as_str()),
            )
            .map_err(ServiceError::from_db("insert tenant"))?;
            sq_execute(
                &conn,
                db::tenants::org_insert(&org_id, &tenant_id, "default", name, true),
            )
            .map_err(ServiceError::from_db("insert default org"))?;
        }

        let tenant = self
            .tenant_db(&tenant_id, true)
            .map_err(ServiceError::from_db("create tenant database"))?;

        // Admin joins by redeeming this invitation.
        let token = crypto::generate_token()?;
        let token_hash = crypto::hash_token(&token);
        let invitation_id = Uuid::new_v4().to_string();
        let expires_at =
            service::expiry_sqlite(crate::now_unix(), service::INVITATION_EXPIRY_DAYS)?;
        {
            let conn = tenant.conn();
            let admin_role_id =
                sq_query_row(&conn, db::roles::get_by_name(rbac::ROLE_ADMIN), |row| {
                    row.get::<_, String>(0)
                })
                .map_err(ServiceError::from_db("look up admin role"))?
                .ok_or_else(|| ServiceError::Internal("admin role not seeded".into()))?;
            sq_execute(
                &conn,
                db::invitations::insert(
                    &invitation_id,
                    &org_id,
                    &admin_email,
                    &admin_role_id,
                    &token_hash,
                    None,
                    &expires_at,
                ),
            )
            .map_err(ServiceError::from_db("insert admin invitation"))?;
        }

        tracing::info!("provisioned tenant {slug} ({tenant_id})");
        Ok(Provisioned {
            tenant_id,
            org_id,
            invitation_token: token,
        })
    }
}

/// Seed the permission catalogue and builtin roles. Best-effort: failures are
/// logged and never abort provisioning.
fn seed_rbac(conn: &Connection) {
    for (key, description) in rbac::PERMISSIONS {
        if let Err(e) = sq_execute(conn, db::roles::permission_upsert(key, description)) {
            tracing::warn!("seeding permission {key}: {e}");
        }
    }
    for role in rbac::BUILTIN_ROLES {
        let existing = sq_query_row(conn, db::roles::get_by_name(role), |row| {
            row.get::<_, String>(0)
        })
        .ok()
        .flatten();
        let role_id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = sq_execute(conn, db::roles::insert(&id, role, true)) {
                    tracing::warn!("seeding role {role}: {e}");
                    continue;
                }
                id
            }
        };
        for key in rbac::builtin_role_permissions(role) {
            if let Err(e) = sq_execute(conn, db::roles::grant(&role_id, key)) {
                tracing::warn!("granting {key} to {role}: {e}");
            }
        }
    }
}

// ── Request context ───────────────────────────────────────────────────────

/// Request-scoped tenant context: the resolved tenant, org, and database
/// handle. Extracted explicitly by every tenant-scoped handler.
#[derive(Clone)]
pub struct TenantCtx {
    pub tenant: Tenant,
    pub org: Org,
    pub db: TenantDb,
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// First label of the Host header (`acme.jolli.dev` → `acme`).
fn host_label(parts: &Parts) -> Option<String> {
    let host = header(parts, "host")?;
    let host = host.split(':').next()?;
    host.split('.').next().map(str::to_lowercase)
}

impl<S> FromRequestParts<S> for TenantCtx
where
    S: Send + Sync,
    TenantRegistry: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let registry = TenantRegistry::from_ref(state);
        let config = AppConfig::from_ref(state);

        let slug = if config.multi_tenancy {
            header(parts, TENANT_HEADER)
                .map(str::to_lowercase)
                .or_else(|| host_label(parts))
                .ok_or_else(|| ApiErr::bad_request("tenant not specified").into_response())?
        } else {
            "default".to_string()
        };

        let tenant = registry
            .resolve(&slug)
            .ok_or_else(|| ApiErr::not_found("unknown tenant").into_response())?;
        if tenant.status == TenantStatus::Suspended {
            return Err(ApiErr::forbidden("tenant is suspended").into_response());
        }

        let org = match header(parts, ORG_HEADER) {
            Some(org_slug) => registry.org_by_slug(&tenant.id, org_slug),
            None => registry.default_org(&tenant.id),
        }
        .ok_or_else(|| ApiErr::not_found("unknown org").into_response())?;

        let db = registry
            .tenant_db(&tenant.id, false)
            .map_err(|e| ApiErr::from_db("open tenant database")(e).into_response())?;

        Ok(TenantCtx { tenant, org, db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_registry() -> (tempfile::TempDir, TenantRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    #[test]
    fn provision_creates_tenant_org_and_invitation() {
        let (_dir, registry) = open_registry();
        let out = registry.provision("acme", "Acme", "admin@acme.io").unwrap();

        let tenant = registry.resolve("acme").unwrap();
        assert_eq!(tenant.id, out.tenant_id);
        assert_eq!(tenant.status, TenantStatus::Active);

        let org = registry.default_org(&tenant.id).unwrap();
        assert_eq!(org.id, out.org_id);
        assert!(org.is_default);

        // Invitation is redeemable via its token hash.
        let db = registry.tenant_db(&tenant.id, false).unwrap();
        let conn = db.conn();
        let hash = crypto::hash_token(&out.invitation_token);
        let found = sq_query_row(&conn, db::invitations::lookup_by_token_hash(&hash), |row| {
            row.get::<_, String>(0)
        })
        .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn provision_rejects_duplicate_slug() {
        let (_dir, registry) = open_registry();
        registry.provision("acme", "Acme", "a@a.io").unwrap();
        let err = registry.provision("acme", "Acme 2", "b@b.io").unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn tenant_db_cache_returns_shared_handle() {
        let (_dir, registry) = open_registry();
        let out = registry.provision("acme", "Acme", "a@a.io").unwrap();

        let first = registry.tenant_db(&out.tenant_id, false).unwrap();
        let second = registry.tenant_db(&out.tenant_id, false).unwrap();
        // Same underlying connection: a write through one is visible via the other.
        {
            let conn = first.conn();
            sq_execute(&conn, db::spaces::insert("s1", &out.org_id, "docs", "Docs")).unwrap();
        }
        let conn = second.conn();
        let seen = sq_query_row(&conn, db::spaces::get_by_id("s1"), |row| {
            row.get::<_, String>(0)
        })
        .unwrap();
        assert_eq!(seen.as_deref(), Some("s1"));
    }

    #[test]
    fn force_sync_is_idempotent() {
        let (_dir, registry) = open_registry();
        let out = registry.provision("acme", "Acme", "a@a.io").unwrap();
        registry.tenant_db(&out.tenant_id, true).unwrap();
        registry.tenant_db(&out.tenant_id, true).unwrap();

        let dbh = registry.tenant_db(&out.tenant_id, false).unwrap();
        let conn = dbh.conn();
        let roles = crate::storage::sq_query_map(&conn, db::roles::list(), |row| {
            row.get::<_, String>(1)
        })
        .unwrap();
        let admins = roles.iter().filter(|r| r.as_str() == rbac::ROLE_ADMIN).count();
        assert_eq!(admins, 1);
    }

    #[test]
    fn tenants_are_isolated() {
        let (_dir, registry) = open_registry();
        let a = registry.provision("acme", "Acme", "a@a.io").unwrap();
        let b = registry.provision("globex", "Globex", "b@b.io").unwrap();

        let dba = registry.tenant_db(&a.tenant_id, false).unwrap();
        {
            let conn = dba.conn();
            sq_execute(&conn, db::spaces::insert("s1", &a.org_id, "docs", "Docs")).unwrap();
            sq_execute(
                &conn,
                db::docs::insert("d1", "s1", None, "Intro", "intro", "/intro", "", 0, None),
            )
            .unwrap();
        }

        let dbb = registry.tenant_db(&b.tenant_id, false).unwrap();
        let conn = dbb.conn();
        let seen = sq_query_row(&conn, db::docs::get_by_id("d1"), |row| {
            row.get::<_, String>(0)
        })
        .unwrap();
        assert!(seen.is_none());
    }
}
