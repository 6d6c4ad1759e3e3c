//! Built-in roles and the permission catalog seeded into every tenant.

/// Permission keys known to the platform. The catalog is seeded at tenant
/// provisioning and re-seeded (idempotently) on schema sync.
pub const PERMISSIONS: &[(&str, &str)] = &[
    ("docs.read", "Read documents and trees"),
    ("docs.write", "Create and edit documents"),
    ("docs.delete", "Soft-delete and restore documents"),
    ("assets.read", "Download assets"),
    ("assets.write", "Upload and manage assets"),
    ("sites.manage", "Create docsites and trigger builds"),
    ("integrations.manage", "Link repositories and manage webhooks"),
    ("org.admin", "Manage members, roles, and invitations"),
];

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";

/// Built-in roles. These are created at provisioning and cannot be deleted.
pub const BUILTIN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_EDITOR, ROLE_VIEWER];

/// Permissions granted to each built-in role.
pub fn builtin_role_permissions(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => &[
            "docs.read",
            "docs.write",
            "docs.delete",
            "assets.read",
            "assets.write",
            "sites.manage",
            "integrations.manage",
            "org.admin",
        ],
        "editor" => &[
            "docs.read",
            "docs.write",
            "docs.delete",
            "assets.read",
            "assets.write",
        ],
        "viewer" => &["docs.read", "assets.read"],
        _ => &[],
    }
}

pub fn is_builtin_role(role: &str) -> bool {
    BUILTIN_ROLES.contains(&role)
}

pub fn is_known_permission(key: &str) -> bool {
    PERMISSIONS.iter().any(|(k, _)| *k == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_grants_are_known_permissions() {
        for role in BUILTIN_ROLES {
            for key in builtin_role_permissions(role) {
                assert!(is_known_permission(key), "unknown permission {key}");
            }
        }
    }

    #[test]
    fn viewer_cannot_write() {
        assert!(!builtin_role_permissions("viewer").contains(&"docs.write"));
    }

    #[test]
    fn unknown_role_has_no_grants() {
        assert!(builtin_role_permissions("ghost").is_empty());
    }
}
