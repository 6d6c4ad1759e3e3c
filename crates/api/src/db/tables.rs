//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

// ── Registry database ─────────────────────────────────────────────────────

#[derive(Iden)]
pub enum Tenants {
    Table,
    Id,
    Slug,
    Name,
    Status,
    CreatedAt,
}

#[derive(Iden)]
pub enum Orgs {
    Table,
    Id,
    TenantId,
    Slug,
    Name,
    IsDefault,
    CreatedAt,
}

// ── Tenant database ───────────────────────────────────────────────────────

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    PasswordHash,
    PasswordSalt,
    EmailVerified,
    CreatedAt,
    ArchivedAt,
}

#[derive(Iden)]
pub enum Roles {
    Table,
    Id,
    Name,
    Builtin,
    CreatedAt,
}

#[derive(Iden)]
pub enum Permissions {
    Table,
    Key,
    Description,
}

#[derive(Iden)]
pub enum RolePermissions {
    Table,
    RoleId,
    PermissionKey,
}

#[derive(Iden)]
pub enum UserOrgs {
    Table,
    OrgId,
    UserId,
    RoleId,
    JoinedAt,
}

#[derive(Iden)]
pub enum RefreshTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
pub enum VerificationTokens {
    Table,
    Id,
    UserId,
    TokenHash,
    Purpose,
    ExpiresAt,
    UsedAt,
    CreatedAt,
}

#[derive(Iden)]
pub enum Invitations {
    Table,
    Id,
    OrgId,
    Email,
    RoleId,
    TokenHash,
    Status,
    InvitedBy,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden)]
pub enum Spaces {
    Table,
    Id,
    OrgId,
    Slug,
    Name,
    CreatedAt,
}

#[derive(Iden)]
pub enum Docs {
    Table,
    Id,
    SpaceId,
    ParentId,
    Title,
    Slug,
    Path,
    Content,
    SortOrder,
    Version,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    ExplicitlyDeleted,
}

#[derive(Iden)]
pub enum Assets {
    Table,
    Id,
    SpaceId,
    Filename,
    ContentType,
    SizeBytes,
    StorageKey,
    Status,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Integrations {
    Table,
    Id,
    OrgId,
    Provider,
    RepoFullName,
    DefaultBranch,
    WebhookSecret,
    Status,
    CreatedAt,
    LastEventAt,
}

#[derive(Iden)]
pub enum Docsites {
    Table,
    Id,
    SpaceId,
    Name,
    Status,
    DeploymentUrl,
    LastBuildId,
    LastBuiltAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum ChatMessages {
    Table,
    Id,
    OrgId,
    UserId,
    Body,
    CreatedAt,
}
