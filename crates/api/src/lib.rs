//! Shared API types, crypto, and SQL builders for Jolli.
//!
//! This crate is the single source of truth for all API request/response
//! types, the framework-agnostic [`ServiceError`], and the sea-query
//! builders used by the server's route handlers.

use serde::{Deserialize, Serialize};

pub mod crypto;
pub mod db;
pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Lifecycle state of a tenant in the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an asset's blob.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Active,
    Orphaned,
    Deleted,
}

impl AssetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Orphaned => "orphaned",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "orphaned" => Some(Self::Orphaned),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Docsite build/deploy state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Idle,
    Building,
    Deploying,
    Ready,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Deploying => "deploying",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(Self::Idle),
            "building" => Some(Self::Building),
            "deploying" => Some(Self::Deploying),
            "ready" => Some(Self::Ready),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// A build may start only from a settled state.
    pub fn can_start_build(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Failed)
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an org invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Revoked => "revoked",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a docsite build, streamed over SSE.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Queued,
    Collecting,
    Generating,
    Deploying,
    Ready,
    Failed,
}

impl BuildPhase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Collecting => "collecting",
            Self::Generating => "generating",
            Self::Deploying => "deploying",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Bootstrap (manager service) ─────────────────────────────────────────────

/// Body of the HMAC-signed `POST /admin/bootstrap` request.
#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub slug: String,
    pub name: String,
    pub admin_email: String,
}

/// Returned on successful tenant provisioning. `invitation_token` is the
/// one-time admin invitation and is never retrievable again.
#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub tenant_id: String,
    pub org_id: String,
    pub invitation_token: String,
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Redeem an org invitation and create the account.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub invitation_token: String,
    pub display_name: String,
    pub password: String,
}

/// Email + password login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned on successful login / register / refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user_id: String,
    pub display_name: String,
}

/// Refresh token request (remember-me).
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request (invalidate refresh token).
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Change password request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Consume an email-verification token.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Full profile returned by `GET /api/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
    pub created_at: String,
    pub memberships: Vec<MembershipResponse>,
}

/// An org membership with its resolved role.
#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub org_id: String,
    pub org_slug: String,
    pub role: String,
    pub joined_at: String,
}

/// Generic success response for operations that don't return data.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// Single user record returned by member listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub email_verified: bool,
    pub role: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,
}

/// Returned by `GET /api/users`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
}

/// Query parameters for `GET /api/users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Include archived users (default false).
    #[serde(default)]
    pub include_archived: bool,
}

/// Request body for `PUT /api/users/:id/role` — change a member's org role.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role_id: String,
}

// ─── Invitations ─────────────────────────────────────────────────────────────

/// Request body for `POST /api/invitations` — invite a user into the org.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role_id: String,
}

/// Returned once at creation; `token` is not retrievable later.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateInvitationResponse {
    #[serde(flatten)]
    pub invitation: InvitationResponse,
    pub token: String,
}

/// Single invitation record.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvitationResponse {
    pub id: String,
    pub org_id: String,
    pub email: String,
    pub role: String,
    pub status: InvitationStatus,
    pub invited_by: Option<String>,
    pub created_at: String,
    pub expires_at: String,
}

/// Returned by `GET /api/invitations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListInvitationsResponse {
    pub invitations: Vec<InvitationResponse>,
}

// ─── Roles & permissions ─────────────────────────────────────────────────────

/// Request body for `POST /api/roles`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Single role with its granted permission keys.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub builtin: bool,
    pub permissions: Vec<String>,
}

/// Returned by `GET /api/roles`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRolesResponse {
    pub roles: Vec<RoleResponse>,
}

/// Single permission catalog entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub key: String,
    pub description: String,
}

/// Returned by `GET /api/permissions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPermissionsResponse {
    pub permissions: Vec<PermissionResponse>,
}

/// Grant or revoke a permission on a role.
#[derive(Debug, Serialize, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission_key: String,
}

// ─── Spaces ──────────────────────────────────────────────────────────────────

/// Request body for `POST /api/spaces`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSpaceRequest {
    pub slug: String,
    pub name: String,
}

/// Single space record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceResponse {
    pub id: String,
    pub org_id: String,
    pub slug: String,
    pub name: String,
    pub created_at: String,
}

/// Returned by `GET /api/spaces`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListSpacesResponse {
    pub spaces: Vec<SpaceResponse>,
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Request body for `POST /api/docs` — create a document.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDocRequest {
    pub space_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Full document returned by detail endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocResponse {
    pub id: String,
    pub jrn: String,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub content: String,
    pub sort_order: i64,
    pub version: i64,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub explicitly_deleted: bool,
}

/// Tree/listing view of a document (no content body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSummary {
    pub id: String,
    pub jrn: String,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub sort_order: i64,
    pub version: i64,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// Returned by `GET /api/docs` and the trash listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListDocsResponse {
    pub docs: Vec<DocSummary>,
}

/// Query parameters for `GET /api/docs`.
#[derive(Debug, Deserialize)]
pub struct ListDocsQuery {
    pub space_id: String,
    /// Restrict to one subtree by path prefix.
    pub under: Option<String>,
}

/// Request body for `PUT /api/docs/:id` — optimistic-concurrency update.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDocRequest {
    pub expected_version: i64,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// 409 body when the stored version does not match `expected_version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionConflictResponse {
    pub error: String,
    pub current_version: i64,
}

/// Request body for `POST /api/docs/:id/move`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MoveDocRequest {
    pub new_parent_id: Option<String>,
    pub sort_order: Option<i64>,
}

// ─── Assets ──────────────────────────────────────────────────────────────────

/// Query parameters accompanying a raw-body `POST /api/assets` upload.
#[derive(Debug, Deserialize)]
pub struct UploadAssetQuery {
    pub space_id: String,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Single asset metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetResponse {
    pub id: String,
    pub jrn: String,
    pub space_id: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub status: AssetStatus,
    pub uploaded_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Returned by `GET /api/assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListAssetsResponse {
    pub assets: Vec<AssetResponse>,
}

/// Returned by `POST /api/assets/sweep`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepAssetsResponse {
    /// Blobs removed from disk in this pass.
    pub swept: usize,
}

/// Query parameters for `GET /api/assets`.
#[derive(Debug, Deserialize)]
pub struct ListAssetsQuery {
    pub space_id: String,
    /// Filter by status (default: active only).
    pub status: Option<AssetStatus>,
}

// ─── Integrations ────────────────────────────────────────────────────────────

/// Request body for `POST /api/integrations` — link a GitHub repository.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateIntegrationRequest {
    pub repo_full_name: String,
    pub default_branch: Option<String>,
}

/// Returned once at creation; `webhook_secret` is not retrievable later.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateIntegrationResponse {
    #[serde(flatten)]
    pub integration: IntegrationResponse,
    pub webhook_secret: String,
}

/// Single integration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationResponse {
    pub id: String,
    pub org_id: String,
    pub provider: String,
    pub repo_full_name: String,
    pub default_branch: String,
    pub status: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<String>,
}

/// Returned by `GET /api/integrations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListIntegrationsResponse {
    pub integrations: Vec<IntegrationResponse>,
}

// ─── Docsites ────────────────────────────────────────────────────────────────

/// Request body for `POST /api/sites`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub space_id: String,
    pub name: String,
}

/// Single docsite record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResponse {
    pub id: String,
    pub space_id: String,
    pub name: String,
    pub status: SiteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_built_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Returned by `GET /api/sites`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListSitesResponse {
    pub sites: Vec<SiteResponse>,
}

/// Query parameters for `GET /api/sites`.
#[derive(Debug, Deserialize)]
pub struct ListSitesQuery {
    pub space_id: String,
}

/// Returned by `POST /api/sites/:id/builds`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartBuildResponse {
    pub build_id: String,
    pub status: SiteStatus,
}

/// Single progress event on a site's SSE stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildProgressEvent {
    pub site_id: String,
    pub build_id: String,
    pub phase: BuildPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: String,
}

// ─── Chat ────────────────────────────────────────────────────────────────────

/// Request body for `POST /api/chat/messages`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostChatMessageRequest {
    pub body: String,
}

/// Single chat message, persisted and broadcast to the org's SSE stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub org_id: String,
    pub user_id: String,
    pub display_name: String,
    pub body: String,
    pub created_at: String,
}

/// Returned by `GET /api/chat/messages` — most recent messages.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListChatMessagesResponse {
    pub messages: Vec<ChatMessageResponse>,
}

/// Query parameters for `GET /api/chat/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct ListChatQuery {
    /// Messages to return, newest first (default 50, capped at 200).
    pub limit: Option<i64>,
}

// ─── Health ──────────────────────────────────────────────────────────────────

/// Returned by `GET /api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code; the server converts this into
/// an `ApiErr` response at the router boundary.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }

    /// Build a closure that wraps a DB/IO error into `Internal` with context.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<jolli_core::validate::ValidateError> for ServiceError {
    fn from(e: jolli_core::validate::ValidateError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<jolli_core::jrn::JrnError> for ServiceError {
    fn from(e: jolli_core::jrn::JrnError) -> Self {
        Self::BadRequest(e.to_string())
    }
}
