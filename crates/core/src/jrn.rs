//! Jolli Resource Names.
//!
//! A JRN is the internal URI-like identifier for tenant-scoped resources:
//!
//! - `jrn:<tenant>:doc:<space>/<path...>` — a document at a tree path
//! - `jrn:<tenant>:asset:<space>/<id>` — an asset blob
//! - `jrn:<tenant>:site:<space>/<id>` — a generated docsite
//!
//! Tenant and space segments are lowercase slugs; document path segments are
//! percent-encoded when rendered so titles with `/` or spaces survive a
//! round-trip.

use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jrn {
    Doc {
        tenant: String,
        space: String,
        path: String,
    },
    Asset {
        tenant: String,
        space: String,
        id: String,
    },
    Site {
        tenant: String,
        space: String,
        id: String,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JrnError {
    #[error("jrn must start with jrn:")]
    InvalidScheme,
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),
    #[error("invalid jrn structure: {0}")]
    InvalidStructure(String),
    #[error("invalid slug segment: {0}")]
    InvalidSlug(String),
    #[error("invalid path encoding: {0}")]
    InvalidPathEncoding(String),
}

impl Jrn {
    pub fn doc(tenant: &str, space: &str, path: &str) -> Self {
        Self::Doc {
            tenant: tenant.to_string(),
            space: space.to_string(),
            path: path.trim_start_matches('/').to_string(),
        }
    }

    pub fn asset(tenant: &str, space: &str, id: &str) -> Self {
        Self::Asset {
            tenant: tenant.to_string(),
            space: space.to_string(),
            id: id.to_string(),
        }
    }

    pub fn site(tenant: &str, space: &str, id: &str) -> Self {
        Self::Site {
            tenant: tenant.to_string(),
            space: space.to_string(),
            id: id.to_string(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, JrnError> {
        let body = input.strip_prefix("jrn:").ok_or(JrnError::InvalidScheme)?;

        let mut parts = body.splitn(3, ':');
        let tenant = parts.next().unwrap_or_default();
        let kind = parts
            .next()
            .ok_or_else(|| JrnError::InvalidStructure("missing resource kind".to_string()))?;
        let rest = parts
            .next()
            .ok_or_else(|| JrnError::InvalidStructure("missing resource body".to_string()))?;

        validate_slug_segment(tenant)?;

        let (space, tail) = rest.split_once('/').ok_or_else(|| {
            JrnError::InvalidStructure("expected <space>/<resource>".to_string())
        })?;
        validate_slug_segment(space)?;
        if tail.is_empty() {
            return Err(JrnError::InvalidStructure(
                "resource body is empty".to_string(),
            ));
        }

        match kind {
            "doc" => Ok(Self::Doc {
                tenant: tenant.to_string(),
                space: space.to_string(),
                path: decode_path(tail)?,
            }),
            "asset" => Ok(Self::Asset {
                tenant: tenant.to_string(),
                space: space.to_string(),
                id: tail.to_string(),
            }),
            "site" => Ok(Self::Site {
                tenant: tenant.to_string(),
                space: space.to_string(),
                id: tail.to_string(),
            }),
            other => Err(JrnError::UnsupportedKind(other.to_string())),
        }
    }

    pub fn tenant(&self) -> &str {
        match self {
            Self::Doc { tenant, .. } | Self::Asset { tenant, .. } | Self::Site { tenant, .. } => {
                tenant
            }
        }
    }

    pub fn space(&self) -> &str {
        match self {
            Self::Doc { space, .. } | Self::Asset { space, .. } | Self::Site { space, .. } => space,
        }
    }

    pub fn as_doc_path(&self) -> Option<&str> {
        match self {
            Self::Doc { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Jrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doc {
                tenant,
                space,
                path,
            } => write!(f, "jrn:{tenant}:doc:{space}/{}", encode_path(path)),
            Self::Asset { tenant, space, id } => write!(f, "jrn:{tenant}:asset:{space}/{id}"),
            Self::Site { tenant, space, id } => write!(f, "jrn:{tenant}:site:{space}/{id}"),
        }
    }
}

fn validate_slug_segment(value: &str) -> Result<(), JrnError> {
    static SLUG_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"^[a-z0-9][a-z0-9-]{0,62}$").expect("slug regex should compile")
    });
    if SLUG_RE.is_match(value) {
        Ok(())
    } else {
        Err(JrnError::InvalidSlug(value.to_string()))
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_path(encoded: &str) -> Result<String, JrnError> {
    let mut out = Vec::new();
    for segment in encoded.split('/') {
        let decoded = urlencoding::decode(segment)
            .map_err(|_| JrnError::InvalidPathEncoding(segment.to_string()))?;
        let decoded = decoded.trim();
        if decoded.is_empty() || decoded == "." || decoded == ".." || decoded.contains('\\') {
            return Err(JrnError::InvalidPathEncoding(segment.to_string()));
        }
        out.push(decoded.to_string());
    }
    if out.is_empty() {
        return Err(JrnError::InvalidStructure(
            "document path is required".to_string(),
        ));
    }
    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::{Jrn, JrnError};

    #[test]
    fn parses_doc_roundtrip() {
        let jrn = Jrn::doc("acme", "handbook", "guides/install");
        let rendered = jrn.to_string();
        assert_eq!(rendered, "jrn:acme:doc:handbook/guides/install");
        assert_eq!(Jrn::parse(&rendered).expect("parse doc"), jrn);
    }

    #[test]
    fn doc_path_with_spaces_survives_roundtrip() {
        let jrn = Jrn::doc("acme", "handbook", "getting started/first steps");
        let parsed = Jrn::parse(&jrn.to_string()).expect("parse encoded doc");
        assert_eq!(parsed.as_doc_path(), Some("getting started/first steps"));
    }

    #[test]
    fn parses_asset() {
        let parsed = Jrn::parse("jrn:acme:asset:handbook/0b5e-42").expect("parse asset");
        assert_eq!(parsed, Jrn::asset("acme", "handbook", "0b5e-42"));
        assert_eq!(parsed.tenant(), "acme");
        assert_eq!(parsed.space(), "handbook");
    }

    #[test]
    fn rejects_bad_scheme() {
        assert_eq!(Jrn::parse("urn:acme:doc:x/y"), Err(JrnError::InvalidScheme));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = Jrn::parse("jrn:acme:queue:handbook/x").expect_err("unknown kind");
        assert_eq!(err, JrnError::UnsupportedKind("queue".to_string()));
    }

    #[test]
    fn rejects_uppercase_tenant() {
        let err = Jrn::parse("jrn:Acme:doc:handbook/x").expect_err("bad tenant slug");
        assert!(matches!(err, JrnError::InvalidSlug(_)));
    }

    #[test]
    fn rejects_traversal_in_doc_path() {
        let err = Jrn::parse("jrn:acme:doc:handbook/../secrets").expect_err("dotdot");
        assert!(matches!(err, JrnError::InvalidPathEncoding(_)));
    }

    #[test]
    fn rejects_missing_space() {
        let err = Jrn::parse("jrn:acme:doc:handbook").expect_err("no resource body");
        assert!(matches!(err, JrnError::InvalidStructure(_)));
    }
}
