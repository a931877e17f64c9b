//! Content references: where a document lives and how it may be fetched.
//!
//! A reference is a URI whose scheme fixes the legal set of backends:
//!
//! | scheme | variant | backends |
//! |---|---|---|
//! | `ipfs://<cid>[/<path>]` | [`ContentReference::Content`] | gateways |
//! | `https://…` (or `http://…`) | [`ContentReference::Web`] | plain web |
//! | `file://<path>` | [`ContentReference::File`] | local filesystem |
//!
//! A content-network reference never resolves through the filesystem and a
//! file reference never resolves through a gateway.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ReferenceError;

/// The scheme family of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    ContentNetwork,
    SecureWeb,
    LocalFile,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentNetwork => "ipfs",
            Self::SecureWeb => "https",
            Self::LocalFile => "file",
        }
    }
}

/// A transport family able to resolve references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Content-network gateway over HTTP.
    Gateway,
    /// Direct web request.
    Web,
    /// Local filesystem read.
    File,
}

/// A parsed, immutable content reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentReference {
    /// A content-addressed document.
    Content {
        cid: String,
        path: Option<String>,
    },
    /// A conventional web document.
    Web { url: String },
    /// A local file (testing and offline use).
    File { path: PathBuf },
}

impl ContentReference {
    /// Parse a reference URI.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (scheme, locator) = input
            .split_once("://")
            .ok_or_else(|| ReferenceError::UnsupportedScheme(input.to_string()))?;

        match scheme.to_ascii_lowercase().as_str() {
            "ipfs" => parse_content(locator),
            "https" | "http" => parse_web(input, locator),
            "file" => parse_file(locator),
            other => Err(ReferenceError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Parse a reference, also accepting a bare content identifier.
    pub fn parse_lenient(input: &str) -> Result<Self, ReferenceError> {
        let trimmed = input.trim();
        if !trimmed.contains("://") && !trimmed.is_empty() {
            return parse_content(trimmed);
        }
        Self::parse(trimmed)
    }

    /// Build a content-network reference from a bare identifier.
    pub fn from_cid(cid: &str) -> Result<Self, ReferenceError> {
        validate_cid(cid)?;
        Ok(Self::Content {
            cid: cid.to_string(),
            path: None,
        })
    }

    /// Build a file reference.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ReferenceError::MissingLocator("file"));
        }
        Ok(Self::File {
            path: path.to_path_buf(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Content { .. } => Scheme::ContentNetwork,
            Self::Web { .. } => Scheme::SecureWeb,
            Self::File { .. } => Scheme::LocalFile,
        }
    }

    /// The backends allowed to resolve this reference.
    pub fn allowed_backends(&self) -> &'static [BackendKind] {
        match self {
            Self::Content { .. } => &[BackendKind::Gateway],
            Self::Web { .. } => &[BackendKind::Web],
            Self::File { .. } => &[BackendKind::File],
        }
    }

    pub fn allows(&self, backend: BackendKind) -> bool {
        self.allowed_backends().contains(&backend)
    }

    /// The content identifier, for content-network references.
    pub fn cid(&self) -> Option<&str> {
        match self {
            Self::Content { cid, .. } => Some(cid),
            _ => None,
        }
    }

    /// The URL to request from a gateway rooted at `base`.
    ///
    /// Returns `None` for references that gateways may not serve.
    pub fn gateway_url(&self, base: &str) -> Option<String> {
        match self {
            Self::Content { cid, path } => {
                let base = base.trim_end_matches('/');
                Some(match path {
                    Some(path) => format!("{base}/{cid}/{path}"),
                    None => format!("{base}/{cid}"),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content { cid, path: None } => write!(f, "ipfs://{cid}"),
            Self::Content {
                cid,
                path: Some(path),
            } => write!(f, "ipfs://{cid}/{path}"),
            Self::Web { url } => f.write_str(url),
            Self::File { path } => write!(f, "file://{}", path.display()),
        }
    }
}

impl FromStr for ContentReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_content(locator: &str) -> Result<ContentReference, ReferenceError> {
    let locator = locator.trim_start_matches('/');
    if locator.is_empty() {
        return Err(ReferenceError::MissingLocator("ipfs"));
    }

    let (cid, path) = match locator.split_once('/') {
        Some((cid, rest)) => {
            let rest = rest.trim_matches('/');
            (cid, (!rest.is_empty()).then(|| rest.to_string()))
        }
        None => (locator, None),
    };

    validate_cid(cid)?;
    if let Some(path) = &path {
        if path.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(ReferenceError::InvalidCid(format!("{cid}/{path}")));
        }
    }

    Ok(ContentReference::Content {
        cid: cid.to_string(),
        path,
    })
}

/// Content identifiers are multibase strings: base58btc (`Qm…`) or
/// base32/base36 (`b…`, `k…`). Only the alphabet is checked here.
fn validate_cid(cid: &str) -> Result<(), ReferenceError> {
    if cid.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ReferenceError::InvalidCid(cid.to_string()));
    }
    Ok(())
}

fn parse_web(input: &str, locator: &str) -> Result<ContentReference, ReferenceError> {
    let host = locator
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    if host.is_empty() {
        return Err(ReferenceError::MissingLocator("https"));
    }
    if input.chars().any(char::is_whitespace) || host.starts_with(':') {
        return Err(ReferenceError::InvalidUrl(input.to_string()));
    }

    Ok(ContentReference::Web {
        url: input.to_string(),
    })
}

fn parse_file(locator: &str) -> Result<ContentReference, ReferenceError> {
    // `file://localhost/x` names `/x`
    let path = match locator.strip_prefix("localhost") {
        Some(rest) if rest.starts_with('/') => rest,
        _ => locator,
    };

    if path.is_empty() {
        return Err(ReferenceError::MissingLocator("file"));
    }
    if path.contains('\0') {
        return Err(ReferenceError::InvalidPath(path.to_string()));
    }

    Ok(ContentReference::File {
        path: PathBuf::from(path),
    })
}
