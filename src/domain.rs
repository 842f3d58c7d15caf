use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use url::Url;

pub const LOCAL_FILES: &str = "local_files";
pub const INVALID_OR_OTHER: &str = "invalid_or_other";

/// The authority a history entry is attributed to.
///
/// Equality, hashing and ordering all go through [`DomainLabel::as_str`].
#[derive(Debug, Clone)]
pub enum DomainLabel {
    /// `host[:port]` exactly as written in the URL.
    Host(String),
    /// Any `file:` URL.
    LocalFiles,
    /// Unparseable input or a URL without an authority.
    InvalidOrOther,
}

impl DomainLabel {
    /// Label for a raw authority. Authorities spelled like a sentinel map to
    /// that sentinel, so a label's text always identifies it.
    pub fn from_authority(authority: &str) -> Self {
        match authority {
            LOCAL_FILES => DomainLabel::LocalFiles,
            INVALID_OR_OTHER => DomainLabel::InvalidOrOther,
            host => DomainLabel::Host(host.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DomainLabel::Host(host) => host,
            DomainLabel::LocalFiles => LOCAL_FILES,
            DomainLabel::InvalidOrOther => INVALID_OR_OTHER,
        }
    }

    /// URL written to the derived table for this label.
    pub fn summary_url(&self) -> String {
        match self {
            DomainLabel::LocalFiles => LOCAL_FILES.to_string(),
            other => format!("https://{}", other.as_str()),
        }
    }
}

impl fmt::Display for DomainLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for DomainLabel {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DomainLabel {}

impl Hash for DomainLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Ord for DomainLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for DomainLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extracts the authority of `url`, falling back to a sentinel label.
///
/// The `url` crate decides whether the input is a URL at all and what its
/// scheme is, but the authority itself is sliced from the original text so
/// that hosts keep the case and port they were written with. Credentials in
/// the userinfo part are dropped.
pub fn extract(url: &str) -> DomainLabel {
    let url = url.trim();

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return DomainLabel::InvalidOrOther,
    };

    if parsed.scheme() == "file" {
        return DomainLabel::LocalFiles;
    }

    match raw_authority(url) {
        Some(authority) if parsed.has_host() => DomainLabel::from_authority(authority),
        _ => DomainLabel::InvalidOrOther,
    }
}

fn raw_authority(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once(':')?;
    let rest = rest.strip_prefix("//")?;
    let end = rest.find(['/', '?', '#', '\\']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = match authority.rfind('@') {
        Some(at) => &authority[at + 1..],
        None => authority,
    };

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Masks every label of `domain` except the TLD. Short second-level labels
/// (`co.uk`, `bbc.com`) collapse to `???` so they cannot be guessed.
pub fn redact_domain(domain: &str) -> String {
    let Some((rest, tld)) = domain.rsplit_once('.') else {
        return domain.to_string();
    };

    let second_level = rest.rsplit('.').next().unwrap_or(rest);
    if second_level.chars().count() <= 3 {
        return format!("???.{tld}");
    }

    let masked: String = rest
        .chars()
        .map(|c| if c == '.' { '.' } else { '*' })
        .collect();
    format!("{masked}.{tld}")
}
