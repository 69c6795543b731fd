use std::fmt;
use std::time::Duration;

use crate::identity::IdentityProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// One plain GET; the body is parsed as served.
    Http,
    /// A headless browser renders the page and the live DOM is read back.
    Browser,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Browser => "browser",
        })
    }
}

/// One configured way of getting the page: who we claim to be, how the page
/// is rendered, and how long we wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalStrategy {
    pub name: String,
    pub identity: IdentityProfile,
    pub mode: RenderMode,
    pub timeout: Duration,
}

impl RetrievalStrategy {
    pub fn http(identity: IdentityProfile, timeout: Duration) -> Self {
        Self {
            name: format!("http:{}", identity.name),
            identity,
            mode: RenderMode::Http,
            timeout,
        }
    }

    pub fn browser(identity: IdentityProfile, timeout: Duration) -> Self {
        Self {
            name: "browser".to_string(),
            identity,
            mode: RenderMode::Browser,
            timeout,
        }
    }

    /// One HTTP strategy per profile in [`IdentityProfile::rotation`].
    pub fn http_rotation(timeout: Duration) -> Vec<Self> {
        IdentityProfile::rotation()
            .into_iter()
            .map(|identity| Self::http(identity, timeout))
            .collect()
    }
}
