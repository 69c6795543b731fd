use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, HeaderMap, HeaderName,
    HeaderValue, PRAGMA, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_ENCODING_ALL: &str = "gzip, deflate, br";

/// The client-identifying headers presented on a fetch. Built once when the
/// strategy list is defined and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub name: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
}

impl IdentityProfile {
    fn browser(name: &str, user_agent: &str, accept_language: &str) -> Self {
        Self {
            name: name.to_string(),
            user_agent: user_agent.to_string(),
            accept: ACCEPT_HTML.to_string(),
            accept_language: accept_language.to_string(),
            accept_encoding: ACCEPT_ENCODING_ALL.to_string(),
        }
    }

    pub fn chrome_macos() -> Self {
        Self::browser(
            "chrome-macos",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "en-US,en;q=0.5",
        )
    }

    pub fn chrome_windows() -> Self {
        Self::browser(
            "chrome-windows",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
            "en-US,en;q=0.9,th;q=0.8",
        )
    }

    pub fn firefox_linux() -> Self {
        Self::browser(
            "firefox-linux",
            "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
            "en-US,en;q=0.5",
        )
    }

    pub fn safari_macos() -> Self {
        Self::browser(
            "safari-macos",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
            "en-US,en;q=0.9",
        )
    }

    pub fn chrome_android() -> Self {
        Self::browser(
            "chrome-android",
            "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36",
            "th-TH,th;q=0.9,en-US;q=0.8,en;q=0.7",
        )
    }

    /// Rotation order for plain HTTP attempts; every entry is a distinct
    /// browser/OS pairing.
    pub fn rotation() -> Vec<Self> {
        vec![
            Self::chrome_macos(),
            Self::chrome_windows(),
            Self::firefox_linux(),
            Self::safari_macos(),
            Self::chrome_android(),
        ]
    }

    /// Navigation headers for a top-level document request. Values that
    /// are not valid header text are skipped rather than sent mangled.
    pub fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (name, value) in [
            (USER_AGENT, &self.user_agent),
            (ACCEPT, &self.accept),
            (ACCEPT_LANGUAGE, &self.accept_language),
            (ACCEPT_ENCODING, &self.accept_encoding),
        ] {
            if let Ok(v) = HeaderValue::from_str(value) {
                h.insert(name, v);
            }
        }
        h.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        h.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        h.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        h.insert(DNT, HeaderValue::from_static("1"));

        h.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("none"),
        );
        h.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        h.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        h
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn rotation_has_distinct_signatures() {
        let profiles = IdentityProfile::rotation();
        assert!(profiles.len() >= 4);
        let agents: HashSet<_> = profiles.iter().map(|p| p.user_agent.as_str()).collect();
        let names: HashSet<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(agents.len(), profiles.len());
        assert_eq!(names.len(), profiles.len());
    }

    #[test]
    fn headers_carry_identity() {
        let profile = IdentityProfile::firefox_linux();
        let h = profile.headers();
        assert_eq!(h[USER_AGENT], profile.user_agent.as_str());
        assert_eq!(h[ACCEPT_LANGUAGE], "en-US,en;q=0.5");
        assert_eq!(h[ACCEPT_ENCODING], ACCEPT_ENCODING_ALL);
        assert_eq!(h["sec-fetch-mode"], "navigate");
    }

    #[test]
    fn invalid_header_text_is_skipped() {
        let mut profile = IdentityProfile::chrome_macos();
        profile.accept_language = "en\nUS".to_string();
        let h = profile.headers();
        assert!(!h.contains_key(ACCEPT_LANGUAGE));
        assert!(h.contains_key(USER_AGENT));
    }
}
