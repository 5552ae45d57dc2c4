//! Public site host used to build links sent by mail

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("site domain cannot be empty")]
pub struct InvalidSiteDomain;

/// Host (optionally with port) the application is served from
///
/// `localhost` hosts are development hosts and get plain `http://` links;
/// everything else gets `https://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDomain(String);

impl SiteDomain {
    pub fn new(domain: impl Into<String>) -> Result<Self, InvalidSiteDomain> {
        let domain = domain.into().trim().trim_end_matches('/').to_string();

        if domain.is_empty() {
            return Err(InvalidSiteDomain);
        }

        Ok(Self(domain))
    }

    pub fn is_dev(&self) -> bool {
        self.0.starts_with("localhost")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL for the given path segments
    pub fn url(&self, segments: &[&str]) -> String {
        let scheme = if self.is_dev() { "http" } else { "https" };
        let path = segments
            .iter()
            .map(|segment| segment.trim_matches('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        format!("{}://{}/{}", scheme, self.0, path)
    }
}
