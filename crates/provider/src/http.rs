use std::env;

use async_trait::async_trait;
use courseware_core::model::{CourseId, CourseTree};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::blocks::parse_course_blocks;
use crate::repository::{CourseStructureProvider, FetchError};

#[derive(Clone, Debug)]
pub struct HttpProviderConfig {
    pub base_url: Url,
    pub token: Option<String>,
}

impl HttpProviderConfig {
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if `base_url` is not an absolute
    /// http(s) url.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|err| FetchError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        let token = token.filter(|token| !token.trim().is_empty());
        Ok(Self { base_url, token })
    }

    /// Read `COURSEWARE_API_URL` and `COURSEWARE_API_TOKEN`.
    ///
    /// Returns `Ok(None)` when no api url is set.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for a malformed url.
    pub fn from_env() -> Result<Option<Self>, FetchError> {
        let Ok(base_url) = env::var("COURSEWARE_API_URL") else {
            return Ok(None);
        };
        if base_url.trim().is_empty() {
            return Ok(None);
        }
        let token = env::var("COURSEWARE_API_TOKEN").ok();
        Self::new(base_url.trim(), token).map(Some)
    }

    /// `<base>/courses/<course id>/structure`, with the id as one path segment.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if the base url cannot take path segments.
    pub fn structure_url(&self, course_id: &CourseId) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["courses", course_id.as_str(), "structure"]);
        Ok(url)
    }
}

/// Fetches course-blocks payloads from the course structure API.
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpProvider {
    #[must_use]
    pub fn new(config: HttpProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HttpProviderConfig {
        &self.config
    }
}

#[async_trait]
impl CourseStructureProvider for HttpProvider {
    async fn fetch_course_structure(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseTree, FetchError> {
        let url = self.config.structure_url(course_id)?;
        debug!(%course_id, %url, "requesting course structure");

        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound(course_id.clone())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::Forbidden(course_id.clone()));
            }
            status if !status.is_success() => {
                warn!(%course_id, %status, "course structure request failed");
                return Err(FetchError::HttpStatus(status));
            }
            _ => {}
        }

        let body = response.bytes().await?;
        parse_course_blocks(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_url_keeps_course_id_in_one_segment() {
        let config = HttpProviderConfig::new("https://lms.example.com/api/courseware/", None).unwrap();
        let url = config
            .structure_url(&CourseId::new("course-v1:edX+Demo/2024"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://lms.example.com/api/courseware/courses/course-v1:edX+Demo%2F2024/structure"
        );
    }

    #[test]
    fn rejects_non_http_base_urls_and_blank_tokens() {
        assert!(matches!(
            HttpProviderConfig::new("mailto:someone@example.com", None),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpProviderConfig::new("not a url", None),
            Err(FetchError::InvalidUrl(_))
        ));

        let config = HttpProviderConfig::new("http://localhost:18000", Some("  ".into())).unwrap();
        assert_eq!(config.token, None);
    }
}
