use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courseware_core::model::{CourseId, CourseTree, TreeError};
use courseware_core::navigation::FailureReason;
use thiserror::Error;

/// Errors surfaced by course structure providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("course {0} not found")]
    NotFound(CourseId),

    #[error("access to course {0} denied")]
    Forbidden(CourseId),

    #[error("course structure request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    #[error("malformed course structure: {0}")]
    Malformed(String),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Collapse into the failure the navigation layer reports.
    #[must_use]
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            FetchError::NotFound(_) => FailureReason::NotFound,
            _ => FailureReason::LoadFailed,
        }
    }
}

/// Source of course structure for the navigation layer.
#[async_trait]
pub trait CourseStructureProvider: Send + Sync {
    /// Fetch and validate the full hierarchy of one course.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::NotFound` for unknown courses, or transport,
    /// decoding and validation errors.
    async fn fetch_course_structure(&self, course_id: &CourseId)
    -> Result<CourseTree, FetchError>;
}

/// In-memory provider for tests, demos and prototyping.
///
/// Per-course delays let callers reproduce out-of-order responses.
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    courses: Arc<Mutex<HashMap<CourseId, CourseTree>>>,
    delays: Arc<Mutex<HashMap<CourseId, Duration>>>,
    forbidden: Arc<Mutex<HashSet<CourseId>>>,
    fetches: Arc<AtomicUsize>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_course(self, tree: CourseTree) -> Self {
        self.insert(tree);
        self
    }

    /// Add or replace a course, keyed by its own id.
    pub fn insert(&self, tree: CourseTree) {
        if let Ok(mut guard) = self.courses.lock() {
            guard.insert(tree.course().id.clone(), tree);
        }
    }

    pub fn set_delay(&self, course_id: CourseId, delay: Duration) {
        if let Ok(mut guard) = self.delays.lock() {
            guard.insert(course_id, delay);
        }
    }

    pub fn deny(&self, course_id: CourseId) {
        if let Ok(mut guard) = self.forbidden.lock() {
            guard.insert(course_id);
        }
    }

    /// Number of fetches started so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn lookup(&self, course_id: &CourseId) -> Result<(CourseTree, Option<Duration>), FetchError> {
        let forbidden = self
            .forbidden
            .lock()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?
            .contains(course_id);
        if forbidden {
            return Err(FetchError::Forbidden(course_id.clone()));
        }
        let delay = self
            .delays
            .lock()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?
            .get(course_id)
            .copied();
        let tree = self
            .courses
            .lock()
            .map_err(|e| FetchError::Unavailable(e.to_string()))?
            .get(course_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(course_id.clone()))?;
        Ok((tree, delay))
    }
}

#[async_trait]
impl CourseStructureProvider for InMemoryProvider {
    async fn fetch_course_structure(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseTree, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (tree, delay) = self.lookup(course_id)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(id: &str) -> CourseTree {
        CourseTree::builder(id)
            .section("s", "S", |s| s.sequence("q", "Q", |q| q.unit("u")))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn serves_known_courses_and_counts_fetches() {
        let provider = InMemoryProvider::new().with_course(tree("demo"));
        let fetched = provider
            .fetch_course_structure(&CourseId::new("demo"))
            .await
            .unwrap();
        assert_eq!(fetched.course().id, CourseId::new("demo"));
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unknown_and_denied_courses_map_to_failure_reasons() {
        let provider = InMemoryProvider::new().with_course(tree("demo"));
        provider.deny(CourseId::new("demo"));

        let missing = provider
            .fetch_course_structure(&CourseId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(missing, FetchError::NotFound(_)));
        assert_eq!(missing.failure_reason(), FailureReason::NotFound);

        let denied = provider
            .fetch_course_structure(&CourseId::new("demo"))
            .await
            .unwrap_err();
        assert!(matches!(denied, FetchError::Forbidden(_)));
        assert_eq!(denied.failure_reason(), FailureReason::LoadFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_holds_the_response() {
        let provider = InMemoryProvider::new().with_course(tree("slow"));
        provider.set_delay(CourseId::new("slow"), Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        provider
            .fetch_course_structure(&CourseId::new("slow"))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
