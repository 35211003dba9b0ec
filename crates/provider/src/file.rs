use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courseware_core::model::{CourseId, CourseTree};
use tracing::debug;

use crate::blocks::parse_course_blocks;
use crate::repository::{CourseStructureProvider, FetchError};

/// Reads course-blocks payloads from disk.
///
/// In directory mode each course lives in `<dir>/<course id>.json`. In
/// single-file mode the one payload answers only for its own course id.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    Directory(PathBuf),
    File(PathBuf),
}

impl JsonFileProvider {
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(path.into()),
        }
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// Pick directory or single-file mode from what `path` points at.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::directory(path)
        } else {
            Self::file(path)
        }
    }

    fn path_for(&self, course_id: &CourseId) -> PathBuf {
        match &self.source {
            Source::Directory(dir) => dir.join(file_name(course_id)),
            Source::File(path) => path.clone(),
        }
    }
}

/// Course ids may contain `/`; keep them inside the directory.
fn file_name(course_id: &CourseId) -> String {
    let stem: String = course_id
        .as_str()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{stem}.json")
}

async fn read(path: &Path, course_id: &CourseId) -> Result<Vec<u8>, FetchError> {
    tokio::fs::read(path).await.map_err(|err| match err.kind() {
        ErrorKind::NotFound => FetchError::NotFound(course_id.clone()),
        _ => FetchError::Io(err),
    })
}

#[async_trait]
impl CourseStructureProvider for JsonFileProvider {
    async fn fetch_course_structure(
        &self,
        course_id: &CourseId,
    ) -> Result<CourseTree, FetchError> {
        let path = self.path_for(course_id);
        debug!(%course_id, path = %path.display(), "reading course structure");

        let bytes = read(&path, course_id).await?;
        let tree = parse_course_blocks(&bytes)?;
        if tree.course().id != *course_id {
            return Err(FetchError::NotFound(course_id.clone()));
        }
        Ok(tree)
    }
}
