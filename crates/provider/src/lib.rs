#![forbid(unsafe_code)]

pub mod blocks;
pub mod file;
pub mod http;
pub mod repository;

pub use blocks::{CourseBlocksPayload, parse_course_blocks};
pub use file::JsonFileProvider;
pub use http::{HttpProvider, HttpProviderConfig};
pub use repository::{CourseStructureProvider, FetchError, InMemoryProvider};
