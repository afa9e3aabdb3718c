//! Release feed ingestion: upstream listing, the in-memory catalog, and
//! the background poller that keeps the two in sync.

pub mod catalog;
pub mod poller;
pub mod source;

pub use catalog::{Asset, ReleaseCatalog};
pub use poller::Poller;
pub use source::{GithubReleaseSource, Release, ReleaseAsset, ReleaseSource};
