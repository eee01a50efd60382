// getrelease-common/src/lib.rs
pub mod config;
pub mod error;
pub mod fs;
pub mod model;
pub mod provider;

// Re-export key types
pub use config::Config;
pub use error::{GrError, Result};
pub use model::{InstallationRecord, Release, ReleaseAsset, RepoId, RepoInfo};
pub use provider::{
    AlwaysConfirm, AssetFetcher, ConfirmPrompt, MetadataProvider, NoProgress, ProgressReporter,
};
