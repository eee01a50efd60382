// getrelease-common/src/model/mod.rs
pub mod record;
pub mod release;

pub use record::InstallationRecord;
pub use release::{
    url_file_name, Forge, Release, ReleaseAsset, RepoId, RepoInfo, LATEST_TAG, PRERELEASE_TAGS,
};
