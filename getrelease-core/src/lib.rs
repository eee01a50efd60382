// getrelease-core/src/lib.rs
pub mod extract;
pub mod installer;
pub mod link;
pub mod locate;
pub mod platform;
pub mod select;
pub mod store;

// Re-export key types for the CLI crate
pub use installer::{
    InstallOutcome, InstallRequest, Installer, ListEntry, RemoveOutcome, Stage, UpdateOutcome,
    UpdateReport,
};
pub use platform::PlatformFingerprint;
pub use select::SelectionPattern;
pub use store::InstallStore;
