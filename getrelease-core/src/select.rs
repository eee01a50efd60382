// getrelease-core/src/select.rs
//! Narrows a release's asset list to the single asset for this platform.
use getrelease_common::error::{GrError, Result};
use getrelease_common::model::ReleaseAsset;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::platform::PlatformFingerprint;

/// Suffixes of assets that are never an installable artifact.
const VETOED_SUFFIXES: &[&str] = &[
    ".sha256", ".sha256sum", ".sha512", ".sha1", ".md5", ".sum", ".sig", ".asc", ".pem",
    ".sbom", ".deb", ".rpm", ".apk", ".msi", ".pkg", ".dmg", "checksums.txt",
];

/// How the asset is chosen: inferred from the platform, or a user regex that
/// replaces platform inference entirely.
#[derive(Debug, Clone)]
pub enum SelectionPattern {
    Platform {
        os: Option<Regex>,
        arch: Option<Regex>,
        label: String,
    },
    Override(Regex),
}

impl SelectionPattern {
    pub fn from_platform(fingerprint: &PlatformFingerprint) -> Result<Self> {
        Ok(Self::Platform {
            os: fingerprint.os_regex()?,
            arch: fingerprint.arch_regex()?,
            label: fingerprint.label(),
        })
    }

    /// Case-insensitive user pattern.
    pub fn from_user(pattern: &str) -> Result<Self> {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self::Override(re))
    }

    /// The user pattern when one is given, platform inference otherwise.
    pub fn resolve(asset_pattern: Option<&str>, fingerprint: &PlatformFingerprint) -> Result<Self> {
        match asset_pattern.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Self::from_user(p),
            None => Self::from_platform(fingerprint),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Platform { label, .. } => format!("platform {label}"),
            Self::Override(re) => format!("asset pattern '{}'", re.as_str()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Platform { os, arch, .. } => {
                let hit = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(name));
                !is_vetoed(name) && hit(os) && hit(arch)
            }
            Self::Override(re) => re.is_match(name),
        }
    }
}

fn is_vetoed(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VETOED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Picks exactly one asset.
///
/// Zero matches fail with the full asset list, several with just the
/// matching ones; ambiguity is never resolved automatically.
pub fn select(assets: &[ReleaseAsset], pattern: &SelectionPattern) -> Result<ReleaseAsset> {
    let matched: Vec<&ReleaseAsset> = assets.iter().filter(|a| pattern.matches(&a.name)).collect();
    debug!(
        "{} of {} assets match {}: {:?}",
        matched.len(),
        assets.len(),
        pattern.describe(),
        matched.iter().map(|a| a.name.as_str()).collect::<Vec<_>>()
    );
    match matched.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(GrError::NoMatch {
            pattern: pattern.describe(),
            candidates: assets.to_vec(),
        }),
        many => Err(GrError::AmbiguousAsset {
            pattern: pattern.describe(),
            candidates: many.iter().map(|a| (*a).clone()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<ReleaseAsset> {
        names
            .iter()
            .map(|n| ReleaseAsset {
                name: n.to_string(),
                download_url: format!("https://github.com/o/tool/releases/download/v1/{n}"),
                size: 10,
            })
            .collect()
    }

    fn linux_amd64() -> SelectionPattern {
        SelectionPattern::from_platform(&PlatformFingerprint::for_target("linux", "x86_64")).unwrap()
    }

    #[test]
    fn selects_the_only_platform_match() {
        let list = assets(&["tool-linux-amd64.tar.gz", "tool-darwin-amd64.tar.gz"]);
        let picked = select(&list, &linux_amd64()).unwrap();
        assert_eq!(picked.name, "tool-linux-amd64.tar.gz");
    }

    #[test]
    fn gnu_and_musl_are_ambiguous_until_overridden() {
        let list = assets(&[
            "tool-x86_64-unknown-linux-gnu.tar.gz",
            "tool-x86_64-unknown-linux-musl.tar.gz",
        ]);
        match select(&list, &linux_amd64()) {
            Err(GrError::AmbiguousAsset { candidates, .. }) => assert_eq!(candidates, list),
            other => panic!("expected ambiguity, got {other:?}"),
        }

        let pattern = SelectionPattern::resolve(Some("gnu"), &PlatformFingerprint::detect()).unwrap();
        let picked = select(&list, &pattern).unwrap();
        assert_eq!(picked.name, "tool-x86_64-unknown-linux-gnu.tar.gz");
    }

    #[test]
    fn no_match_reports_full_input() {
        let list = assets(&["tool-windows-amd64.zip", "tool-darwin-arm64.tar.gz"]);
        match select(&list, &linux_amd64()) {
            Err(GrError::NoMatch { candidates, .. }) => assert_eq!(candidates, list),
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_candidates_are_only_the_matches() {
        let list = assets(&[
            "tool-linux-amd64.tar.gz",
            "tool-linux-amd64.zip",
            "tool-linux-arm64.tar.gz",
            "tool-darwin-amd64.tar.gz",
        ]);
        match select(&list, &linux_amd64()) {
            Err(GrError::AmbiguousAsset { candidates, .. }) => {
                let names: Vec<_> = candidates.iter().map(|a| a.name.as_str()).collect();
                assert_eq!(names, ["tool-linux-amd64.tar.gz", "tool-linux-amd64.zip"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn checksum_sidecars_do_not_cause_ambiguity() {
        let list = assets(&[
            "tool-linux-amd64.tar.gz",
            "tool-linux-amd64.tar.gz.sha256",
            "tool_1.0_linux_amd64.deb",
        ]);
        assert_eq!(select(&list, &linux_amd64()).unwrap().name, "tool-linux-amd64.tar.gz");
    }

    #[test]
    fn override_is_case_insensitive_and_ignores_platform() {
        let list = assets(&["tool-darwin-amd64.tar.gz", "tool-linux-amd64.tar.gz"]);
        let pattern = SelectionPattern::from_user("DARWIN").unwrap();
        assert_eq!(select(&list, &pattern).unwrap().name, "tool-darwin-amd64.tar.gz");
    }

    #[test]
    fn empty_fingerprint_never_matches() {
        let list = assets(&["tool-linux-amd64.tar.gz"]);
        let pattern =
            SelectionPattern::from_platform(&PlatformFingerprint::for_target("plan9", "vax")).unwrap();
        assert!(matches!(select(&list, &pattern), Err(GrError::NoMatch { .. })));
    }

    #[test]
    fn empty_release_is_no_match() {
        assert!(matches!(
            select(&[], &linux_amd64()),
            Err(GrError::NoMatch { candidates, .. }) if candidates.is_empty()
        ));
    }

    #[test]
    fn blank_asset_pattern_falls_back_to_platform() {
        let fp = PlatformFingerprint::for_target("linux", "x86_64");
        assert!(matches!(
            SelectionPattern::resolve(Some("  "), &fp).unwrap(),
            SelectionPattern::Platform { .. }
        ));
        assert!(SelectionPattern::resolve(Some("("), &fp).is_err());
    }
}
