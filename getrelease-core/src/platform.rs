// getrelease-core/src/platform.rs
//! Classifies the running machine into OS and CPU architecture name patterns.
//!
//! Release naming is not standardized, so every entry lists the regex
//! fragments maintainers are known to use, most specific first.
use std::env::consts;

use getrelease_common::error::Result;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// `std::env::consts::OS` value → acceptable OS tokens.
pub const OS_TOKENS: &[(&str, &[&str])] = &[
    ("linux", &["linux"]),
    ("macos", &["darwin", "mac[-_.]?os", "osx", "apple"]),
    (
        "windows",
        &["windows", "win64", "win32", "(?:^|[^a-z])win(?:[^a-z]|$)"],
    ),
    ("android", &["android"]),
    ("freebsd", &["freebsd"]),
    ("netbsd", &["netbsd"]),
    ("openbsd", &["openbsd"]),
    ("dragonfly", &["dragonfly"]),
    ("illumos", &["illumos", "solaris"]),
    ("solaris", &["solaris", "illumos"]),
];

/// `std::env::consts::ARCH` value → acceptable architecture tokens.
pub const ARCH_TOKENS: &[(&str, &[&str])] = &[
    ("x86_64", &["x86[-_]?64", "amd64", "x64"]),
    ("aarch64", &["aarch64", "arm64", "armv8[-_]?a"]),
    (
        "x86",
        &["i[3-6]86", "x86[-_]32", "ia[-_]?32", "(?:^|[^0-9a-z.])386(?:[^0-9a-z]|$)"],
    ),
    ("arm", &["armv7l?", "armv6l?", "armhf", "armel", "arm32"]),
    ("powerpc64", &["ppc64(?:le)?", "powerpc64(?:le)?"]),
    ("powerpc", &["ppc32", "powerpc(?:[^6]|$)"]),
    ("s390x", &["s390x"]),
    ("riscv64", &["riscv64(?:gc)?"]),
    ("mips64", &["mips64(?:el|le)?"]),
    ("mips", &["mips(?:el|le)?(?:[^6]|$)"]),
    ("sparc64", &["sparc64", "sun4[uv]"]),
    ("loongarch64", &["loongarch64", "loong64"]),
];

/// OS/architecture fingerprint of a host, computed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFingerprint {
    pub os: String,
    pub arch: String,
    pub os_tokens: Vec<String>,
    pub arch_tokens: Vec<String>,
}

fn lookup(table: &[(&str, &[&str])], key: &str) -> Vec<String> {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, tokens)| tokens.iter().map(|t| t.to_string()).collect())
        .unwrap_or_default()
}

impl PlatformFingerprint {
    /// Fingerprint of the machine this process runs on.
    pub fn detect() -> Self {
        Self::for_target(consts::OS, consts::ARCH)
    }

    /// Fingerprint for an arbitrary `std::env::consts`-style OS/arch pair.
    ///
    /// Unknown values yield empty token lists instead of an error.
    pub fn for_target(os: &str, arch: &str) -> Self {
        let os_tokens = lookup(OS_TOKENS, os);
        let arch_tokens = lookup(ARCH_TOKENS, arch);
        if os_tokens.is_empty() {
            warn!("Operating system '{}' is not recognized; no asset will match it", os);
        }
        if arch_tokens.is_empty() {
            warn!("CPU architecture '{}' is not recognized; no asset will match it", arch);
        }
        let fp = Self {
            os: os.to_string(),
            arch: arch.to_string(),
            os_tokens,
            arch_tokens,
        };
        debug!("Platform fingerprint: {:?}", fp);
        fp
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }

    pub fn os_regex(&self) -> Result<Option<Regex>> {
        alternation(&self.os_tokens)
    }

    pub fn arch_regex(&self) -> Result<Option<Regex>> {
        alternation(&self.arch_tokens)
    }

    /// Whether `name` mentions this platform's OS or architecture.
    pub fn mentions_platform(&self, name: &str) -> bool {
        [self.os_regex(), self.arch_regex()]
            .into_iter()
            .any(|re| matches!(re, Ok(Some(re)) if re.is_match(name)))
    }
}

/// Case-insensitive alternation of `tokens`; `None` when there are none.
pub(crate) fn alternation(tokens: &[String]) -> Result<Option<Regex>> {
    if tokens.is_empty() {
        return Ok(None);
    }
    let pattern = format!("(?:{})", tokens.join("|"));
    Ok(Some(
        RegexBuilder::new(&pattern).case_insensitive(true).build()?,
    ))
}
