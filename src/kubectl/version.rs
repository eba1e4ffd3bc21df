//! Semantic version of a kubectl binary or a Kubernetes control plane

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::kubectl::error::VersionError;

/// Number of minor versions kubectl may be ahead of or behind the API server.
pub const VERSION_SKEW_MINORS: u64 = 1;

/// A kubectl / Kubernetes version.
///
/// Ordering follows semver: major, minor, patch, then prerelease, where a
/// release sorts above its own prereleases (`1.30.0-rc.1 < 1.30.0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubectlVersion(Version);

impl KubectlVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// Parse a version string, tolerating a leading `v` and missing
    /// minor/patch segments.
    ///
    /// Examples:
    /// - "v1.20.1" -> 1.20.1
    /// - "1.20" -> 1.20.0
    /// - "1.30.0-rc.1" -> 1.30.0-rc.1
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let parse_error = |reason: &str| VersionError::Parse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let (core, suffix) = match trimmed.find(['-', '+']) {
            Some(idx) => trimmed.split_at(idx),
            None => (trimmed, ""),
        };

        let segments: Vec<&str> = core.split('.').collect();
        if segments.len() > 3 {
            return Err(parse_error("too many version segments"));
        }

        let mut numbers = [0u64; 3];
        for (slot, segment) in numbers.iter_mut().zip(&segments) {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(parse_error(&format!("{segment:?} is not a number")));
            }
            *slot = segment
                .parse()
                .map_err(|e: std::num::ParseIntError| parse_error(&e.to_string()))?;
        }

        let [major, minor, patch] = numbers;
        Version::parse(&format!("{major}.{minor}.{patch}{suffix}"))
            .map(Self)
            .map_err(|e| parse_error(&e.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// The plain `major.minor.patch` release, without prerelease or build
    /// suffixes such as `-eks-0389ca3` or `+k3s1`.
    pub fn release(&self) -> Self {
        Self::new(self.major(), self.minor(), self.patch())
    }

    /// Whether a kubectl of this version may talk to a server at `target`.
    pub fn is_compatible_with(&self, target: &KubectlVersion) -> bool {
        self.major() == target.major()
            && self.minor().abs_diff(target.minor()) <= VERSION_SKEW_MINORS
    }

    pub fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl From<Version> for KubectlVersion {
    fn from(version: Version) -> Self {
        Self(version)
    }
}

impl FromStr for KubectlVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KubectlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
