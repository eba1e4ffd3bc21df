//! Discovered kubectl binaries and selection over them

use std::path::PathBuf;

use crate::kubectl::version::KubectlVersion;

/// A kubectl binary found on disk together with the version it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlBinary {
    pub path: PathBuf,
    pub version: KubectlVersion,
}

impl KubectlBinary {
    pub fn new(path: impl Into<PathBuf>, version: KubectlVersion) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }
}

/// An ordered list of discovered binaries.
///
/// Entries sharing a version but living at different paths are all kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubectlBinaries {
    binaries: Vec<KubectlBinary>,
}

impl KubectlBinaries {
    pub fn new(binaries: Vec<KubectlBinary>) -> Self {
        Self { binaries }
    }

    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KubectlBinary> {
        self.binaries.iter()
    }

    pub fn push(&mut self, binary: KubectlBinary) {
        self.binaries.push(binary);
    }

    pub fn append(&mut self, other: KubectlBinaries) {
        self.binaries.extend(other.binaries);
    }

    /// Sort by version, oldest first, or newest first when `reverse` is set.
    /// The sort is stable so equal versions keep their scan order.
    pub fn sort(&mut self, reverse: bool) {
        if reverse {
            self.binaries.sort_by(|a, b| b.version.cmp(&a.version));
        } else {
            self.binaries.sort_by(|a, b| a.version.cmp(&b.version));
        }
    }

    pub fn sorted(mut self, reverse: bool) -> Self {
        self.sort(reverse);
        self
    }

    /// The newest binary. Releases win over prereleases; a prerelease is only
    /// picked when no release binary exists at all.
    pub fn most_recent(&self) -> Option<&KubectlBinary> {
        let newest = |include_prereleases: bool| {
            self.binaries
                .iter()
                .filter(|b| include_prereleases || !b.version.is_prerelease())
                .rev()
                .max_by(|a, b| a.version.cmp(&b.version))
        };

        newest(false).or_else(|| newest(true))
    }

    /// The binary best suited to talk to a server at `requested`.
    ///
    /// Only binaries inside the version-skew window are considered. Among
    /// those, the newest one not exceeding `requested` wins; failing that, the
    /// oldest one above it. Ties go to the binary listed first.
    pub fn compatible_with(&self, requested: &KubectlVersion) -> Option<&KubectlBinary> {
        let (at_or_below, above): (Vec<&KubectlBinary>, Vec<&KubectlBinary>) = self
            .binaries
            .iter()
            .filter(|b| b.version.is_compatible_with(requested))
            .partition(|b| b.version <= *requested);

        at_or_below
            .into_iter()
            .rev()
            .max_by(|a, b| a.version.cmp(&b.version))
            .or_else(|| above.into_iter().min_by(|a, b| a.version.cmp(&b.version)))
    }

    pub fn into_vec(self) -> Vec<KubectlBinary> {
        self.binaries
    }
}

impl FromIterator<KubectlBinary> for KubectlBinaries {
    fn from_iter<I: IntoIterator<Item = KubectlBinary>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for KubectlBinaries {
    type Item = KubectlBinary;
    type IntoIter = std::vec::IntoIter<KubectlBinary>;

    fn into_iter(self) -> Self::IntoIter {
        self.binaries.into_iter()
    }
}

impl<'a> IntoIterator for &'a KubectlBinaries {
    type Item = &'a KubectlBinary;
    type IntoIter = std::slice::Iter<'a, KubectlBinary>;

    fn into_iter(self) -> Self::IntoIter {
        self.binaries.iter()
    }
}
