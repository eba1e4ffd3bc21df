//! Host platform naming as used by the Kubernetes release mirror

/// Operating system and architecture in Kubernetes release naming
/// (`linux`/`darwin`/`windows`, `amd64`/`arm64`/...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// The platform this process is running on.
    pub fn current() -> Self {
        Self::from_rust_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn from_rust_target(os: &'static str, arch: &'static str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "powerpc64" => "ppc64le",
            other => other,
        };
        Self { os, arch }
    }

    /// `<os>-<arch>`, used to keep cache directories of different hosts apart.
    pub fn key(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    pub fn exe_suffix(&self) -> &'static str {
        if self.os == "windows" { ".exe" } else { "" }
    }
}
