//! `bins`: list the kubectl binaries kubewrap can see

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::kubectl::binary::KubectlBinaries;
use crate::kubectl::error::FinderError;
use crate::kubectl::finder::BinaryFinder;

#[derive(Tabled)]
struct BinaryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Binary")]
    binary: String,
}

/// System and local binaries, one titled table per source
pub fn render(finder: &dyn BinaryFinder) -> String {
    let mut out = String::new();
    render_section(&mut out, "system-wide kubectl binaries", finder.system_binaries());
    out.push_str("\n\n");
    render_section(&mut out, "local kubectl binaries", finder.local_binaries());
    out
}

fn render_section(out: &mut String, title: &str, binaries: Result<KubectlBinaries, FinderError>) {
    out.push_str(title);
    out.push('\n');

    match binaries {
        Err(e) => out.push_str(&format!("Error retrieving binaries: {e}\n")),
        Ok(binaries) if binaries.is_empty() => out.push_str("No binaries found.\n"),
        Ok(binaries) => {
            let rows = binaries
                .sorted(false)
                .iter()
                .enumerate()
                .map(|(i, b)| BinaryRow {
                    index: i + 1,
                    version: b.version.to_string(),
                    binary: b.path.display().to_string(),
                })
                .collect::<Vec<_>>();

            let mut table = Table::new(rows);
            table.with(Style::sharp());
            out.push_str(&table.to_string());
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubectl::binary::KubectlBinary;
    use crate::kubectl::finder::MockBinaryFinder;
    use crate::kubectl::version::KubectlVersion;
    use std::path::PathBuf;

    #[test]
    fn render_lists_both_sources() {
        let mut finder = MockBinaryFinder::new();
        finder.expect_system_binaries().returning(|| {
            Ok(KubectlBinaries::new(vec![KubectlBinary::new(
                "/usr/bin/kubectl",
                KubectlVersion::new(1, 28, 4),
            )]))
        });
        finder.expect_local_binaries().returning(|| {
            Ok(KubectlBinaries::new(vec![
                KubectlBinary::new("/home/u/.kubewrap/bin/linux-amd64/kubectl1.30.1", KubectlVersion::new(1, 30, 1)),
                KubectlBinary::new("/home/u/.kubewrap/bin/linux-amd64/kubectl1.29.0", KubectlVersion::new(1, 29, 0)),
            ]))
        });

        let out = render(&finder);

        let (system, local) = out.split_once("local kubectl binaries").unwrap();
        assert!(system.starts_with("system-wide kubectl binaries\n"));
        assert!(system.contains("1.28.4"));
        assert!(system.contains("/usr/bin/kubectl"));
        assert!(local.contains("Version"));
        assert!(local.find("1.29.0").unwrap() < local.find("1.30.1").unwrap());
    }

    #[test]
    fn render_reports_empty_and_failing_sources() {
        let mut finder = MockBinaryFinder::new();
        finder.expect_system_binaries().returning(|| {
            Err(FinderError::Io {
                path: PathBuf::from("/usr/bin"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });
        finder
            .expect_local_binaries()
            .returning(|| Ok(KubectlBinaries::default()));

        let out = render(&finder);

        assert!(out.contains("Error retrieving binaries: failed to scan \"/usr/bin\""));
        assert!(out.ends_with("local kubectl binaries\nNo binaries found.\n"));
    }
}
