//! Host operating system primitives: distribution detection and command
//! execution.

pub mod command;

use std::collections::HashMap;
use std::path::Path;

use devhost_shared::errors::DevhostResult;

use crate::constants::host_paths::{OS_RELEASE, OS_RELEASE_FALLBACK};
pub use command::{CommandOutput, CommandRunner, SystemRunner};

/// Linux distribution family, from the `ID` field of `os-release`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsType {
    Ubuntu,
    Rhel,
    CentOS,
    Fedora,
    /// Any distribution without dedicated handling, keeping its `ID`.
    Other(String),
}

impl OsType {
    pub fn from_id(id: &str) -> Self {
        match id {
            "ubuntu" => OsType::Ubuntu,
            "rhel" => OsType::Rhel,
            "centos" => OsType::CentOS,
            "fedora" => OsType::Fedora,
            other => OsType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsType::Ubuntu => "ubuntu",
            OsType::Rhel => "rhel",
            OsType::CentOS => "centos",
            OsType::Fedora => "fedora",
            OsType::Other(id) => id,
        }
    }

    pub fn is_redhat_family(&self) -> bool {
        matches!(self, OsType::Rhel | OsType::CentOS | OsType::Fedora)
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `os-release` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: OsType,
    pub version_id: Option<String>,
    pub pretty_name: Option<String>,
}

/// Parse `os-release` content into a key-value map.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    vars
}

impl OsRelease {
    pub fn from_content(content: &str) -> Self {
        let mut vars = parse_os_release(content);
        let id = vars.remove("ID").unwrap_or_else(|| "linux".to_string());
        Self {
            id: OsType::from_id(&id),
            version_id: vars.remove("VERSION_ID"),
            pretty_name: vars.remove("PRETTY_NAME"),
        }
    }
}

/// Read `/etc/os-release`, falling back to `/usr/lib/os-release`.
pub fn get_os_release() -> DevhostResult<OsRelease> {
    read_os_release(Path::new(OS_RELEASE))
        .or_else(|_| read_os_release(Path::new(OS_RELEASE_FALLBACK)))
}

pub fn read_os_release(path: &Path) -> DevhostResult<OsRelease> {
    let content = std::fs::read_to_string(path)?;
    Ok(OsRelease::from_content(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fedora() {
        let content = r#"
NAME="Fedora Linux"
VERSION_ID=39
ID=fedora
PRETTY_NAME="Fedora Linux 39 (Workstation Edition)"
"#;
        let release = OsRelease::from_content(content);
        assert_eq!(release.id, OsType::Fedora);
        assert_eq!(release.version_id.as_deref(), Some("39"));
        assert!(release.id.is_redhat_family());
    }

    #[test]
    fn test_parse_unknown_keeps_id() {
        let release = OsRelease::from_content("ID=arch\n# comment\nBUILD_ID=rolling\n");
        assert_eq!(release.id, OsType::Other("arch".to_string()));
        assert_eq!(release.id.to_string(), "arch");
        assert!(!release.id.is_redhat_family());
    }

    #[test]
    fn test_ubuntu_is_not_redhat() {
        let release = OsRelease::from_content("ID=ubuntu\nVERSION_ID=\"22.04\"\n");
        assert_eq!(release.id, OsType::Ubuntu);
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_os_release(Path::new("/nonexistent/os-release")).is_err());
    }
}
