//! Schema release versions

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semver increment a schema change calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
    None,
    Patch,
    Minor,
    Major,
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bump::None => write!(f, "none"),
            Bump::Patch => write!(f, "patch"),
            Bump::Minor => write!(f, "minor"),
            Bump::Major => write!(f, "major"),
        }
    }
}

/// A released schema version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub version: Version,
    pub created_at: DateTime<Utc>,
    /// Version this one was bumped from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}

impl SchemaVersion {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            created_at: Utc::now(),
            previous_version: None,
        }
    }

    /// Parse `1.2.3` or `v1.2.3`
    pub fn parse(version_str: &str) -> Result<Self, semver::Error> {
        let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
        let version = Version::parse(version_str)?;
        Ok(Self::new(version))
    }

    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// The version after a change of the given kind
    pub fn bump(&self, bump: Bump) -> Self {
        let v = &self.version;
        let version = match bump {
            Bump::None => return self.clone(),
            Bump::Patch => Version::new(v.major, v.minor, v.patch + 1),
            Bump::Minor => Version::new(v.major, v.minor + 1, 0),
            Bump::Major => Version::new(v.major + 1, 0, 0),
        };
        Self {
            version,
            created_at: Utc::now(),
            previous_version: Some(self.version_string()),
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(Version::new(0, 1, 0))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_with_v_prefix() {
        let v = SchemaVersion::parse("v1.2.3").unwrap();
        assert_eq!(v.version_string(), "1.2.3");
        assert_eq!(v.to_string(), "v1.2.3");
    }

    #[test]
    fn test_version_bumps() {
        let v = SchemaVersion::parse("1.2.3").unwrap();

        assert_eq!(v.bump(Bump::Major).version_string(), "2.0.0");
        assert_eq!(v.bump(Bump::Minor).version_string(), "1.3.0");
        assert_eq!(v.bump(Bump::Patch).version_string(), "1.2.4");
        assert_eq!(v.bump(Bump::None), v);
        assert_eq!(v.bump(Bump::Minor).previous_version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_bump_ordering() {
        assert!(Bump::Major > Bump::Minor);
        assert!(Bump::Patch > Bump::None);
    }
}
