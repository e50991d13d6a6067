// ─── Maven coordinates ───
// Distribution modules without an explicit artifact path carry a Maven
// identifier; its components decide where the file lives on disk.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A fully parsed Maven identifier.
///
/// Supported shapes:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
///   `group:artifact:version@extension`
///   `group:artifact:version:classifier@extension`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenComponents {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension. Defaults to `"jar"`.
    pub extension: String,
}

impl MavenComponents {
    pub fn parse(id: &str) -> CoreResult<Self> {
        // Split off @extension first
        let (coord_part, extension_override) = if let Some(idx) = id.rfind('@') {
            (&id[..idx], Some(&id[idx + 1..]))
        } else {
            (id, None)
        };

        let parts: Vec<&str> = coord_part.split(':').collect();

        match parts.len() {
            3 => Ok(Self {
                group: parts[0].to_string(),
                artifact: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: None,
                extension: extension_override.unwrap_or("jar").to_string(),
            }),
            4 => Ok(Self {
                group: parts[0].to_string(),
                artifact: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: Some(parts[3].to_string()),
                extension: extension_override.unwrap_or("jar").to_string(),
            }),
            _ => Err(CoreError::InvalidMavenCoordinate(id.to_string())),
        }
    }

    /// Group portion as a path (`net/minecraftforge`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// `artifact-version[-classifier].extension`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.extension),
            None => format!("{}-{}.{}", self.artifact, self.version, self.extension),
        }
    }

    /// Repository-relative path mirroring the Maven layout:
    /// `<group_path>/<artifact>/<version>/<filename>`
    pub fn repo_path(&self) -> PathBuf {
        PathBuf::from(self.group_path())
            .join(&self.artifact)
            .join(&self.version)
            .join(self.filename())
    }

    /// Full URL under a repository base.
    pub fn url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact,
            self.version,
            self.filename()
        )
    }
}

impl fmt::Display for MavenComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(c) => write!(
                f,
                "{}:{}:{}:{}@{}",
                self.group, self.artifact, self.version, c, self.extension
            ),
            None => write!(
                f,
                "{}:{}:{}@{}",
                self.group, self.artifact, self.version, self.extension
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_coordinate() {
        let m = MavenComponents::parse("net.minecraftforge:forge:1.12.2-14.23.5.2854").unwrap();
        assert_eq!(m.group, "net.minecraftforge");
        assert_eq!(m.artifact, "forge");
        assert_eq!(m.version, "1.12.2-14.23.5.2854");
        assert_eq!(m.classifier, None);
        assert_eq!(m.extension, "jar");
    }

    #[test]
    fn parse_with_classifier_and_extension() {
        let m = MavenComponents::parse("net.minecraftforge:forge:1.12.2-14.23.5.2854:universal@jar")
            .unwrap();
        assert_eq!(m.classifier.as_deref(), Some("universal"));
        assert_eq!(m.extension, "jar");

        let json = MavenComponents::parse("com.example:pack:2.0@json").unwrap();
        assert_eq!(json.extension, "json");
    }

    #[test]
    fn rejects_short_coordinates() {
        assert!(MavenComponents::parse("just:two").is_err());
    }

    #[test]
    fn repo_path_layout() {
        let m = MavenComponents::parse("net.fabricmc:fabric-loader:0.16.10").unwrap();
        assert_eq!(
            m.repo_path(),
            PathBuf::from("net/fabricmc/fabric-loader/0.16.10/fabric-loader-0.16.10.jar")
        );
    }

    #[test]
    fn url_construction() {
        let m = MavenComponents::parse("net.fabricmc:fabric-loader:0.16.10").unwrap();
        assert_eq!(
            m.url("https://maven.fabricmc.net/"),
            "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.16.10/fabric-loader-0.16.10.jar"
        );
    }
}
