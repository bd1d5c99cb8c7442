//! Node configuration: JSON file merged with command-line overrides

use anyhow::{bail, Context, Result};
use distcache::http::normalize_base_path;
use distcache::{
    GroupOptions, PeerFailurePolicy, DEFAULT_BASE_PATH, DEFAULT_PEER_TIMEOUT, DEFAULT_REPLICAS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Bind address when neither file nor flags set one
pub const DEFAULT_BIND: &str = "127.0.0.1:8001";

/// Paths served by the client API; the peer base path must not shadow them
const RESERVED_PREFIXES: [&str; 3] = ["/api/", "/stats/", "/health/"];

/// One cache group backed by a directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupSpec {
    pub name: String,
    pub capacity: usize,
    pub dir: PathBuf,
}

impl FromStr for GroupSpec {
    type Err = String;

    /// Parse `name=capacity:dir`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=capacity:dir, got '{}'", s))?;
        let (capacity, dir) = rest
            .split_once(':')
            .ok_or_else(|| format!("expected name=capacity:dir, got '{}'", s))?;
        let capacity = capacity
            .trim()
            .parse()
            .map_err(|_| format!("invalid capacity '{}' in '{}'", capacity, s))?;

        Ok(Self {
            name: name.trim().to_string(),
            capacity,
            dir: PathBuf::from(dir),
        })
    }
}

/// Settings as written in the JSON file; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub bind: Option<String>,
    pub self_url: Option<String>,
    pub peers: Option<Vec<String>>,
    pub base_path: Option<String>,
    pub replicas: Option<usize>,
    pub peer_timeout_ms: Option<u64>,
    pub fallback_to_loader: Option<bool>,
    pub groups: Option<Vec<GroupSpec>>,
}

impl ConfigFile {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Fields set in `overrides` win over fields set here
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            bind: overrides.bind.or(self.bind),
            self_url: overrides.self_url.or(self.self_url),
            peers: overrides.peers.or(self.peers),
            base_path: overrides.base_path.or(self.base_path),
            replicas: overrides.replicas.or(self.replicas),
            peer_timeout_ms: overrides.peer_timeout_ms.or(self.peer_timeout_ms),
            fallback_to_loader: overrides.fallback_to_loader.or(self.fallback_to_loader),
            groups: overrides.groups.or(self.groups),
        }
    }
}

/// Fully resolved and validated node settings
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub bind: String,
    pub self_url: String,
    pub peers: Vec<String>,
    pub base_path: String,
    pub replicas: usize,
    pub peer_timeout: Duration,
    pub fallback_to_loader: bool,
    pub groups: Vec<GroupSpec>,
}

impl NodeConfig {
    /// Apply defaults to `file` and validate the result
    pub fn resolve(file: ConfigFile) -> Result<Self> {
        let bind = file.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
        let self_url = file
            .self_url
            .unwrap_or_else(|| format!("http://{}", bind))
            .trim_end_matches('/')
            .to_string();
        let peers: Vec<String> = file
            .peers
            .unwrap_or_default()
            .iter()
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let config = Self {
            peers: if peers.is_empty() {
                vec![self_url.clone()]
            } else {
                peers
            },
            bind,
            self_url,
            base_path: normalize_base_path(file.base_path.as_deref().unwrap_or(DEFAULT_BASE_PATH)),
            replicas: file.replicas.unwrap_or(DEFAULT_REPLICAS),
            peer_timeout: file
                .peer_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PEER_TIMEOUT),
            fallback_to_loader: file.fallback_to_loader.unwrap_or(false),
            groups: file.groups.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.peers.contains(&self.self_url) {
            bail!(
                "peer list {:?} does not include this node ({})",
                self.peers,
                self.self_url
            );
        }
        if self.replicas == 0 {
            bail!("replicas must be greater than 0");
        }
        if self.peer_timeout.is_zero() {
            bail!("peer timeout must be greater than 0");
        }
        if self.base_path == "/"
            || RESERVED_PREFIXES
                .iter()
                .any(|prefix| self.base_path.starts_with(prefix))
        {
            bail!("base path {} collides with the client API", self.base_path);
        }
        if self.groups.is_empty() {
            bail!("no groups configured");
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() {
                bail!("group name must not be empty");
            }
            if group.capacity == 0 {
                bail!("group {} capacity must be greater than 0", group.name);
            }
            if !names.insert(group.name.as_str()) {
                bail!("group {} configured twice", group.name);
            }
        }
        Ok(())
    }

    /// Group options for a group of `capacity` entries
    pub fn group_options(&self, capacity: usize) -> GroupOptions {
        let policy = if self.fallback_to_loader {
            PeerFailurePolicy::FallbackToLoader
        } else {
            PeerFailurePolicy::Fail
        };
        GroupOptions::new(capacity)
            .peer_timeout(self.peer_timeout)
            .peer_failure(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn one_group() -> Option<Vec<GroupSpec>> {
        Some(vec![GroupSpec {
            name: "img".to_string(),
            capacity: 64,
            dir: PathBuf::from("/srv/img"),
        }])
    }

    #[test]
    fn test_group_spec_parse() {
        let spec: GroupSpec = "img=128:/srv/images".parse().unwrap();
        assert_eq!(spec.name, "img");
        assert_eq!(spec.capacity, 128);
        assert_eq!(spec.dir, PathBuf::from("/srv/images"));

        // Only the first ':' separates capacity from the directory
        let spec: GroupSpec = "w=1:C:\\data".parse().unwrap();
        assert_eq!(spec.dir, PathBuf::from("C:\\data"));

        assert!("img".parse::<GroupSpec>().is_err());
        assert!("img=128".parse::<GroupSpec>().is_err());
        assert!("img=lots:/srv".parse::<GroupSpec>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::resolve(ConfigFile {
            groups: one_group(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.self_url, "http://127.0.0.1:8001");
        assert_eq!(config.peers, vec!["http://127.0.0.1:8001"]);
        assert_eq!(config.base_path, DEFAULT_BASE_PATH);
        assert_eq!(config.replicas, DEFAULT_REPLICAS);
        assert_eq!(config.peer_timeout, DEFAULT_PEER_TIMEOUT);
        assert!(!config.fallback_to_loader);
        assert_eq!(
            config.group_options(64).peer_failure,
            PeerFailurePolicy::Fail
        );
    }

    #[test]
    fn test_load_and_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.json");
        fs::write(
            &path,
            r#"{
                "bind": "0.0.0.0:9000",
                "self_url": "http://10.0.0.1:9000/",
                "peers": ["http://10.0.0.1:9000", "http://10.0.0.2:9000"],
                "replicas": 10,
                "groups": [{"name": "img", "capacity": 32, "dir": "/srv/img"}]
            }"#,
        )
        .unwrap();

        let file = ConfigFile::load(&path).unwrap();
        let merged = file.merge(ConfigFile {
            replicas: Some(20),
            fallback_to_loader: Some(true),
            ..Default::default()
        });
        let config = NodeConfig::resolve(merged).unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.self_url, "http://10.0.0.1:9000");
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.replicas, 20);
        assert_eq!(config.groups[0].capacity, 32);
        assert_eq!(
            config.group_options(32).peer_failure,
            PeerFailurePolicy::FallbackToLoader
        );
    }

    #[test]
    fn test_bad_file_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.json");

        assert!(ConfigFile::load(&path).is_err());

        fs::write(&path, r#"{"replicas": 3, "colour": "blue"}"#).unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("colour"));
    }

    #[test]
    fn test_validation() {
        let base = ConfigFile {
            groups: one_group(),
            ..Default::default()
        };

        let cases = [
            ConfigFile {
                peers: Some(vec!["http://other:1".to_string()]),
                ..base.clone()
            },
            ConfigFile {
                replicas: Some(0),
                ..base.clone()
            },
            ConfigFile {
                peer_timeout_ms: Some(0),
                ..base.clone()
            },
            ConfigFile {
                base_path: Some("/".to_string()),
                ..base.clone()
            },
            ConfigFile {
                base_path: Some("/api/peer".to_string()),
                ..base.clone()
            },
            ConfigFile {
                groups: None,
                ..base.clone()
            },
            ConfigFile {
                groups: Some(vec![
                    GroupSpec {
                        name: "img".to_string(),
                        capacity: 1,
                        dir: PathBuf::from("/a"),
                    },
                    GroupSpec {
                        name: "img".to_string(),
                        capacity: 1,
                        dir: PathBuf::from("/b"),
                    },
                ]),
                ..base.clone()
            },
            ConfigFile {
                groups: Some(vec![GroupSpec {
                    name: "img".to_string(),
                    capacity: 0,
                    dir: PathBuf::from("/a"),
                }]),
                ..base.clone()
            },
        ];

        for case in cases {
            assert!(NodeConfig::resolve(case.clone()).is_err(), "{:?}", case);
        }
        assert!(NodeConfig::resolve(base).is_ok());
    }
}
