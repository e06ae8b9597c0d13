//! Configuration store (spec §6): the external collaborator that supplies
//! per-pane defaults and named "init groups". The core only ever calls the
//! three methods of [`ConfigStore`]; everything else here is how a YAML file
//! on disk gets turned into those answers.
//!
//! Ground truth: workmux `src/config.rs` -- same global + project merge
//! (`~/.config/<tool>/config.yaml` overridden by `.{tool}.yaml`), same
//! `load_from_path`/`load_global`/`load_project` split. The shape of what's
//! being configured is different (pane defaults and service groups instead
//! of worktree/window layout), but the loading mechanics are lifted as-is.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::address::PaneAddress;

/// Per-pane defaults (spec §6): working directory, environment, start
/// command, readiness regex, timeout, and the skip-wrappers list consulted
/// by the process introspector (§4.B).
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct PaneConfig {
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub ready_pattern: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub skip_wrappers: Vec<String>,
}

/// One service inside an init group: its pane defaults plus the
/// dependency-ordering the multi-service initializer consumes (spec §6).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub pane: PaneConfig,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A named multi-pane service layout (spec §6).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct InitGroup {
    pub services: HashMap<String, ServiceConfig>,
}

/// On-disk shape of `.termtap.yaml` / `~/.config/termtap/config.yaml`.
///
/// `panes` is keyed by the address text a user would write (a bare session
/// name, or a full `session:window.pane` triple) -- whichever is specific
/// enough to distinguish the pane being configured.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
struct FileConfig {
    #[serde(default)]
    panes: HashMap<String, PaneConfig>,
    #[serde(default)]
    init_groups: HashMap<String, InitGroup>,
}

impl FileConfig {
    fn load_from_path(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: FileConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(Some(config))
    }

    fn load_global() -> Result<Option<Self>> {
        let Some(home_dir) = home::home_dir() else {
            return Ok(None);
        };
        let path = home_dir.join(".config/termtap/config.yaml");
        if path.exists() {
            return Self::load_from_path(&path);
        }
        let path_yml = home_dir.join(".config/termtap/config.yml");
        Self::load_from_path(&path_yml)
    }

    fn load_project() -> Result<Option<Self>> {
        let path = Path::new(".termtap.yaml");
        if path.exists() {
            return Self::load_from_path(path);
        }
        Self::load_from_path(Path::new(".termtap.yml"))
    }

    /// Project config wins per key; unset project keys fall back to global.
    fn merge(mut self, project: Self) -> Self {
        for (key, value) in project.panes {
            self.panes.insert(key, value);
        }
        for (key, value) in project.init_groups {
            self.init_groups.insert(key, value);
        }
        self
    }
}

/// The three calls the core makes into configuration (spec §6).
pub trait ConfigStore: Send + Sync {
    fn get_pane_config(&self, address: &PaneAddress) -> Result<Option<PaneConfig>>;
    fn get_init_group(&self, name: &str) -> Result<Option<InitGroup>>;
    fn list_init_groups(&self) -> Result<Vec<String>>;
}

/// YAML-file-backed [`ConfigStore`].
pub struct YamlConfigStore {
    config: FileConfig,
}

impl YamlConfigStore {
    /// Load and merge global + project configuration. Missing files are not
    /// an error -- an empty store answers every lookup with `None`.
    pub fn load() -> Result<Self> {
        let global = FileConfig::load_global()?.unwrap_or_default();
        let project = FileConfig::load_project()?.unwrap_or_default();
        Ok(Self {
            config: global.merge(project),
        })
    }
}

impl ConfigStore for YamlConfigStore {
    fn get_pane_config(&self, address: &PaneAddress) -> Result<Option<PaneConfig>> {
        let key = address.as_string();
        if let Some(cfg) = self.config.panes.get(&key) {
            return Ok(Some(cfg.clone()));
        }
        // Fall back to a session-only entry for triple/service addresses
        // that don't have their own specific key.
        let session_key = address.session_name();
        Ok(self.config.panes.get(session_key).cloned())
    }

    fn get_init_group(&self, name: &str) -> Result<Option<InitGroup>> {
        Ok(self.config.init_groups.get(name).cloned())
    }

    fn list_init_groups(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.config.init_groups.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PaneAddress;

    fn store_with(panes: HashMap<String, PaneConfig>, init_groups: HashMap<String, InitGroup>) -> YamlConfigStore {
        YamlConfigStore {
            config: FileConfig { panes, init_groups },
        }
    }

    #[test]
    fn pane_config_matches_exact_key() {
        let mut panes = HashMap::new();
        panes.insert(
            "work:1.0".to_string(),
            PaneConfig {
                start_command: Some("npm run dev".to_string()),
                ..Default::default()
            },
        );
        let store = store_with(panes, HashMap::new());
        let addr = PaneAddress::parse("work:1.0");
        let cfg = store.get_pane_config(&addr).unwrap().unwrap();
        assert_eq!(cfg.start_command.as_deref(), Some("npm run dev"));
    }

    #[test]
    fn pane_config_falls_back_to_session() {
        let mut panes = HashMap::new();
        panes.insert(
            "work".to_string(),
            PaneConfig {
                timeout_secs: Some(30),
                ..Default::default()
            },
        );
        let store = store_with(panes, HashMap::new());
        let addr = PaneAddress::parse("work:2.0");
        let cfg = store.get_pane_config(&addr).unwrap().unwrap();
        assert_eq!(cfg.timeout_secs, Some(30));
    }

    #[test]
    fn unknown_init_group_is_none() {
        let store = store_with(HashMap::new(), HashMap::new());
        assert!(store.get_init_group("missing").unwrap().is_none());
    }

    #[test]
    fn list_init_groups_is_sorted() {
        let mut groups = HashMap::new();
        groups.insert("web".to_string(), InitGroup::default());
        groups.insert("api".to_string(), InitGroup::default());
        let store = store_with(HashMap::new(), groups);
        assert_eq!(store.list_init_groups().unwrap(), vec!["api", "web"]);
    }
}
