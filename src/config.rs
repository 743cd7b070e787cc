use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use crate::graph::JoinKind;

pub const CONFIG_FILE: &str = "sqlgraph.toml";

/// Contents of `sqlgraph.toml`. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SqlgraphConfig {
    pub database: Option<String>,
    pub join: JoinKind,
}

impl SqlgraphConfig {
    /// Reads the config at `path`. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
        }

        let contents = toml::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    /// Picks the database file: `explicit` wins, then the configured path,
    /// then `.sqlgraph/sqlgraph.db`. Relative paths resolve against `base`.
    pub fn resolve_database(&self, explicit: Option<&Path>, base: &Path) -> PathBuf {
        match (explicit, &self.database) {
            (Some(path), _) => base.join(path),
            (None, Some(path)) => base.join(path),
            (None, None) => base.join(".sqlgraph").join("sqlgraph.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqlgraphConfig::load(&dir.path().join(CONFIG_FILE)).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "join = \"inner\"\n").unwrap();

        let config = SqlgraphConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.join, JoinKind::Inner);
        assert_eq!(config.database, None);
        assert_eq!(
            config.resolve_database(None, dir.path()),
            dir.path().join(".sqlgraph").join("sqlgraph.db")
        );
    }

    #[test]
    fn test_explicit_database_beats_config() {
        let base = Path::new("/srv/graphs");
        let config = SqlgraphConfig {
            database: Some("configured.db".into()),
            join: JoinKind::Left,
        };

        assert_eq!(config.resolve_database(None, base), base.join("configured.db"));
        assert_eq!(
            config.resolve_database(Some(Path::new("cli.db")), base),
            base.join("cli.db")
        );
        assert_eq!(
            config.resolve_database(Some(Path::new("/tmp/abs.db")), base),
            PathBuf::from("/tmp/abs.db")
        );
    }

    #[test]
    fn test_save_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = SqlgraphConfig {
            database: Some("graph.db".into()),
            join: JoinKind::Inner,
        };

        config.save(&path, false).unwrap();
        assert!(config.save(&path, false).is_err());
        config.save(&path, true).unwrap();

        assert_eq!(SqlgraphConfig::load(&path).unwrap().unwrap(), config);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "join = \"outer\"\n").unwrap();

        let err = SqlgraphConfig::load(&path).unwrap_err();
        assert!(format!("{}", err).contains(CONFIG_FILE));
    }
}
