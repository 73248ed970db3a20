//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/gremlin-repository/config.toml` (XDG) or platform config dir
//! 2. Project config: `.gremlin-repository.toml`
//! 3. Environment variables: `GREMLIN_REPOSITORY_*`
//!
//! Every key is optional.
//!
//! ```toml
//! [query]
//! substitution = "quoted"   # "literal" (default), "quoted" or "parameterized"
//!
//! [named_queries]
//! "Person.find_adults" = "g.V().hasLabel('person').has('age', gte(18))"
//! ```
//!
//! Environment variables are split on `_`, so
//! `GREMLIN_REPOSITORY_QUERY_SUBSTITUTION=parameterized` sets
//! `query.substitution`.
//!
//! Named queries can only come from a config file. The same split turns
//! `GREMLIN_REPOSITORY_NAMED_QUERIES_...` into `named.queries...`, which is
//! not the `named_queries` table, so such variables are ignored.

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::query::{NamedQueries, SubstitutionPolicy};

const APP_NAME: &str = "gremlin-repository";
const PROJECT_FILE: &str = ".gremlin-repository.toml";
const ENV_PREFIX: &str = "GREMLIN_REPOSITORY_";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub query: QuerySettings,
    /// Query texts keyed by `{DomainType}.{method}`.
    #[serde(default)]
    pub named_queries: HashMap<String, String>,
}

/// Query binding settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    /// How bound values are written into query text.
    #[serde(default)]
    pub substitution: SubstitutionPolicy,
}

impl EngineConfig {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(PROJECT_FILE))
    }

    /// Same layering as [`load`](Self::load) with `project_file` in place of
    /// `.gremlin-repository.toml`.
    pub fn load_from(project_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(project_file))
    }

    /// Extracts the configuration from caller-supplied providers.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        tracing::debug!(
            substitution = ?config.query.substitution,
            named_queries = config.named_queries.len(),
            "Loaded engine configuration"
        );
        Ok(config)
    }

    /// The configured named queries as a registry.
    pub fn named_queries(&self) -> NamedQueries {
        NamedQueries::from(self.named_queries.clone())
    }

    fn figment(project_file: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(project_file.as_ref()))
            // Layer 3: Environment variables (highest priority)
            .merge(Self::env())
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("_")
    }

    /// User config path: ~/.config/gremlin-repository/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join(APP_NAME).join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join(APP_NAME).join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn project_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_without_any_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::from_figment(
            Figment::from(Serialized::defaults(EngineConfig::default()))
                .merge(Toml::file(dir.path().join("missing.toml"))),
        )
        .unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.query.substitution, SubstitutionPolicy::Literal);
        assert!(config.named_queries.is_empty());
    }

    #[test]
    #[serial]
    fn test_named_queries_are_not_read_from_env() {
        std::env::set_var(
            "GREMLIN_REPOSITORY_NAMED_QUERIES_PERSON_FIND_ALL",
            "g.V().hasLabel('person')",
        );
        let config = EngineConfig::from_figment(
            Figment::from(Serialized::defaults(EngineConfig::default())).merge(EngineConfig::env()),
        );
        std::env::remove_var("GREMLIN_REPOSITORY_NAMED_QUERIES_PERSON_FIND_ALL");

        assert!(config.unwrap().named_queries.is_empty());
    }

    #[test]
    #[serial]
    fn test_project_file() {
        let file = project_file(
            r#"
[query]
substitution = "quoted"

[named_queries]
"Person.find_adults" = "g.V().hasLabel('person').has('age', gte(18))"
"#,
        );

        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.query.substitution, SubstitutionPolicy::Quoted);
        assert_eq!(
            config.named_queries.get("Person.find_adults").map(String::as_str),
            Some("g.V().hasLabel('person').has('age', gte(18))")
        );

        use crate::query::NamedQueryRegistry;
        assert!(config.named_queries().has_query("Person.find_adults"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_project_file() {
        let file = project_file("[query]\nsubstitution = \"quoted\"\n");
        std::env::set_var("GREMLIN_REPOSITORY_QUERY_SUBSTITUTION", "parameterized");
        let config = EngineConfig::load_from(file.path());
        std::env::remove_var("GREMLIN_REPOSITORY_QUERY_SUBSTITUTION");

        assert_eq!(
            config.unwrap().query.substitution,
            SubstitutionPolicy::Parameterized
        );
    }

    #[test]
    #[serial]
    fn test_unknown_policy_is_an_error() {
        let file = project_file("[query]\nsubstitution = \"shouting\"\n");
        let err = EngineConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("shouting"));
    }

    #[test]
    fn test_from_figment() {
        let config = EngineConfig::from_figment(
            Figment::new().merge(Toml::string("[query]\nsubstitution = \"parameterized\"")),
        )
        .unwrap();
        assert_eq!(config.query.substitution, SubstitutionPolicy::Parameterized);
    }
}
