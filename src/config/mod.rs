//! Configuration file loading and flag merging
//!
//! A config file (`.ratchet` in the working directory by default, YAML or
//! JSON) supplies defaults; command-line flags override it. The merged
//! result is validated and frozen into [`Options`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ratchet::{Comparison, Options};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = ".ratchet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("a metric command is required")]
    MissingMetric,

    #[error("only one comparison operator can be specified (found: {})", .0.join(", "))]
    MultipleComparisons(Vec<String>),
}

/// On-disk / inline configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub metric: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub lt: Option<String>,
    pub le: Option<String>,
    pub eq: Option<String>,
    pub ge: Option<String>,
    pub gt: Option<String>,
    pub verbose: bool,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub metric: Option<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub lt: Option<String>,
    pub le: Option<String>,
    pub eq: Option<String>,
    pub ge: Option<String>,
    pub gt: Option<String>,
    pub verbose: bool,
}

impl FlagOverrides {
    fn has_comparison(&self) -> bool {
        [&self.lt, &self.le, &self.eq, &self.ge, &self.gt]
            .into_iter()
            .any(|v| non_empty(v).is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Config {
    /// Load from a file. `.json` is JSON, `.yaml`/`.yml` is YAML, anything
    /// else (e.g. `.ratchet`) is tried as YAML, then JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = format!("file {}", path.display());

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => parse(&content, Format::Json, &origin),
            Some("yaml") | Some("yml") => parse(&content, Format::Yaml, &origin),
            _ => parse_either(&content, &origin),
        }
    }

    /// Load from an inline string, detecting the format: text wrapped in
    /// `{ ... }` is JSON, anything else is tried as YAML, then JSON.
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let trimmed = content.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return parse(content, Format::Json, "string");
        }
        parse_either(content, "string")
    }

    /// `.ratchet` in `dir` if present, otherwise an empty config.
    pub fn load_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line values on top of this config.
    ///
    /// Any comparison flag replaces every comparison from the file, so a
    /// config with `lt: main` and a `--ge develop` flag compares with `ge`
    /// only. `verbose` is enabled if either side enables it.
    pub fn merge_flags(&mut self, flags: &FlagOverrides) {
        if let Some(metric) = non_empty(&flags.metric) {
            self.metric = Some(metric.to_string());
        }
        if let Some(pre) = non_empty(&flags.pre) {
            self.pre = Some(pre.to_string());
        }
        if let Some(post) = non_empty(&flags.post) {
            self.post = Some(post.to_string());
        }

        if flags.has_comparison() {
            self.lt = non_empty(&flags.lt).map(String::from);
            self.le = non_empty(&flags.le).map(String::from);
            self.eq = non_empty(&flags.eq).map(String::from);
            self.ge = non_empty(&flags.ge).map(String::from);
            self.gt = non_empty(&flags.gt).map(String::from);
        }

        self.verbose |= flags.verbose;
    }

    /// Configured comparisons, in `lt, le, eq, ge, gt` order.
    fn comparisons(&self) -> Vec<(Comparison, &str)> {
        [
            (Comparison::LessThan, &self.lt),
            (Comparison::LessEqual, &self.le),
            (Comparison::Equal, &self.eq),
            (Comparison::GreaterEqual, &self.ge),
            (Comparison::GreaterThan, &self.gt),
        ]
        .into_iter()
        .filter_map(|(c, base)| non_empty(base).map(|b| (c, b)))
        .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if non_empty(&self.metric).is_none() {
            return Err(ConfigError::MissingMetric);
        }
        let comparisons = self.comparisons();
        if comparisons.len() > 1 {
            return Err(ConfigError::MultipleComparisons(
                comparisons.iter().map(|(c, _)| c.key().to_string()).collect(),
            ));
        }
        Ok(())
    }

    /// Validate and freeze into run options.
    pub fn into_options(self) -> Result<Options, ConfigError> {
        self.validate()?;

        let mut options = Options::new(non_empty(&self.metric).unwrap_or_default());
        options.pre = non_empty(&self.pre).map(String::from);
        options.post = non_empty(&self.post).map(String::from);
        options.verbose = self.verbose;
        if let Some((comparison, base)) = self.comparisons().into_iter().next() {
            options = options.compare_to(comparison, base);
        }
        Ok(options)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse(content: &str, format: Format, origin: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let result = match format {
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    result.map_err(|message| ConfigError::Parse {
        origin: origin.to_string(),
        message,
    })
}

fn parse_either(content: &str, origin: &str) -> Result<Config, ConfigError> {
    parse(content, Format::Yaml, origin).or_else(|yaml_err| {
        parse(content, Format::Json, origin).map_err(|_| ConfigError::Parse {
            origin: origin.to_string(),
            message: format!("not valid YAML or JSON ({yaml_err})"),
        })
    })
}
