//! Trellis configuration
//!
//! Settings for the conversion engine, loaded from `trellis.toml` with
//! environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trellis_doc::html::{DEFAULT_DENIED_TAGS, DEFAULT_MAX_DEPTH};
use trellis_doc::{BreakpointTable, HtmlOptions, IdStrategy};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "trellis.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid base_url '{value}': {source}")]
    BaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything the CLI needs to build [`HtmlOptions`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TrellisConfig {
    /// Conversion pipeline settings
    pub convert: ConvertConfig,
    /// Sanitizer policy
    pub security: SecurityConfig,
    /// Breakpoint name to min-width in pixels
    pub breakpoints: BreakpointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvertConfig {
    /// Element nesting beyond this keeps the body as one opaque block
    pub max_depth: usize,
    /// Remove `javascript:` and `vbscript:` URLs from link and source attributes
    pub strip_javascript_urls: bool,
    /// Base for resolving relative `src`/`href` values
    pub base_url: Option<String>,
    /// `random` for public conversions, `sequential` for reproducible output
    pub id_strategy: IdStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Elements removed together with their content
    pub denied_tags: Vec<String>,
    /// Attribute-name prefixes to strip (`on` covers event handlers)
    pub denied_attribute_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct BreakpointsConfig(pub BTreeMap<String, u32>);

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strip_javascript_urls: true,
            base_url: None,
            id_strategy: IdStrategy::Random,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            denied_tags: DEFAULT_DENIED_TAGS.iter().map(|tag| tag.to_string()).collect(),
            denied_attribute_prefixes: vec!["on".to_string()],
        }
    }
}

impl Default for BreakpointsConfig {
    fn default() -> Self {
        Self(
            [("mobile", 640), ("tablet", 768), ("desktop", 1024)]
                .into_iter()
                .map(|(name, width)| (name.to_string(), width))
                .collect(),
        )
    }
}

impl TrellisConfig {
    /// Reads one `trellis.toml`-shaped file; missing sections take defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `trellis.toml` from the current directory, or defaults if it is
    /// missing or unreadable
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Applies `TRELLIS_*` overrides on top of file values.
    ///
    /// Unparseable values leave the current setting alone.
    pub fn merge_with_env(&mut self) {
        if let Ok(val) = std::env::var("TRELLIS_MAX_DEPTH") {
            if let Ok(depth) = val.trim().parse::<usize>() {
                self.convert.max_depth = depth;
            }
        }
        if let Ok(val) = std::env::var("TRELLIS_STRIP_JAVASCRIPT_URLS") {
            self.convert.strip_javascript_urls = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(url) = std::env::var("TRELLIS_BASE_URL") {
            let url = url.trim();
            self.convert.base_url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Ok(val) = std::env::var("TRELLIS_DENIED_TAGS") {
            self.security.denied_tags = split_list(&val);
        }
        if let Ok(val) = std::env::var("TRELLIS_BREAKPOINTS") {
            let parsed = parse_breakpoints(&val);
            if !parsed.is_empty() {
                self.breakpoints = BreakpointsConfig(parsed);
            }
        }
    }

    /// `trellis.toml` (or defaults) with environment overrides applied
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    pub fn breakpoint_table(&self) -> BreakpointTable {
        BreakpointTable::from_pairs(
            self.breakpoints
                .0
                .iter()
                .map(|(name, width)| (name.clone(), *width)),
        )
    }

    /// Engine options for this configuration.
    pub fn html_options(&self) -> Result<HtmlOptions, ConfigError> {
        let base_url = match &self.convert.base_url {
            Some(value) => Some(Url::parse(value).map_err(|source| ConfigError::BaseUrl {
                value: value.clone(),
                source,
            })?),
            None => None,
        };
        Ok(HtmlOptions {
            denied_tags: self.security.denied_tags.clone(),
            denied_attribute_prefixes: self.security.denied_attribute_prefixes.clone(),
            strip_javascript_urls: self.convert.strip_javascript_urls,
            max_depth: self.convert.max_depth,
            base_url,
            breakpoints: self.breakpoint_table(),
            id_strategy: self.convert.id_strategy,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// `name=width` pairs separated by commas; malformed pairs are skipped.
fn parse_breakpoints(raw: &str) -> BTreeMap<String, u32> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, width) = pair.split_once('=')?;
            let name = name.trim();
            let width = width.trim().trim_end_matches("px").parse::<u32>().ok()?;
            (!name.is_empty()).then(|| (name.to_string(), width))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TrellisConfig::default();
        assert_eq!(config.convert.max_depth, 512);
        assert!(config.convert.strip_javascript_urls);
        assert!(config.security.denied_tags.iter().any(|tag| tag == "script"));
        assert_eq!(config.breakpoints.0.get("tablet"), Some(&768));
        assert_eq!(config.html_options().unwrap(), HtmlOptions::default());
    }

    #[test]
    fn test_toml_serialization() {
        let config = TrellisConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: TrellisConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[convert]
max_depth = 64
base_url = "https://cdn.example.com/"
id_strategy = "sequential"

[security]
denied_tags = ["script", "form"]

[breakpoints]
phone = 480
tablet = 768
"#
        )
        .unwrap();

        let config = TrellisConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.convert.max_depth, 64);
        assert!(config.convert.strip_javascript_urls);
        assert_eq!(config.security.denied_tags, vec!["script", "form"]);
        assert_eq!(config.security.denied_attribute_prefixes, vec!["on"]);

        let options = config.html_options().unwrap();
        assert_eq!(options.id_strategy, IdStrategy::Sequential);
        assert_eq!(options.breakpoints.width_of("phone"), Some(480));
        assert_eq!(options.breakpoints.width_of("desktop"), None);
        assert_eq!(
            options.base_url.as_ref().map(Url::as_str),
            Some("https://cdn.example.com/")
        );
    }

    #[test]
    fn test_load_errors() {
        let missing = TrellisConfig::load_from_file("/nonexistent/trellis.toml");
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[convert]\nmax_depth = \"deep\"").unwrap();
        let broken = TrellisConfig::load_from_file(file.path());
        assert!(matches!(broken, Err(ConfigError::Parse { .. })));

        let mut config = TrellisConfig::default();
        config.convert.base_url = Some("not a url".into());
        assert!(matches!(config.html_options(), Err(ConfigError::BaseUrl { .. })));
    }

    #[test]
    fn test_load_or_default() {
        let config = TrellisConfig::load_or_default();
        assert!(config.convert.max_depth > 0);
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("TRELLIS_MAX_DEPTH", "128");
            std::env::set_var("TRELLIS_DENIED_TAGS", "Script, iframe ,,svg");
            std::env::set_var("TRELLIS_BREAKPOINTS", "small=600px, large=1200, broken");
        }

        let mut config = TrellisConfig::default();
        config.merge_with_env();

        assert_eq!(config.convert.max_depth, 128);
        assert_eq!(config.security.denied_tags, vec!["script", "iframe", "svg"]);
        let table = config.breakpoint_table();
        assert_eq!(table.width_of("small"), Some(600));
        assert_eq!(table.width_of("large"), Some(1200));
        assert_eq!(table.width_of("tablet"), None);

        unsafe {
            std::env::remove_var("TRELLIS_MAX_DEPTH");
            std::env::remove_var("TRELLIS_DENIED_TAGS");
            std::env::remove_var("TRELLIS_BREAKPOINTS");
        }
    }
}
