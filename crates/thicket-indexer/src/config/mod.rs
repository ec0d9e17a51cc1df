//! `thicket.toml` configuration
//!
//! ```toml
//! # thicket.toml
//! exclude = ["vendor/**", "**/*.min.js"]
//! parallel = true
//! tolerate_syntax_errors = false
//! max_file_bytes = 1048576
//! root_name = "my-project"
//!
//! # A new pattern-based language is pure data.
//! [languages.lua]
//! block = "braces"
//! function = ['\bfunction\s+([\w.:]+)\s*\(']
//! imports = ['require\s*\(?\s*["'']([^"'']+)["'']']
//!
//! # Or share an existing rule set.
//! [languages.pyw]
//! alias = "py"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::error::IndexError;
use crate::registry::{BlockStyle, TokenCategory};

/// File name looked up at the project root by [`IndexerConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "thicket.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Globs of project-relative paths dropped before extraction
    pub exclude: Vec<String>,

    /// Extract files on the rayon pool
    pub parallel: bool,

    /// Extract script files even when their tree contains error nodes
    pub tolerate_syntax_errors: bool,

    /// Acquisition skips files larger than this
    pub max_file_bytes: Option<u64>,

    /// Display name of the root directory node
    pub root_name: Option<String>,

    /// Custom or overriding rule sets keyed by extension
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            parallel: true,
            tolerate_syntax_errors: false,
            max_file_bytes: None,
            root_name: None,
            languages: BTreeMap::new(),
        }
    }
}

/// One `[languages.<ext>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Language identity reported on file nodes. Defaults to the extension.
    pub name: Option<String>,
    /// Reuse another extension's rule set instead of declaring patterns.
    pub alias: Option<String>,
    pub block: Option<BlockStyle>,
    pub module_separator: Option<String>,
    pub definition_keyword: Option<String>,

    pub imports: Vec<String>,
    pub class: Vec<String>,
    #[serde(rename = "struct")]
    pub struct_: Vec<String>,
    pub interface: Vec<String>,
    pub protocol: Vec<String>,
    #[serde(rename = "enum")]
    pub enum_: Vec<String>,
    pub function: Vec<String>,
}

impl LanguageConfig {
    /// Pattern sources paired with their category.
    pub fn patterns(&self) -> Vec<(TokenCategory, Vec<String>)> {
        [
            (TokenCategory::Imports, &self.imports),
            (TokenCategory::Class, &self.class),
            (TokenCategory::Struct, &self.struct_),
            (TokenCategory::Interface, &self.interface),
            (TokenCategory::Protocol, &self.protocol),
            (TokenCategory::Enum, &self.enum_),
            (TokenCategory::Function, &self.function),
        ]
        .into_iter()
        .filter(|(_, sources)| !sources.is_empty())
        .map(|(category, sources)| (category, sources.clone()))
        .collect()
    }
}

impl IndexerConfig {
    /// Load configuration from an explicit file.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| IndexError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `thicket.toml` from the project root, or defaults if there is none.
    pub fn discover(root: &Path) -> Result<Self, IndexError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Compiled exclude globs.
    pub fn exclude_set(&self) -> Result<GlobSet, IndexError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    pub fn root_name(&self) -> &str {
        self.root_name.as_deref().unwrap_or("root")
    }
}
