//! Language registry: file extension → extraction strategy
//!
//! The AST-capable family maps to a [`ScriptDialect`]. Every other language is
//! a [`RuleSet`]: an ordered list of token categories, each with one or more
//! regular expressions whose first capture group is the entity name. An
//! extension may alias another extension's rule set instead of repeating it.
//!
//! Adding a language is a data change: one entry in [`BUILTIN_RULE_SETS`] or a
//! `[languages.<ext>]` table in `thicket.toml`.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use thicket_core::NodeKind;

use crate::config::LanguageConfig;
use crate::error::IndexError;
use crate::parser_pool::ScriptDialect;

/// Token categories, in the order they are applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    Imports,
    Class,
    Struct,
    Interface,
    Protocol,
    Enum,
    Function,
}

impl TokenCategory {
    pub const ORDERED: [TokenCategory; 7] = [
        TokenCategory::Imports,
        TokenCategory::Class,
        TokenCategory::Struct,
        TokenCategory::Interface,
        TokenCategory::Protocol,
        TokenCategory::Enum,
        TokenCategory::Function,
    ];

    /// Symbol kind emitted for a declaration match. `None` for imports.
    pub fn node_kind(self) -> Option<NodeKind> {
        match self {
            TokenCategory::Imports => None,
            TokenCategory::Class => Some(NodeKind::Class),
            TokenCategory::Struct => Some(NodeKind::Struct),
            TokenCategory::Interface => Some(NodeKind::Interface),
            TokenCategory::Protocol => Some(NodeKind::Protocol),
            TokenCategory::Enum => Some(NodeKind::Enum),
            TokenCategory::Function => Some(NodeKind::Function),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenCategory::Imports => "imports",
            TokenCategory::Class => "class",
            TokenCategory::Struct => "struct",
            TokenCategory::Interface => "interface",
            TokenCategory::Protocol => "protocol",
            TokenCategory::Enum => "enum",
            TokenCategory::Function => "function",
        }
    }
}

/// How blocks are delimited, which selects the approximate complexity scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    Indentation,
    Braces,
}

/// Compiled patterns of one token category.
#[derive(Debug)]
pub struct Rule {
    pub category: TokenCategory,
    pub patterns: Vec<Regex>,
}

/// Compiled rule set of a pattern-based language.
#[derive(Debug)]
pub struct RuleSet {
    pub language: String,
    pub block_style: BlockStyle,
    /// Separator used in import strings for module paths (`.` in `os.path`).
    pub module_separator: Option<String>,
    /// Keyword introducing a function header, used by the indentation scan.
    pub definition_keyword: Option<String>,
    /// Sorted by [`TokenCategory::ORDERED`].
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn compile(
        language: &str,
        block_style: BlockStyle,
        module_separator: Option<&str>,
        definition_keyword: Option<&str>,
        patterns: &[(TokenCategory, Vec<String>)],
    ) -> Result<Self, IndexError> {
        let mut rules: Vec<Rule> = Vec::new();
        for category in TokenCategory::ORDERED {
            let mut compiled = Vec::new();
            for (_, sources) in patterns.iter().filter(|(c, _)| *c == category) {
                for source in sources {
                    let regex = Regex::new(source).map_err(|e| IndexError::InvalidPattern {
                        language: language.to_string(),
                        category: category.as_str().to_string(),
                        pattern: source.clone(),
                        source: e,
                    })?;
                    compiled.push(regex);
                }
            }
            if !compiled.is_empty() {
                rules.push(Rule {
                    category,
                    patterns: compiled,
                });
            }
        }

        Ok(RuleSet {
            language: language.to_string(),
            block_style,
            module_separator: module_separator.map(str::to_string),
            definition_keyword: definition_keyword.map(str::to_string),
            rules,
        })
    }
}

/// Strategy selected for one file.
#[derive(Debug, Clone)]
pub enum Strategy {
    Script(ScriptDialect),
    Patterns(Arc<RuleSet>),
}

impl Strategy {
    pub fn language(&self) -> &str {
        match self {
            Strategy::Script(dialect) => dialect.name(),
            Strategy::Patterns(rules) => &rules.language,
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Script(ScriptDialect),
    Rules(Arc<RuleSet>),
    Alias(String),
}

/// Built-in pattern table entry.
pub struct BuiltinRuleSet {
    pub language: &'static str,
    pub extensions: &'static [&'static str],
    pub block_style: BlockStyle,
    pub module_separator: Option<&'static str>,
    pub definition_keyword: Option<&'static str>,
    pub rules: &'static [(TokenCategory, &'static [&'static str])],
}

pub const SCRIPT_EXTENSIONS: &[(&str, ScriptDialect)] = &[
    ("js", ScriptDialect::JavaScript),
    ("jsx", ScriptDialect::JavaScript),
    ("mjs", ScriptDialect::JavaScript),
    ("cjs", ScriptDialect::JavaScript),
    ("ts", ScriptDialect::TypeScript),
    ("mts", ScriptDialect::TypeScript),
    ("cts", ScriptDialect::TypeScript),
    ("tsx", ScriptDialect::Tsx),
];

pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("h", "c"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("hh", "cpp"),
    ("pyi", "py"),
];

use TokenCategory::{Class, Enum, Function, Imports, Interface, Protocol, Struct};

// Captures must be group 1. Function captures are filtered against
// `CONTROL_KEYWORDS` by the pattern extractor.
pub const BUILTIN_RULE_SETS: &[BuiltinRuleSet] = &[
    BuiltinRuleSet {
        language: "python",
        extensions: &["py"],
        block_style: BlockStyle::Indentation,
        module_separator: Some("."),
        definition_keyword: Some("def"),
        rules: &[
            (Imports, &[r"(?m)^[ \t]*import[ \t]+([\w.]+)", r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b"]),
            (Class, &[r"(?m)^[ \t]*class[ \t]+(\w+)"]),
            (Function, &[r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+(\w+)"]),
        ],
    },
    BuiltinRuleSet {
        language: "c",
        extensions: &["c"],
        block_style: BlockStyle::Braces,
        module_separator: None,
        definition_keyword: None,
        rules: &[
            (Imports, &[r#"(?m)^[ \t]*#[ \t]*include[ \t]*[<"]([^>"]+)[>"]"#]),
            (Struct, &[r"\bstruct[ \t]+(\w+)[ \t\r\n]*\{"]),
            (Enum, &[r"\benum[ \t]+(\w+)[ \t\r\n]*\{"]),
            (Function, &[r"(?m)^[ \t]*(?:[\w*]+[ \t*]+)+(\w+)[ \t]*\([^;{)]*\)[ \t\r\n]*\{"]),
        ],
    },
    BuiltinRuleSet {
        language: "cpp",
        extensions: &["cpp"],
        block_style: BlockStyle::Braces,
        module_separator: None,
        definition_keyword: None,
        rules: &[
            (Imports, &[r#"(?m)^[ \t]*#[ \t]*include[ \t]*[<"]([^>"]+)[>"]"#]),
            (Class, &[r"\bclass[ \t]+(\w+)[^;{]*\{"]),
            (Struct, &[r"\bstruct[ \t]+(\w+)[^;{]*\{"]),
            (Enum, &[r"\benum[ \t]+(?:class[ \t]+)?(\w+)[^;{]*\{"]),
            (Function, &[r"(?m)^[ \t]*(?:[\w*&<>:,]+[ \t*&]+)+(?:\w+::)*(~?\w+)[ \t]*\([^;{)]*\)[ \t]*(?:const[ \t]*)?(?:noexcept[ \t]*)?(?:override[ \t]*)?[\r\n]*[ \t]*\{"]),
        ],
    },
    BuiltinRuleSet {
        language: "java",
        extensions: &["java"],
        block_style: BlockStyle::Braces,
        module_separator: Some("."),
        definition_keyword: None,
        rules: &[
            (Imports, &[r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+)"]),
            (Class, &[r"\bclass[ \t]+(\w+)"]),
            (Interface, &[r"\binterface[ \t]+(\w+)"]),
            (Enum, &[r"\benum[ \t]+(\w+)"]),
            (Function, &[r"(?m)^[ \t]*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default)[ \t]+)*(?:<[^>]*>[ \t]+)?[\w<>\[\].,?]+[ \t]+(\w+)[ \t]*\([^;{)]*\)[ \t]*(?:throws[ \t]+[\w., \t]+)?\{"]),
        ],
    },
    BuiltinRuleSet {
        language: "go",
        extensions: &["go"],
        block_style: BlockStyle::Braces,
        module_separator: None,
        definition_keyword: None,
        rules: &[
            (Imports, &[r#"(?m)^[ \t]*import[ \t]+(?:\w+[ \t]+)?"([^"]+)""#, r#"(?m)^[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)"[ \t]*$"#]),
            (Struct, &[r"\btype[ \t]+(\w+)[ \t]+struct\b"]),
            (Interface, &[r"\btype[ \t]+(\w+)[ \t]+interface\b"]),
            (Function, &[r"(?m)^func[ \t]+(?:\([^)]*\)[ \t]*)?(\w+)[ \t]*(?:\[[^\]]*\])?\("]),
        ],
    },
    BuiltinRuleSet {
        language: "rust",
        extensions: &["rs"],
        block_style: BlockStyle::Braces,
        module_separator: Some("::"),
        definition_keyword: None,
        rules: &[
            (Imports, &[r"(?m)^[ \t]*(?:pub(?:\([\w:]+\))?[ \t]+)?use[ \t]+([\w:]+)", r"(?m)^[ \t]*(?:pub(?:\([\w:]+\))?[ \t]+)?mod[ \t]+(\w+)[ \t]*;"]),
            (Struct, &[r"\bstruct[ \t]+(\w+)"]),
            (Interface, &[r"\btrait[ \t]+(\w+)"]),
            (Enum, &[r"\benum[ \t]+(\w+)"]),
            (Function, &[r"\bfn[ \t]+(\w+)"]),
        ],
    },
    BuiltinRuleSet {
        language: "csharp",
        extensions: &["cs"],
        block_style: BlockStyle::Braces,
        module_separator: Some("."),
        definition_keyword: None,
        rules: &[
            (Imports, &[r"(?m)^[ \t]*using[ \t]+(?:static[ \t]+)?([\w.]+)[ \t]*;"]),
            (Class, &[r"\bclass[ \t]+(\w+)"]),
            (Struct, &[r"\bstruct[ \t]+(\w+)"]),
            (Interface, &[r"\binterface[ \t]+(\w+)"]),
            (Enum, &[r"\benum[ \t]+(\w+)"]),
            (Function, &[r"(?m)^[ \t]*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|sealed|extern)[ \t]+)*[\w<>\[\].,?]+[ \t]+(\w+)[ \t]*\([^;{)]*\)[ \t\r\n]*\{"]),
        ],
    },
    BuiltinRuleSet {
        language: "swift",
        extensions: &["swift"],
        block_style: BlockStyle::Braces,
        module_separator: None,
        definition_keyword: None,
        rules: &[
            (Imports, &[r"(?m)^[ \t]*import[ \t]+(\w+)"]),
            (Class, &[r"\bclass[ \t]+(\w+)"]),
            (Struct, &[r"\bstruct[ \t]+(\w+)"]),
            (Protocol, &[r"\bprotocol[ \t]+(\w+)"]),
            (Enum, &[r"\benum[ \t]+(\w+)"]),
            (Function, &[r"\bfunc[ \t]+(\w+)"]),
        ],
    },
    BuiltinRuleSet {
        language: "kotlin",
        extensions: &["kt", "kts"],
        block_style: BlockStyle::Braces,
        module_separator: Some("."),
        definition_keyword: None,
        rules: &[
            (Imports, &[r"(?m)^[ \t]*import[ \t]+([\w.]+)"]),
            (Class, &[r"\bclass[ \t]+(\w+)"]),
            (Interface, &[r"\binterface[ \t]+(\w+)"]),
            (Function, &[r"\bfun[ \t]+(?:<[^>]*>[ \t]*)?(?:[\w.]+\.)?(\w+)[ \t]*\("]),
        ],
    },
    BuiltinRuleSet {
        language: "php",
        extensions: &["php"],
        block_style: BlockStyle::Braces,
        module_separator: Some("\\"),
        definition_keyword: None,
        rules: &[
            (Imports, &[r#"(?m)^[ \t]*(?:require|include)(?:_once)?[ \t]*\(?[ \t]*['"]([^'"]+)['"]"#, r"(?m)^[ \t]*use[ \t]+([\w\\]+)"]),
            (Class, &[r"\bclass[ \t]+(\w+)"]),
            (Interface, &[r"\binterface[ \t]+(\w+)"]),
            (Enum, &[r"\benum[ \t]+(\w+)"]),
            (Function, &[r"\bfunction[ \t]+(\w+)"]),
        ],
    },
];

/// Maps normalized extensions to strategies.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    entries: HashMap<String, Entry>,
}

impl LanguageRegistry {
    /// Registry with the script family and every built-in rule set.
    pub fn builtin() -> Result<Self, IndexError> {
        let mut entries = HashMap::new();

        for (ext, dialect) in SCRIPT_EXTENSIONS {
            entries.insert(ext.to_string(), Entry::Script(*dialect));
        }

        for builtin in BUILTIN_RULE_SETS {
            let patterns: Vec<(TokenCategory, Vec<String>)> = builtin
                .rules
                .iter()
                .map(|(category, sources)| (*category, sources.iter().map(|s| s.to_string()).collect()))
                .collect();
            let rules = Arc::new(RuleSet::compile(
                builtin.language,
                builtin.block_style,
                builtin.module_separator,
                builtin.definition_keyword,
                &patterns,
            )?);
            for ext in builtin.extensions {
                entries.insert(ext.to_string(), Entry::Rules(Arc::clone(&rules)));
            }
        }

        for (ext, target) in BUILTIN_ALIASES {
            entries.insert(ext.to_string(), Entry::Alias(target.to_string()));
        }

        let registry = LanguageRegistry { entries };
        registry.validate_aliases()?;
        Ok(registry)
    }

    /// Built-in registry with user-configured languages layered on top.
    /// A configured extension replaces the built-in entry.
    pub fn with_languages<'a>(
        languages: impl IntoIterator<Item = (&'a String, &'a LanguageConfig)>,
    ) -> Result<Self, IndexError> {
        let mut registry = Self::builtin()?;
        for (ext, config) in languages {
            let ext = normalize_extension(ext);
            let entry = match (&config.alias, config.block) {
                (Some(target), _) => Entry::Alias(normalize_extension(target)),
                (None, Some(block_style)) => Entry::Rules(Arc::new(RuleSet::compile(
                    config.name.as_deref().unwrap_or(&ext),
                    block_style,
                    config.module_separator.as_deref(),
                    config.definition_keyword.as_deref(),
                    &config.patterns(),
                )?)),
                (None, None) => return Err(IndexError::IncompleteLanguage(ext)),
            };
            tracing::debug!("registering configured language for .{}", ext);
            registry.entries.insert(ext, entry);
        }
        registry.validate_aliases()?;
        Ok(registry)
    }

    fn validate_aliases(&self) -> Result<(), IndexError> {
        for (ext, entry) in &self.entries {
            if let Entry::Alias(target) = entry {
                if !matches!(self.entries.get(target), Some(Entry::Rules(_) | Entry::Script(_))) {
                    return Err(IndexError::UnknownAlias {
                        extension: ext.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Strategy for an extension (case-insensitive, leading dot optional).
    pub fn lookup(&self, extension: &str) -> Option<Strategy> {
        let ext = normalize_extension(extension);
        let entry = match self.entries.get(&ext)? {
            Entry::Alias(target) => self.entries.get(target)?,
            entry => entry,
        };
        match entry {
            Entry::Script(dialect) => Some(Strategy::Script(*dialect)),
            Entry::Rules(rules) => Some(Strategy::Patterns(Arc::clone(rules))),
            Entry::Alias(_) => None,
        }
    }

    pub fn for_path(&self, path: &str) -> Option<Strategy> {
        self.lookup(extension_of(path)?)
    }

    pub fn supports(&self, path: &str) -> bool {
        self.for_path(path).is_some()
    }

    /// Every registered extension, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// Alias target of an extension, if it is an alias.
    pub fn alias_of(&self, extension: &str) -> Option<&str> {
        match self.entries.get(&normalize_extension(extension))? {
            Entry::Alias(target) => Some(target),
            _ => None,
        }
    }
}

/// Extension of the last path segment, without the dot.
pub fn extension_of(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}
