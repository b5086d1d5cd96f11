/*!
 * Versioned pattern tables.
 *
 * The analyzers are driven by a JSON document holding intensity categories
 * per script family, context multipliers, register categories and the slang
 * tables. A built-in table is embedded at compile time; a file given in the
 * configuration replaces it wholesale.
 */

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::TranslationError;

/// Table version understood by this build
pub const PATTERN_TABLE_VERSION: u32 = 1;

/// Built-in table, embedded at compile time
const BUILTIN_TABLE: &str = include_str!("../../data/patterns.json");

/// Built-in table, parsed once per process
static PARSED_BUILTIN: Lazy<Result<PatternTable, String>> =
    Lazy::new(|| PatternTable::from_json(BUILTIN_TABLE).map_err(|e| e.to_string()));

fn default_weight() -> f64 {
    0.5
}

/// Root of a pattern table document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternTable {
    /// Document format version
    pub version: u32,

    /// Weight used by categories that do not declare one
    #[serde(default = "default_weight")]
    pub default_weight: f64,

    /// Intensity categories per script family
    pub intensity: IntensityPatterns,

    /// Multiplier per context type name
    #[serde(default)]
    pub context_multipliers: BTreeMap<String, f64>,

    /// Register categories, in priority order
    #[serde(default)]
    pub registers: Vec<RegisterSpec>,

    /// Slang substitution tables
    #[serde(default)]
    pub slang: SlangSpec,
}

/// Intensity categories for each script family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IntensityPatterns {
    /// Categories applied to CJK-dominant text
    #[serde(default)]
    pub cjk: Vec<WeightedPattern>,
    /// Categories applied to everything else
    #[serde(default)]
    pub latin: Vec<WeightedPattern>,
}

/// A named regex with an optional weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// A named regex
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedPattern {
    pub name: String,
    pub pattern: String,
}

/// A literal term and its ordered replacement options, mildest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermOptions {
    pub term: String,
    pub options: Vec<String>,
}

impl TermOptions {
    /// Pick an option by a `0.0..=1.0` strength
    pub fn pick(&self, strength: f64) -> Option<&str> {
        if self.options.is_empty() {
            return None;
        }
        let last = self.options.len() - 1;
        let index = (strength.max(0.0) * self.options.len() as f64).floor() as usize;
        self.options.get(index.min(last)).map(String::as_str)
    }
}

/// A register (subculture) category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterSpec {
    pub name: String,
    /// Intensity weight of the register in `0.0..=1.0`
    pub weight: f64,
    /// Instruction fragment emitted when the register matches
    pub guidance: String,
    pub patterns: Vec<NamedPattern>,
    #[serde(default)]
    pub terms: Vec<TermOptions>,
}

/// Slang substitution tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SlangSpec {
    #[serde(default)]
    pub terms: Vec<TermOptions>,
    #[serde(default)]
    pub style_rules: Vec<StyleRule>,
}

/// Rewrite of a run of repeated characters
///
/// With `chars_per_repeat` set, the replacement is repeated once per that
/// many matched characters; otherwise it is emitted once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleRule {
    pub pattern: String,
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chars_per_repeat: Option<usize>,
}

impl PatternTable {
    /// The table shipped with the crate
    pub fn builtin() -> Result<Self, TranslationError> {
        PARSED_BUILTIN
            .clone()
            .map_err(TranslationError::Pattern)
    }

    /// Parse and validate a table document
    pub fn from_json(json: &str) -> Result<Self, TranslationError> {
        let table: Self = serde_json::from_str(json)
            .map_err(|e| TranslationError::Pattern(format!("Invalid pattern table: {}", e)))?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TranslationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::Pattern(format!("Failed to read pattern table {:?}: {}", path, e))
        })?;
        let table = Self::from_json(&content)?;
        info!("Loaded pattern table v{} from {:?}", table.version, path);
        Ok(table)
    }

    /// Load the file when a path is configured, the built-in table otherwise
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, TranslationError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("Using built-in pattern table");
                Self::builtin()
            }
        }
    }

    /// Effective weight of an intensity category
    pub fn weight_of(&self, pattern: &WeightedPattern) -> f64 {
        pattern.weight.unwrap_or(self.default_weight)
    }

    /// Check version, weights, option lists and that every regex compiles
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.version != PATTERN_TABLE_VERSION {
            return Err(TranslationError::Pattern(format!(
                "Unsupported pattern table version {} (expected {})",
                self.version, PATTERN_TABLE_VERSION
            )));
        }

        check_unit_weight("default_weight", self.default_weight)?;

        for pattern in self.intensity.cjk.iter().chain(&self.intensity.latin) {
            check_unit_weight(&pattern.name, self.weight_of(pattern))?;
            compile_pattern(&pattern.name, &pattern.pattern)?;
        }

        for (context, multiplier) in &self.context_multipliers {
            if !multiplier.is_finite() || *multiplier < 0.0 {
                return Err(TranslationError::Pattern(format!(
                    "Context multiplier for '{}' must be a non-negative number",
                    context
                )));
            }
        }

        for register in &self.registers {
            check_unit_weight(&register.name, register.weight)?;
            for pattern in &register.patterns {
                compile_pattern(&pattern.name, &pattern.pattern)?;
            }
            check_options(&register.terms)?;
        }

        check_options(&self.slang.terms)?;
        for rule in &self.slang.style_rules {
            compile_pattern(&rule.replacement, &rule.pattern)?;
            if rule.chars_per_repeat == Some(0) {
                return Err(TranslationError::Pattern(format!(
                    "Style rule '{}' has chars_per_repeat of zero",
                    rule.pattern
                )));
            }
        }

        Ok(())
    }
}

/// Compile one table regex, naming the category on failure
pub fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, TranslationError> {
    Regex::new(pattern)
        .map_err(|e| TranslationError::Pattern(format!("Pattern '{}' does not compile: {}", name, e)))
}

fn check_unit_weight(name: &str, weight: f64) -> Result<(), TranslationError> {
    if (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(TranslationError::Pattern(format!(
            "Weight of '{}' must be between 0.0 and 1.0, got {}",
            name, weight
        )))
    }
}

fn check_options(terms: &[TermOptions]) -> Result<(), TranslationError> {
    match terms.iter().find(|t| t.options.is_empty() || t.term.is_empty()) {
        Some(bad) => Err(TranslationError::Pattern(format!(
            "Term '{}' needs a non-empty term and at least one option",
            bad.term
        ))),
        None => Ok(()),
    }
}
