/*!
 * Emotional intensity scoring.
 *
 * `PatternAnalyzer` counts weighted pattern matches for the text's script
 * family, scales the sum by the social context and clamps it to `0..=5`.
 */

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::patterns::{PatternTable, WeightedPattern, compile_pattern};
use crate::errors::TranslationError;
use crate::language_utils::cjk_ratio;

/// Upper bound of the final intensity
pub const MAX_INTENSITY: f64 = 5.0;

/// CJK ratio above which text is treated as CJK-dominant
const CJK_DOMINANCE_RATIO: f64 = 0.5;

/// Category whose match adds the metaphor fragment to the prompt
const METAPHOR_CATEGORY: &str = "metaphors";

/// Category whose match adds the intimacy fragment to the prompt
const INTIMACY_CATEGORY: &str = "intimacy";

/// Social setting of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// One-to-one conversation
    Private,
    /// Group chat
    #[default]
    Group,
    /// Public channel
    Public,
    /// Unknown setting, neutral multiplier
    Unspecified,
}

impl ContextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Public => "public",
            Self::Unspecified => "unspecified",
        }
    }
}

impl FromStr for ContextType {
    type Err = std::convert::Infallible;

    /// Unrecognized names map to `Unspecified`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "private" => Self::Private,
            "group" => Self::Group,
            "public" => Self::Public,
            _ => Self::Unspecified,
        })
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script family selecting the pattern set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFamily {
    Cjk,
    Latin,
}

impl ScriptFamily {
    /// Classify text by its share of CJK ideographs
    pub fn detect(text: &str) -> Self {
        if cjk_ratio(text) > CJK_DOMINANCE_RATIO {
            Self::Cjk
        } else {
            Self::Latin
        }
    }
}

/// Result of an intensity analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityAnalysis {
    /// Script family whose patterns were applied
    pub script: ScriptFamily,
    /// Match count per matched category
    pub pattern_matches: BTreeMap<String, usize>,
    /// `matches × weight` per matched category
    pub category_scores: BTreeMap<String, f64>,
    /// Sum of the category scores
    pub raw_intensity: f64,
    /// Context multiplier applied to the raw sum
    pub context_multiplier: f64,
    /// Clamped intensity in `0..=5`
    pub final_intensity: f64,
}

impl IntensityAnalysis {
    /// Whether a category matched at least once
    pub fn matched(&self, category: &str) -> bool {
        self.pattern_matches.get(category).is_some_and(|count| *count > 0)
    }
}

#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    regex: Regex,
    weight: f64,
}

/// Weighted-pattern intensity analyzer
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    cjk: Vec<CompiledCategory>,
    latin: Vec<CompiledCategory>,
    multipliers: HashMap<String, f64>,
}

impl PatternAnalyzer {
    /// Compile the intensity section of a table
    pub fn new(table: &PatternTable) -> Result<Self, TranslationError> {
        let compile = |patterns: &[WeightedPattern]| {
            patterns
                .iter()
                .map(|p| {
                    Ok(CompiledCategory {
                        name: p.name.clone(),
                        regex: compile_pattern(&p.name, &p.pattern)?,
                        weight: table.weight_of(p),
                    })
                })
                .collect::<Result<Vec<_>, TranslationError>>()
        };

        Ok(Self {
            cjk: compile(&table.intensity.cjk)?,
            latin: compile(&table.intensity.latin)?,
            multipliers: table
                .context_multipliers
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
        })
    }

    /// Analyzer over the built-in table
    pub fn builtin() -> Result<Self, TranslationError> {
        Self::new(&PatternTable::builtin()?)
    }

    /// Multiplier for a context, 1.0 when the table has none
    pub fn context_multiplier(&self, context: ContextType) -> f64 {
        self.multipliers
            .get(context.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    /// Score the emotional intensity of a text
    pub fn analyze_intensity(&self, text: &str, context: ContextType) -> IntensityAnalysis {
        let script = ScriptFamily::detect(text);
        let categories = match script {
            ScriptFamily::Cjk => &self.cjk,
            ScriptFamily::Latin => &self.latin,
        };

        let mut pattern_matches = BTreeMap::new();
        let mut category_scores = BTreeMap::new();
        let mut raw_intensity = 0.0;

        for category in categories {
            let count = category.regex.find_iter(text).count();
            if count == 0 {
                continue;
            }
            let score = count as f64 * category.weight;
            raw_intensity += score;
            pattern_matches.insert(category.name.clone(), count);
            category_scores.insert(category.name.clone(), score);
        }

        let context_multiplier = self.context_multiplier(context);
        let final_intensity = (raw_intensity * context_multiplier).clamp(0.0, MAX_INTENSITY);

        IntensityAnalysis {
            script,
            pattern_matches,
            category_scores,
            raw_intensity,
            context_multiplier,
            final_intensity,
        }
    }

    /// Instruction fragment asking a model to keep the measured intensity
    pub fn get_intensity_preservation_prompt(&self, analysis: &IntensityAnalysis) -> String {
        let intensity = analysis.final_intensity;
        let mut fragments = vec![if intensity >= 4.0 {
            "maintain high emotional intensity and intimate tone"
        } else if intensity >= 3.0 {
            "preserve moderate suggestive elements and emotional nuances"
        } else if intensity >= 2.0 {
            "keep subtle implications while maintaining natural flow"
        } else {
            "translate naturally while preserving any subtle hints"
        }];

        if analysis.matched(METAPHOR_CATEGORY) {
            fragments.push("preserve metaphorical expressions appropriately");
        }
        if analysis.matched(INTIMACY_CATEGORY) {
            fragments.push("maintain intimate context sensitively");
        }

        fragments.join(" and ")
    }
}
