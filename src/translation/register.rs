/*!
 * Register (subculture) classification.
 *
 * Each register category owns a few sub-patterns, an intensity weight, an
 * instruction fragment and a small term table used to adapt output.
 */

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

use super::patterns::{PatternTable, TermOptions, compile_pattern};
use crate::errors::TranslationError;

/// Aggregate intensity above which strong implications are requested
const STRONG_REGISTER_INTENSITY: f64 = 0.8;

/// Aggregate intensity above which moderate suggestions are requested
const MODERATE_REGISTER_INTENSITY: f64 = 0.5;

/// Result of a register analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SubcultureAnalysis {
    /// Matched categories, in table order
    pub categories: Vec<String>,
    /// Matched substrings per matched category
    pub matches: BTreeMap<String, Vec<String>>,
    /// Weighted average of the matched categories' weights, `0..=1`
    pub intensity: f64,
    /// Category with the most matches
    pub primary_category: Option<String>,
}

impl SubcultureAnalysis {
    /// Whether any register matched
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Clone)]
struct CompiledRegister {
    name: String,
    weight: f64,
    guidance: String,
    patterns: Vec<Regex>,
    terms: Vec<TermOptions>,
}

/// Register classifier
#[derive(Debug, Clone)]
pub struct ContextClassifier {
    registers: Vec<CompiledRegister>,
}

impl ContextClassifier {
    /// Compile the register section of a table
    pub fn new(table: &PatternTable) -> Result<Self, TranslationError> {
        let registers = table
            .registers
            .iter()
            .map(|spec| {
                let patterns = spec
                    .patterns
                    .iter()
                    .map(|p| compile_pattern(&format!("{}.{}", spec.name, p.name), &p.pattern))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(CompiledRegister {
                    name: spec.name.clone(),
                    weight: spec.weight,
                    guidance: spec.guidance.clone(),
                    patterns,
                    terms: spec.terms.clone(),
                })
            })
            .collect::<Result<Vec<_>, TranslationError>>()?;

        Ok(Self { registers })
    }

    /// Classifier over the built-in table
    pub fn builtin() -> Result<Self, TranslationError> {
        Self::new(&PatternTable::builtin()?)
    }

    /// Find the registers a text belongs to
    pub fn analyze_text(&self, text: &str) -> SubcultureAnalysis {
        let mut analysis = SubcultureAnalysis::default();
        let mut total_matches = 0usize;
        let mut weighted_sum = 0.0;
        let mut best_count = 0usize;

        for register in &self.registers {
            let found: Vec<String> = register
                .patterns
                .iter()
                .flat_map(|regex| regex.find_iter(text).map(|m| m.as_str().to_string()))
                .collect();

            if found.is_empty() {
                continue;
            }

            total_matches += found.len();
            weighted_sum += found.len() as f64 * register.weight;

            if found.len() > best_count {
                best_count = found.len();
                analysis.primary_category = Some(register.name.clone());
            }

            analysis.categories.push(register.name.clone());
            analysis.matches.insert(register.name.clone(), found);
        }

        if total_matches > 0 {
            analysis.intensity = weighted_sum / total_matches as f64;
        }

        analysis
    }

    /// Instruction for a model backend based on the matched registers
    pub fn get_translation_prompt(&self, analysis: &SubcultureAnalysis) -> String {
        if analysis.is_empty() {
            return "Translate naturally while preserving any implications.".to_string();
        }

        let mut fragments: Vec<&str> = self
            .registers
            .iter()
            .filter(|register| analysis.categories.contains(&register.name))
            .map(|register| register.guidance.as_str())
            .collect();

        fragments.push(if analysis.intensity > STRONG_REGISTER_INTENSITY {
            "maintain strong contextual implications"
        } else if analysis.intensity > MODERATE_REGISTER_INTENSITY {
            "preserve moderate suggestive elements"
        } else {
            "keep subtle hints"
        });

        format!("Please {} while ensuring natural flow.", fragments.join(", "))
    }

    /// Replace known register terms left in a translation
    ///
    /// Only terms present in the original text are touched; the option is
    /// picked by the aggregate intensity.
    pub fn adapt_translation(
        &self,
        original_text: &str,
        translation: &str,
        analysis: &SubcultureAnalysis,
    ) -> String {
        let mut adapted = translation.to_string();

        for register in self
            .registers
            .iter()
            .filter(|register| analysis.categories.contains(&register.name))
        {
            for term in register.terms.iter().filter(|t| original_text.contains(&t.term)) {
                if let Some(option) = term.pick(analysis.intensity) {
                    adapted = adapted.replace(&term.term, option);
                }
            }
        }

        adapted
    }
}
