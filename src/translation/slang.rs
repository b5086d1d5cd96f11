/*!
 * Internet-slang output adapter.
 *
 * Rewrites Chinese internet slang left in a translation to an English
 * equivalent and flattens runs of repeated characters (啊啊啊, 哈哈哈, 。。。).
 */

use regex::{Captures, Regex};

use super::intensity::MAX_INTENSITY;
use super::patterns::{PatternTable, TermOptions, compile_pattern};
use crate::errors::TranslationError;

#[derive(Debug, Clone)]
struct CompiledStyleRule {
    regex: Regex,
    replacement: String,
    chars_per_repeat: Option<usize>,
}

impl CompiledStyleRule {
    fn rewrite(&self, run: &str) -> String {
        match self.chars_per_repeat {
            Some(per) => self.replacement.repeat(run.chars().count() / per),
            None => self.replacement.clone(),
        }
    }
}

/// Slang and style rewriter
#[derive(Debug, Clone)]
pub struct SlangAdapter {
    terms: Vec<TermOptions>,
    style_rules: Vec<CompiledStyleRule>,
}

impl SlangAdapter {
    /// Compile the slang section of a table
    pub fn new(table: &PatternTable) -> Result<Self, TranslationError> {
        let style_rules = table
            .slang
            .style_rules
            .iter()
            .map(|rule| {
                Ok(CompiledStyleRule {
                    regex: compile_pattern(&rule.replacement, &rule.pattern)?,
                    replacement: rule.replacement.clone(),
                    chars_per_repeat: rule.chars_per_repeat.filter(|per| *per > 0),
                })
            })
            .collect::<Result<Vec<_>, TranslationError>>()?;

        Ok(Self {
            terms: table.slang.terms.clone(),
            style_rules,
        })
    }

    /// Adapter over the built-in table
    pub fn builtin() -> Result<Self, TranslationError> {
        Self::new(&PatternTable::builtin()?)
    }

    /// Rewrite slang terms and repeated-character runs
    ///
    /// `intensity` is on the `0..=5` analyzer scale and selects the option.
    pub fn adapt(&self, text: &str, intensity: f64) -> String {
        let strength = intensity / MAX_INTENSITY;
        let mut adapted = text.to_string();

        for term in &self.terms {
            if !adapted.contains(&term.term) {
                continue;
            }
            if let Some(option) = term.pick(strength) {
                adapted = adapted.replace(&term.term, option);
            }
        }

        for rule in &self.style_rules {
            adapted = rule
                .regex
                .replace_all(&adapted, |caps: &Captures| rule.rewrite(&caps[0]))
                .into_owned();
        }

        adapted
    }
}
