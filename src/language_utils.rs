use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing language
/// codes before they reach the cache key or a backend, plus the script
/// detection used by the intensity analyzer.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split a code such as `zh-CN` or `pt_BR` into its primary subtag
fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve a code (ISO 639-1, 639-2/T, 639-2/B, optionally with a region) to a language
fn resolve_language(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);

    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == primary)
                .map(|(_, t)| *t)
                .unwrap_or(primary.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Validate if a language code is a known ISO 639 code
pub fn validate_language_code(code: &str) -> Result<()> {
    resolve_language(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = resolve_language(code)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Normalize a language code for use in a cache key
///
/// Valid codes are reduced to their canonical short form so that `zh`,
/// `zho` and `chi` share cache rows. Unknown codes are kept verbatim
/// (lowercased) so that the backend gets to reject them.
pub fn cache_language_code(code: &str) -> String {
    normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (resolve_language(code1), resolve_language(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = resolve_language(code)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}

/// Get a display name for prompts, falling back to the raw code
pub fn display_language(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Whether a character falls into the CJK Unified Ideographs block
pub fn is_cjk_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Ratio of CJK ideographs to non-whitespace characters
///
/// Returns 0.0 for empty or whitespace-only input.
pub fn cjk_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut cjk = 0usize;

    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_cjk_char(c) {
            cjk += 1;
        }
    }

    if total == 0 {
        return 0.0;
    }

    cjk as f64 / total as f64
}
