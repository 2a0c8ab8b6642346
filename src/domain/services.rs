// Text heuristics applied to OCR output. Pure functions over recognized
// lines; no network or filesystem access except the lookup-table loaders.

use crate::domain::model::RecognizedLine;
use crate::utils::error::{PipelineError, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// Scan recognized lines for a diagnosis label and capture the line that
/// follows it. Labels are matched as lowercase substrings; a line that is
/// itself a label is never captured as a value. Returns the raw line
/// content; cleanup is the caller's concern.
pub fn find_diagnosis_line(lines: &[RecognizedLine], labels: &[String]) -> Option<String> {
    let mut capture_next = false;

    for line in lines {
        let text = line.content.trim().to_lowercase();

        if labels.iter().any(|label| text.contains(label.as_str())) {
            capture_next = true;
            continue;
        }

        if capture_next {
            return Some(line.content.clone());
        }
    }

    None
}

/// Normalizes a captured diagnosis line: list enumerators and boilerplate
/// phrases from adjacent form sections are dropped, punctuation becomes
/// whitespace, runs of whitespace collapse to one space.
pub struct TextCleaner {
    whitespace: Regex,
    punctuation: Regex,
    enumerators: Regex,
    drop_phrases: Option<Regex>,
}

impl TextCleaner {
    pub fn new(drop_phrases: &[String]) -> Result<Self> {
        let drop_phrases = if drop_phrases.is_empty() {
            None
        } else {
            let alternation = drop_phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self {
            whitespace: compile(r"\s+")?,
            punctuation: compile(r"[^\w\s]")?,
            // Enumerators must go before punctuation does, while the dot is
            // still there to anchor on.
            enumerators: compile(r"(?i)\b(?:i{1,3}|iv|v|[1-5])\.")?,
            drop_phrases,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let mut text = self.whitespace.replace_all(text, " ").into_owned();
        text = self.enumerators.replace_all(&text, " ").into_owned();
        if let Some(drop) = &self.drop_phrases {
            text = drop.replace_all(&text, " ").into_owned();
        }
        text = self.punctuation.replace_all(&text, " ").into_owned();
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PipelineError::ConfigError {
        message: format!("invalid cleanup pattern: {}", e),
    })
}

/// Case-insensitive list of known medical terms. Words already in the
/// lexicon are trusted; words one edit away from a lexicon term are assumed
/// to be OCR misreads and repaired. Anything else is left alone.
pub struct Lexicon {
    terms: BTreeSet<String>,
}

impl Lexicon {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_terms(content.lines()))
    }

    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let terms = terms
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.terms.contains(&word.to_lowercase())
    }

    /// Returns the corrected text and whether anything changed.
    pub fn correct(&self, text: &str) -> (String, bool) {
        let mut corrected = false;
        let words = text
            .split_whitespace()
            .map(|word| {
                let lower = word.to_lowercase();
                if self.terms.contains(&lower) {
                    return word.to_string();
                }
                match self.nearest(&lower) {
                    Some(term) => {
                        corrected = true;
                        term.to_string()
                    }
                    None => word.to_string(),
                }
            })
            .collect::<Vec<_>>();

        (words.join(" "), corrected)
    }

    fn nearest(&self, word: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|term| edit_distance(word, term) == 1)
            .map(String::as_str)
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > 1 {
        // Callers only care about distance 1.
        return a.len().abs_diff(b.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Icd10Entry {
    pub code: String,
    pub description: String,
}

/// ICD-10 level-3 lookup table. A diagnosis maps to the first entry whose
/// description contains one of the diagnosis words, scanning words left to
/// right and entries in file order.
pub struct Icd10Table {
    entries: Vec<(String, Icd10Entry)>,
}

impl Icd10Table {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let code_idx = column_index(&headers, "Level-3 Code", path)?;
        let desc_idx = column_index(&headers, "Level-3 Desc", path)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let description = record.get(desc_idx).unwrap_or("").trim();
            if description.is_empty() {
                continue;
            }
            let code = record.get(code_idx).unwrap_or("").trim();
            entries.push((
                description.to_lowercase(),
                Icd10Entry {
                    code: code.to_string(),
                    description: description.to_string(),
                },
            ));
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<Icd10Entry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.description.to_lowercase(), e))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn match_diagnosis(&self, diagnosis: &str) -> Option<&Icd10Entry> {
        for word in tokenize(diagnosis) {
            for (description, entry) in &self.entries {
                if description.contains(&word) {
                    return Some(entry);
                }
            }
        }
        None
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::ProcessingError {
            message: format!("{}: missing required column '{}'", path, name),
        })
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}
