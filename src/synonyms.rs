use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use crate::error::{Error, Result};

/// Builtin counseling thesaurus. Relations are directional: an entry says
/// which terms a query for the key should also look for.
const BUILTIN: &[(&str, &[&str])] = &[
    ("ache", &["pain", "hurt", "sore"]),
    ("anxiety", &["anxious", "worry", "nervous", "panic", "stress"]),
    ("anxious", &["anxiety", "worried", "nervous"]),
    ("appointment", &["visit", "consultation", "booking"]),
    ("back", &["spine", "lumbar", "lower"]),
    ("belly", &["stomach", "abdomen", "abdominal"]),
    ("blood", &["bleeding", "pressure"]),
    ("breathing", &["breath", "breathless", "wheezing", "shortness"]),
    ("chest", &["heart", "breathing", "tightness"]),
    ("cough", &["coughing", "phlegm", "throat"]),
    ("depressed", &["depression", "sad", "hopeless", "low"]),
    ("depression", &["depressed", "sad", "mood", "hopeless"]),
    ("diet", &["eating", "food", "nutrition", "weight"]),
    ("dizzy", &["dizziness", "lightheaded", "vertigo", "faint"]),
    ("doctor", &["physician", "clinician", "provider"]),
    ("exercise", &["workout", "activity", "stretching", "walking"]),
    ("fatigue", &["tired", "exhausted", "exhaustion", "energy"]),
    ("fever", &["temperature", "chills", "feverish"]),
    ("headache", &["migraine", "head", "pain"]),
    ("heart", &["chest", "palpitations", "cardiac", "pulse"]),
    ("hurt", &["pain", "ache", "sore", "injury"]),
    ("injury", &["injured", "hurt", "sprain", "strain"]),
    ("insomnia", &["sleep", "sleepless", "awake"]),
    ("itch", &["itchy", "itching", "rash"]),
    ("medication", &["medicine", "meds", "prescription", "pills", "dose"]),
    ("medicine", &["medication", "meds", "prescription", "pills"]),
    ("migraine", &["headache", "head"]),
    ("mood", &["depression", "anxiety", "emotional"]),
    ("nausea", &["nauseous", "sick", "vomiting", "queasy"]),
    ("pain", &["ache", "hurt", "sore", "discomfort", "painful"]),
    ("physician", &["doctor", "clinician", "provider"]),
    ("pills", &["medication", "tablets", "dose"]),
    ("prescription", &["medication", "refill", "pharmacy"]),
    ("rash", &["itch", "itchy", "skin", "hives"]),
    ("sad", &["depressed", "down", "unhappy", "low"]),
    ("sick", &["ill", "unwell", "nausea"]),
    ("sleep", &["insomnia", "sleeping", "tired", "rest"]),
    ("sore", &["pain", "ache", "tender", "hurt"]),
    ("stomach", &["belly", "abdomen", "nausea", "digestion"]),
    ("stress", &["stressed", "anxiety", "pressure", "overwhelmed"]),
    ("swelling", &["swollen", "inflammation", "puffy"]),
    ("therapy", &["counseling", "therapist", "treatment"]),
    ("tired", &["fatigue", "exhausted", "sleepy", "weary"]),
    ("vomiting", &["vomit", "nausea", "throwing"]),
    ("weight", &["diet", "obesity", "bmi"]),
    ("worry", &["anxiety", "worried", "concern", "nervous"]),
];

/// Static domain thesaurus: canonical term -> related terms.
///
/// Lookups are case-insensitive and unknown terms yield an empty set.
/// The table is built once at startup and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    entries: HashMap<String, BTreeSet<String>>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (term, related) in BUILTIN {
            table.extend(term, related.iter().copied());
        }
        table
    }

    /// Load a JSON object of `{"term": ["related", ...]}` and merge it over
    /// the builtin table.
    pub fn builtin_with_file(path: &Path) -> Result<Self> {
        let mut table = Self::builtin();
        table.merge_json_file(path)?;
        Ok(table)
    }

    pub fn merge_json_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read synonyms file {}: {e}",
                path.display()
            ))
        })?;
        let parsed: HashMap<String, Vec<String>> =
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!(
                    "invalid synonyms file {}: {e}",
                    path.display()
                ))
            })?;
        for (term, related) in &parsed {
            self.extend(term, related.iter().map(String::as_str));
        }
        tracing::debug!(
            path = %path.display(),
            entries = parsed.len(),
            "merged synonyms file"
        );
        Ok(())
    }

    pub fn extend<'a>(
        &mut self,
        term: &str,
        related: impl IntoIterator<Item = &'a str>,
    ) {
        let key = term.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let set = self.entries.entry(key.clone()).or_default();
        for r in related {
            let r = r.trim().to_lowercase();
            if !r.is_empty() && r != key {
                set.insert(r);
            }
        }
    }

    pub fn lookup(&self, term: &str) -> impl Iterator<Item = &str> {
        self.entries
            .get(&term.to_lowercase())
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
