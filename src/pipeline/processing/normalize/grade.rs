//! Maps the free-text grade phrases found in the feed ("Licence et Master",
//! "Master professionnel", ...) onto the canonical grades.

pub const LICENCE: &str = "Licence";
pub const MASTER: &str = "Master";
pub const DOCTORAT: &str = "Doctorat";

/// Known phrases, lowercase. Order matters: the substring pass takes the
/// first entry contained in the phrase, so compound phrases come first.
const PHRASE_TABLE: &[(&str, &[&str])] = &[
    ("licence, master et doctorat", &[LICENCE, MASTER, DOCTORAT]),
    ("licence et master", &[LICENCE, MASTER]),
    ("master et doctorat", &[MASTER, DOCTORAT]),
    ("licence professionnelle", &[LICENCE]),
    ("master professionnel", &[MASTER]),
    ("licence", &[LICENCE]),
    ("master", &[MASTER]),
    ("doctorat", &[DOCTORAT]),
];

const KEYWORDS: &[(&str, &str)] = &[("licence", LICENCE), ("master", MASTER), ("doctorat", DOCTORAT)];

/// A list of grade names that always holds at least one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeList(Vec<String>);

impl GradeList {
    fn from_canonical(grades: &[&str]) -> Self {
        Self(grades.iter().map(|g| g.to_string()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Normalize a grade phrase. Never fails: unknown phrases come back as a
/// single capitalized entry.
pub fn normalize(phrase: &str) -> GradeList {
    let trimmed = phrase.trim();
    let lowered = trimmed.to_lowercase();

    if let Some((_, grades)) = PHRASE_TABLE.iter().find(|(known, _)| *known == lowered) {
        return GradeList::from_canonical(grades);
    }

    if let Some((_, grades)) = PHRASE_TABLE
        .iter()
        .find(|(known, _)| lowered.contains(known))
    {
        return GradeList::from_canonical(grades);
    }

    let found: Vec<&str> = KEYWORDS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, grade)| *grade)
        .collect();
    if !found.is_empty() {
        return GradeList::from_canonical(&found);
    }

    GradeList(vec![capitalize_first(trimmed)])
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
