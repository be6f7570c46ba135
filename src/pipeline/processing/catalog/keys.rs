//! Natural-key value objects. Every upsert resolves existence through one of
//! these, never through an identifier carried by the feed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use uuid::Uuid;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Trim and collapse inner whitespace runs to a single space.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// Key for the plain name-keyed kinds (category, domain, grade, mention).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EstablishmentKey(String);

impl EstablishmentKey {
    pub fn new(name: &str) -> Self {
        Self(collapse_whitespace(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EstablishmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepartmentKey {
    pub establishment_id: Uuid,
    pub name: String,
}

impl DepartmentKey {
    pub fn new(establishment_id: Uuid, name: &str) -> Self {
        Self {
            establishment_id,
            name: name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AffiliationKey {
    pub establishment_id: Uuid,
    pub institution_name: String,
}

impl AffiliationKey {
    pub fn new(establishment_id: Uuid, institution_name: &str) -> Self {
        Self {
            establishment_id,
            institution_name: institution_name.trim().to_string(),
        }
    }
}

/// Composite identity of a program offering. The department is part of the
/// key: the same (domain, grade, mention) with and without a department are
/// two distinct offerings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramOfferingKey {
    pub establishment_id: Uuid,
    pub domain_id: Uuid,
    pub grade_id: Uuid,
    pub mention_id: Uuid,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    title: String,
}

impl ReferenceKey {
    /// `"{authority} - {decree_number}"`, or the bare decree number when no
    /// authority is given.
    pub fn from_decree(authority: Option<&str>, decree_number: &str) -> Self {
        let decree_number = decree_number.trim();
        let title = match authority.map(str::trim).filter(|a| !a.is_empty()) {
            Some(authority) => format!("{authority} - {decree_number}"),
            None => decree_number.to_string(),
        };
        Self { title }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccreditationKey {
    pub program_offering_id: Uuid,
    pub reference_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn establishment_names_collapse() {
        assert_eq!(
            EstablishmentKey::new("  Université   de\tToamasina "),
            EstablishmentKey::new("Université de Toamasina")
        );
    }

    #[test]
    fn reference_title_with_and_without_authority() {
        assert_eq!(
            ReferenceKey::from_decree(Some("MESUPRES"), " 2019-123 ").title(),
            "MESUPRES - 2019-123"
        );
        assert_eq!(ReferenceKey::from_decree(Some("  "), "2019-123").title(), "2019-123");
        assert_eq!(ReferenceKey::from_decree(None, "2019-123").title(), "2019-123");
    }
}
