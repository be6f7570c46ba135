//! Drops feed entries that cannot be resolved and hands the resolver typed,
//! fully-populated records. The raw feed is only borrowed.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::EntityKind;
use crate::pipeline::stats::ImportStats;
use crate::types::{non_blank, FeedDepartment, FeedDomain, FeedEstablishment, FeedReference, RawRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentRecord {
    pub name: String,
    pub category: String,
    pub abbreviation: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub affiliations: Vec<String>,
    pub departments: Vec<DepartmentRecord>,
    pub domains: Vec<DomainRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub name: String,
    pub domains: Vec<DomainRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain_name: String,
    pub grade: String,
    /// Never empty, though individual entries may still be blank.
    pub mentions: Vec<String>,
    pub tuition_fees: Option<String>,
    pub duration: Option<String>,
    pub reference: Option<ReferenceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub decree_number: String,
    pub authority: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub document_url: Option<String>,
    pub reference_type: Option<String>,
    pub accreditation_date: Option<String>,
}

/// What the sanitizer threw away
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub dropped_records: usize,
    pub dropped_departments: usize,
    pub dropped_domains: usize,
    pub stripped_references: usize,
}

impl SanitizeReport {
    /// Fold the structural drops into the run's skip counters.
    pub fn record_skips(&self, stats: &mut ImportStats) {
        stats.skip_many(EntityKind::Establishment, self.dropped_records);
        stats.skip_many(EntityKind::Department, self.dropped_departments);
        stats.skip_many(EntityKind::Domain, self.dropped_domains);
        stats.skip_many(EntityKind::Reference, self.stripped_references);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sanitized {
    pub records: Vec<EstablishmentRecord>,
    pub report: SanitizeReport,
}

// --- structural rules, shared with the validator ---------------------------

/// Decode one top-level element, or say why it cannot be used.
pub(crate) fn decode_element(value: &RawRecord) -> Result<FeedEstablishment, String> {
    let Some(object) = value.as_object() else {
        return Err("record is not a JSON object".to_string());
    };
    if object.is_empty() {
        return Err("record is empty".to_string());
    }
    serde_json::from_value(value.clone()).map_err(|e| format!("record is malformed: {e}"))
}

pub(crate) fn missing_record_fields(record: &FeedEstablishment) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if non_blank(record.name.as_deref()).is_none() {
        missing.push("name");
    }
    if non_blank(record.category.as_deref()).is_none() {
        missing.push("category");
    }
    missing
}

pub(crate) fn missing_domain_fields(domain: &FeedDomain) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if non_blank(domain.domain_name.as_deref()).is_none() {
        missing.push("domain_name");
    }
    if non_blank(domain.grade.as_deref()).is_none() {
        missing.push("grade");
    }
    if domain.mentions.as_ref().map_or(true, Vec::is_empty) {
        missing.push("mentions");
    }
    missing
}

pub(crate) fn has_decree_number(reference: &FeedReference) -> bool {
    non_blank(reference.decree_number.as_deref()).is_some()
}

// ---------------------------------------------------------------------------

fn owned(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

fn sanitize_domains(
    domains: &[FeedDomain],
    owner: &str,
    report: &mut SanitizeReport,
) -> Vec<DomainRecord> {
    domains
        .iter()
        .filter_map(|domain| {
            let missing = missing_domain_fields(domain);
            if !missing.is_empty() {
                debug!(owner, ?missing, "dropping domain entry");
                report.dropped_domains += 1;
                return None;
            }
            let reference = match &domain.reference {
                Some(reference) if has_decree_number(reference) => Some(ReferenceRecord {
                    decree_number: owned(reference.decree_number.as_deref()).unwrap_or_default(),
                    authority: owned(reference.authority.as_deref()),
                    date: owned(reference.date.as_deref()),
                    description: owned(reference.description.as_deref()),
                    document_url: owned(reference.document_url.as_deref()),
                    reference_type: owned(reference.reference_type.as_deref()),
                    accreditation_date: owned(reference.accreditation_date.as_deref()),
                }),
                Some(_) => {
                    warn!(owner, "reference without decree number ignored");
                    report.stripped_references += 1;
                    None
                }
                None => None,
            };
            Some(DomainRecord {
                domain_name: owned(domain.domain_name.as_deref()).unwrap_or_default(),
                grade: owned(domain.grade.as_deref()).unwrap_or_default(),
                mentions: domain.mentions.clone().unwrap_or_default(),
                tuition_fees: owned(domain.tuition_fees.as_deref()),
                duration: owned(domain.duration.as_deref()),
                reference,
            })
        })
        .collect()
}

fn sanitize_departments(
    departments: &[FeedDepartment],
    owner: &str,
    report: &mut SanitizeReport,
) -> Vec<DepartmentRecord> {
    departments
        .iter()
        .filter_map(|department| {
            let Some(name) = non_blank(department.name.as_deref()) else {
                debug!(owner, "dropping department without name");
                report.dropped_departments += 1;
                return None;
            };
            Some(DepartmentRecord {
                name: name.to_string(),
                domains: sanitize_domains(&department.domains, owner, report),
            })
        })
        .collect()
}

/// Produce the cleaned records for a raw feed.
pub fn sanitize(raw: &[RawRecord]) -> Sanitized {
    let mut report = SanitizeReport::default();
    let mut records = Vec::with_capacity(raw.len());

    for (index, element) in raw.iter().enumerate() {
        let feed = match decode_element(element) {
            Ok(feed) => feed,
            Err(reason) => {
                warn!(index, %reason, "dropping record");
                report.dropped_records += 1;
                continue;
            }
        };
        let missing = missing_record_fields(&feed);
        if !missing.is_empty() {
            warn!(index, ?missing, "dropping record with missing fields");
            report.dropped_records += 1;
            continue;
        }

        let name = owned(feed.name.as_deref()).unwrap_or_default();
        let domains = sanitize_domains(&feed.domains, &name, &mut report);
        let departments = sanitize_departments(&feed.departments, &name, &mut report);
        records.push(EstablishmentRecord {
            category: owned(feed.category.as_deref()).unwrap_or_default(),
            abbreviation: owned(feed.abbreviation.as_deref()),
            address: owned(feed.address.as_deref()),
            latitude: feed.latitude,
            longitude: feed.longitude,
            region: owned(feed.region.as_deref()),
            city: owned(feed.city.as_deref()),
            affiliations: feed.affiliations,
            departments,
            domains,
            name,
        });
    }

    Sanitized { records, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_records_without_name_or_category() {
        let raw = vec![
            json!({}),
            json!("not an object"),
            json!({ "name": "Uni A" }),
            json!({ "category": "Public" }),
            json!({ "name": "  ", "category": "Public" }),
            json!({ "name": "Uni B", "category": "Public" }),
        ];
        let out = sanitize(&raw);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].name, "Uni B");
        assert_eq!(out.report.dropped_records, 5);
    }

    #[test]
    fn filters_domains_and_strips_references() {
        let raw = vec![json!({
            "name": "Uni A",
            "category": "Public",
            "domains": [
                { "domain_name": "CS", "grade": "Licence", "mentions": ["Systems"],
                  "reference": { "decree_number": "", "authority": "MESUPRES" } },
                { "domain_name": "CS", "grade": "Master", "mentions": [] },
                { "domain_name": "CS", "mentions": ["AI"] },
                { "domain_name": "Law", "grade": "Licence", "mentions": ["Public law"],
                  "reference": { "decree_number": "2020-01" } }
            ],
            "departments": [
                { "name": "", "domains": [] },
                { "name": "Faculty", "domains": [{ "domain_name": "Bio", "grade": "Master" }] }
            ]
        })];
        let original = raw.clone();
        let out = sanitize(&raw);

        assert_eq!(raw, original, "input must not be mutated");
        let record = &out.records[0];
        assert_eq!(record.domains.len(), 2);
        assert!(record.domains[0].reference.is_none());
        assert_eq!(
            record.domains[1].reference.as_ref().map(|r| r.decree_number.as_str()),
            Some("2020-01")
        );
        assert_eq!(record.departments.len(), 1);
        assert!(record.departments[0].domains.is_empty());
        assert_eq!(
            out.report,
            SanitizeReport {
                dropped_records: 0,
                dropped_departments: 1,
                dropped_domains: 3,
                stripped_references: 1,
            }
        );
    }

    #[test]
    fn bad_entries_inside_a_domain_keep_the_establishment() {
        let raw = vec![json!({
            "name": "Uni A",
            "category": "Public",
            "domains": [
                { "domain_name": "CS", "grade": "Licence", "mentions": ["Systems", null] },
                "not a domain"
            ]
        })];
        let out = sanitize(&raw);

        assert_eq!(out.report.dropped_records, 0);
        assert_eq!(out.report.dropped_domains, 1);
        let record = &out.records[0];
        assert_eq!(record.domains.len(), 1);
        assert_eq!(record.domains[0].mentions, vec!["Systems".to_string()]);
    }
}
