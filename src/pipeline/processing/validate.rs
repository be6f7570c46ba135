//! Read-only structural check of a feed. Applies the sanitizer's rules but
//! reports every violation instead of dropping data.

use serde::Serialize;

use crate::pipeline::processing::sanitize::{
    decode_element, has_decree_number, missing_domain_fields, missing_record_fields,
};
use crate::types::{non_blank, FeedDomain, RawRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordIssues {
    pub index: usize,
    /// Record name when one could be read, `#<index>` otherwise
    pub label: String,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub records: Vec<RecordIssues>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.records.is_empty()
    }

    pub fn invalid_records(&self) -> usize {
        self.records.len()
    }

    pub fn issue_count(&self) -> usize {
        self.records.iter().map(|r| r.issues.len()).sum()
    }
}

fn domain_issues(domains: &[FeedDomain], scope: &str, issues: &mut Vec<String>) {
    for (i, domain) in domains.iter().enumerate() {
        let label = match non_blank(domain.domain_name.as_deref()) {
            Some(name) => format!("{scope}domain #{i} ({name})"),
            None => format!("{scope}domain #{i}"),
        };
        let missing = missing_domain_fields(domain);
        if !missing.is_empty() {
            issues.push(format!("{label}: missing {}", missing.join(", ")));
        }
        if let Some(reference) = &domain.reference {
            if !has_decree_number(reference) {
                issues.push(format!("{label}: reference has no decree_number"));
            }
        }
    }
}

pub fn validate(raw: &[RawRecord]) -> ValidationReport {
    let mut records = Vec::new();

    for (index, element) in raw.iter().enumerate() {
        let mut issues = Vec::new();
        let mut label = format!("#{index}");

        match decode_element(element) {
            Err(reason) => issues.push(reason),
            Ok(feed) => {
                if let Some(name) = non_blank(feed.name.as_deref()) {
                    label = name.to_string();
                }
                let missing = missing_record_fields(&feed);
                if !missing.is_empty() {
                    issues.push(format!("missing {}", missing.join(", ")));
                }
                domain_issues(&feed.domains, "", &mut issues);
                for (d, department) in feed.departments.iter().enumerate() {
                    let scope = match non_blank(department.name.as_deref()) {
                        Some(name) => format!("department '{name}' / "),
                        None => {
                            issues.push(format!("department #{d}: missing name"));
                            format!("department #{d} / ")
                        }
                    };
                    domain_issues(&department.domains, &scope, &mut issues);
                }
            }
        }

        if !issues.is_empty() {
            records.push(RecordIssues {
                index,
                label,
                issues,
            });
        }
    }

    ValidationReport {
        total_records: raw.len(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_feed_has_no_issues() {
        let raw = vec![json!({
            "name": "Uni A",
            "category": "Public",
            "domains": [{ "domain_name": "CS", "grade": "Licence", "mentions": ["Systems"] }]
        })];
        let report = validate(&raw);
        assert!(report.is_valid());
        assert_eq!(report.total_records, 1);
    }

    #[test]
    fn reports_nested_issues_per_record() {
        let raw = vec![
            json!({ "name": "Uni A" }),
            json!({
                "name": "Uni B",
                "category": "Privé",
                "departments": [{
                    "name": "Faculté",
                    "domains": [{ "domain_name": "Droit", "grade": "Licence", "mentions": [],
                                  "reference": { "decree_number": " " } }]
                }, { "domains": [] }]
            }),
            json!(42),
        ];
        let report = validate(&raw);

        assert_eq!(report.invalid_records(), 3);
        assert_eq!(report.records[0].label, "Uni A");
        assert_eq!(report.records[0].issues, vec!["missing category"]);
        assert_eq!(
            report.records[1].issues,
            vec![
                "department 'Faculté' / domain #0 (Droit): missing mentions".to_string(),
                "department 'Faculté' / domain #0 (Droit): reference has no decree_number".to_string(),
                "department #1: missing name".to_string(),
            ]
        );
        assert_eq!(report.records[2].label, "#2");
        assert_eq!(report.issue_count(), 5);
    }
}
