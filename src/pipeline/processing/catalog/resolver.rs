use chrono::NaiveDate;
use std::collections::HashSet;
use rusqlite::Connection;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::constants::RECENT_ACCREDITATION_DAYS;
use crate::domain::EntityKind;
use crate::error::Result;
use crate::pipeline::processing::enrich::{GeoEnricher, GeoOutcome};
use crate::pipeline::processing::normalize::{normalize_grade, parse_feed_date};
use crate::pipeline::processing::sanitize::{DomainRecord, EstablishmentRecord, ReferenceRecord};
use crate::pipeline::stats::ImportStats;
use crate::types::non_blank;

use super::keys::*;
use super::upsert::*;

/// Feature switches of the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSettings {
    pub departments: bool,
    pub affiliations: bool,
    /// Reference point for the accreditation recency snapshot
    pub run_date: NaiveDate,
}

impl ResolveSettings {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            departments: true,
            affiliations: true,
            run_date,
        }
    }
}

/// What one establishment record materialized into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub establishment_id: Uuid,
    pub program_offerings: usize,
    pub accreditations: usize,
}

/// True iff `date` lies within the recency window ending on `run_date`.
pub fn is_recent(date: Option<NaiveDate>, run_date: NaiveDate) -> bool {
    date.is_some_and(|d| (0..=RECENT_ACCREDITATION_DAYS).contains(&(run_date - d).num_days()))
}

/// Parse an optional feed date, warning (not failing) when it is malformed.
fn feed_date(raw: Option<&str>, field: &str, decree: &str) -> Option<NaiveDate> {
    let raw = non_blank(raw)?;
    let parsed = parse_feed_date(raw);
    if parsed.is_none() {
        warn!(decree, field, value = raw, "unparseable date left unset");
    }
    parsed
}

/// Reference resolved for one domain entry, plus what its accreditations carry
struct ResolvedReference<'r> {
    reference_id: Uuid,
    details: AccreditationDetails<'r>,
}

/// Walks one sanitized establishment record and upserts its entity graph
/// in dependency order: category, establishment, affiliations, departments,
/// then domains with their offerings and accreditations.
pub struct Resolver<'a> {
    enricher: Option<&'a GeoEnricher>,
    settings: ResolveSettings,
}

impl<'a> Resolver<'a> {
    pub fn new(enricher: Option<&'a GeoEnricher>, settings: ResolveSettings) -> Self {
        Self { enricher, settings }
    }

    #[instrument(skip_all, fields(establishment = %record.name))]
    pub async fn resolve(
        &self,
        conn: &Connection,
        record: &EstablishmentRecord,
        stats: &mut ImportStats,
    ) -> Result<ResolvedRecord> {
        let category = upsert_named(conn, NamedTable::Category, &NameKey::new(&record.category))?;
        stats.record(EntityKind::Category, &category);

        let key = EstablishmentKey::new(&record.name);
        let fields = EstablishmentFields {
            abbreviation: record.abbreviation.as_deref(),
            address: record.address.as_deref(),
            latitude: record.latitude,
            longitude: record.longitude,
            region: record.region.as_deref(),
            city: record.city.as_deref(),
        };
        let upsert = upsert_establishment(conn, &key, category.into_value(), &fields)?;
        stats.record(EntityKind::Establishment, &upsert);
        let mut establishment = upsert.into_value();

        if let Some(enricher) = self.enricher {
            if GeoEnricher::needs_lookup(&establishment) {
                match enricher.enrich(&mut establishment).await {
                    GeoOutcome::Located(changes) => {
                        if changes.has_changes() {
                            save_establishment(conn, &establishment)?;
                        }
                        stats.geo_success();
                    }
                    GeoOutcome::Failed(reason) => {
                        debug!(%reason, "coordinates left unset");
                        stats.geo_failure();
                    }
                }
            }
        }

        if self.settings.affiliations {
            for institution in record.affiliations.iter().filter_map(|a| non_blank(Some(a.as_str()))) {
                let affiliation =
                    upsert_affiliation(conn, &AffiliationKey::new(establishment.id, institution))?;
                stats.record(EntityKind::Affiliation, &affiliation);
            }
        } else {
            stats.skip_many(EntityKind::Affiliation, record.affiliations.len());
        }

        let mut resolved = ResolvedRecord {
            establishment_id: establishment.id,
            program_offerings: 0,
            accreditations: 0,
        };

        if self.settings.departments {
            for department in &record.departments {
                let dept = upsert_department(conn, &DepartmentKey::new(establishment.id, &department.name))?;
                stats.record(EntityKind::Department, &dept);
                let department_id = dept.into_value();
                for domain in &department.domains {
                    self.resolve_domain(conn, establishment.id, Some(department_id), domain, stats, &mut resolved)?;
                }
            }
        } else if !record.departments.is_empty() {
            debug!(count = record.departments.len(), "department support disabled, skipping");
            stats.skip_many(EntityKind::Department, record.departments.len());
        }

        for domain in &record.domains {
            self.resolve_domain(conn, establishment.id, None, domain, stats, &mut resolved)?;
        }

        Ok(resolved)
    }

    fn resolve_domain(
        &self,
        conn: &Connection,
        establishment_id: Uuid,
        department_id: Option<Uuid>,
        domain: &DomainRecord,
        stats: &mut ImportStats,
        resolved: &mut ResolvedRecord,
    ) -> Result<()> {
        let domain_upsert = upsert_named(conn, NamedTable::Domain, &NameKey::new(&domain.domain_name))?;
        stats.record(EntityKind::Domain, &domain_upsert);
        let domain_id = domain_upsert.into_value();

        // mention names are case-insensitive keys; repeats map to the same offering
        let mut seen = HashSet::new();
        let mentions: Vec<&str> = domain
            .mentions
            .iter()
            .filter_map(|m| non_blank(Some(m.as_str())))
            .filter(|m| seen.insert(m.to_lowercase()))
            .collect();
        if mentions.is_empty() {
            debug!(domain = %domain.domain_name, "no usable mention, no offering created");
            return Ok(());
        }

        let reference = domain
            .reference
            .as_ref()
            .map(|r| self.resolve_reference(conn, r, stats))
            .transpose()?;

        let grades = normalize_grade(&domain.grade);
        let details = OfferingDetails {
            tuition_fees: domain.tuition_fees.as_deref(),
            duration: domain.duration.as_deref(),
        };

        for grade in grades.iter() {
            let grade_upsert = upsert_named(conn, NamedTable::Grade, &NameKey::new(grade))?;
            stats.record(EntityKind::Grade, &grade_upsert);
            let grade_id = grade_upsert.into_value();

            for mention in &mentions {
                let mention_upsert = upsert_named(conn, NamedTable::Mention, &NameKey::new(mention))?;
                stats.record(EntityKind::Mention, &mention_upsert);

                let key = ProgramOfferingKey {
                    establishment_id,
                    domain_id,
                    grade_id,
                    mention_id: mention_upsert.into_value(),
                    department_id,
                };
                let offering = upsert_program_offering(conn, &key, &details)?;
                stats.record(EntityKind::ProgramOffering, &offering);
                let offering_id = offering.into_value().id;
                resolved.program_offerings += 1;

                if let Some(reference) = &reference {
                    let key = AccreditationKey {
                        program_offering_id: offering_id,
                        reference_id: reference.reference_id,
                    };
                    let accreditation = ensure_accreditation(conn, &key, &reference.details)?;
                    stats.record(EntityKind::Accreditation, &accreditation);
                    resolved.accreditations += 1;
                }
            }
        }
        Ok(())
    }

    fn resolve_reference<'r>(
        &self,
        conn: &Connection,
        reference: &'r ReferenceRecord,
        stats: &mut ImportStats,
    ) -> Result<ResolvedReference<'r>> {
        let decree = reference.decree_number.as_str();
        let main_date = feed_date(reference.date.as_deref(), "date", decree);
        let accreditation_date = match reference.accreditation_date.as_deref() {
            Some(raw) => feed_date(Some(raw), "accreditation_date", decree),
            None => main_date,
        };

        let key = ReferenceKey::from_decree(reference.authority.as_deref(), decree);
        let upsert = upsert_reference(
            conn,
            &key,
            &ReferenceDetails {
                main_date,
                description: reference.description.as_deref(),
                document_url: reference.document_url.as_deref(),
            },
        )?;
        stats.record(EntityKind::Reference, &upsert);

        Ok(ResolvedReference {
            reference_id: upsert.into_value().id,
            details: AccreditationDetails {
                reference_type: reference.reference_type.as_deref(),
                accreditation_date,
                is_recent: is_recent(accreditation_date, self.settings.run_date),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recency_window() {
        let run = day(2024, 6, 30);
        assert!(is_recent(Some(run), run));
        assert!(is_recent(Some(day(2023, 7, 1)), run));
        assert!(!is_recent(Some(day(2023, 6, 29)), run));
        assert!(!is_recent(Some(day(2024, 7, 1)), run), "future dates are not recent");
        assert!(!is_recent(None, run));
    }

    #[tokio::test]
    async fn repeated_mentions_resolve_to_one_offering() {
        let conn = crate::db::open_in_memory().unwrap();
        let raw = vec![serde_json::json!({
            "name": "Uni A",
            "category": "Public",
            "domains": [{
                "domain_name": "CS",
                "grade": "Licence",
                "mentions": ["Systems", " systems", "SYSTEMS ", ""],
                "reference": { "decree_number": "2024-001", "date": "2024-01-10" }
            }]
        })];
        let sanitized = crate::pipeline::processing::sanitize::sanitize(&raw);
        let resolver = Resolver::new(None, ResolveSettings::new(day(2024, 6, 30)));
        let mut stats = ImportStats::new();

        let resolved = resolver
            .resolve(&conn, &sanitized.records[0], &mut stats)
            .await
            .unwrap();

        assert_eq!(resolved.program_offerings, 1);
        assert_eq!(resolved.accreditations, 1);
        assert_eq!(stats.created(EntityKind::ProgramOffering), 1);
        assert_eq!(stats.get(EntityKind::Mention).skipped, 0);
    }
}
