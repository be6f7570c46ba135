//! Typed find-or-create operations against the catalog store. Each function
//! takes the natural key of its entity, looks the row up by that key, and
//! either inserts it or selectively updates its mutable display fields.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::db::{date_text, now_timestamp, opt_date_at, opt_uuid_at, uuid_at};
use crate::domain::{Accreditation, EntityKind, Establishment, ProgramOffering, Reference};
use crate::error::Result;

use super::changes::{ChangeSet, Upsert};
use super::keys::*;

/// Kinds whose whole identity is a single name column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTable {
    Category,
    Domain,
    Grade,
    Mention,
}

impl NamedTable {
    pub fn kind(self) -> EntityKind {
        match self {
            NamedTable::Category => EntityKind::Category,
            NamedTable::Domain => EntityKind::Domain,
            NamedTable::Grade => EntityKind::Grade,
            NamedTable::Mention => EntityKind::Mention,
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn upsert_named(conn: &Connection, table: NamedTable, key: &NameKey) -> Result<Upsert<Uuid>> {
    let kind = table.kind();
    let select = format!("SELECT id FROM {} WHERE name = ?1", kind.table());
    if let Some(id) = conn
        .query_row(&select, params![key.as_str()], |row| uuid_at(row, 0))
        .optional()?
    {
        return Ok(Upsert::Unchanged(id));
    }

    let id = Uuid::new_v4();
    let insert = format!(
        "INSERT INTO {} (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        kind.table()
    );
    conn.execute(&insert, params![id.to_string(), key.as_str(), now_timestamp()])?;
    debug!(kind = %kind, name = %key, "created");
    Ok(Upsert::Created(id))
}

// ---------------------------------------------------------------------------
// Establishment

/// Mutable fields proposed by one feed record
#[derive(Debug, Clone, Default)]
pub struct EstablishmentFields<'a> {
    pub abbreviation: Option<&'a str>,
    pub address: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<&'a str>,
    pub city: Option<&'a str>,
}

const ESTABLISHMENT_COLUMNS: &str =
    "id, name, abbreviation, category_id, address, latitude, longitude, region, city";

fn establishment_from_row(row: &Row<'_>) -> rusqlite::Result<Establishment> {
    Ok(Establishment {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        abbreviation: row.get(2)?,
        category_id: uuid_at(row, 3)?,
        address: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        region: row.get(7)?,
        city: row.get(8)?,
    })
}

pub fn find_establishment(conn: &Connection, key: &EstablishmentKey) -> Result<Option<Establishment>> {
    let sql = format!("SELECT {ESTABLISHMENT_COLUMNS} FROM establishments WHERE name = ?1");
    let found = conn
        .query_row(&sql, params![key.as_str()], establishment_from_row)
        .optional()?;
    Ok(found)
}

pub fn upsert_establishment(
    conn: &Connection,
    key: &EstablishmentKey,
    category_id: Uuid,
    fields: &EstablishmentFields<'_>,
) -> Result<Upsert<Establishment>> {
    let Some(mut current) = find_establishment(conn, key)? else {
        let establishment = Establishment {
            id: Uuid::new_v4(),
            name: key.as_str().to_string(),
            abbreviation: trimmed(fields.abbreviation),
            category_id,
            address: trimmed(fields.address),
            latitude: fields.latitude,
            longitude: fields.longitude,
            region: trimmed(fields.region),
            city: trimmed(fields.city),
        };
        let now = now_timestamp();
        conn.execute(
            &format!(
                "INSERT INTO establishments ({ESTABLISHMENT_COLUMNS}, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)"
            ),
            params![
                establishment.id.to_string(),
                establishment.name,
                establishment.abbreviation,
                establishment.category_id.to_string(),
                establishment.address,
                establishment.latitude,
                establishment.longitude,
                establishment.region,
                establishment.city,
                now,
            ],
        )?;
        debug!(name = %key, "created establishment");
        return Ok(Upsert::Created(establishment));
    };

    let mut changes = ChangeSet::default();
    changes.fill_text("abbreviation", &mut current.abbreviation, fields.abbreviation);
    if current.category_id != category_id {
        changes.add_change(
            "category_id",
            Some(current.category_id.to_string()),
            Some(category_id.to_string()),
        );
        current.category_id = category_id;
    }
    changes.fill_text("address", &mut current.address, fields.address);
    changes.fill_number("latitude", &mut current.latitude, fields.latitude);
    changes.fill_number("longitude", &mut current.longitude, fields.longitude);
    changes.fill_text("region", &mut current.region, fields.region);
    changes.fill_text("city", &mut current.city, fields.city);

    if !changes.has_changes() {
        return Ok(Upsert::Unchanged(current));
    }
    save_establishment(conn, &current)?;
    debug!(name = %key, changes = %changes.summary(), "updated establishment");
    Ok(Upsert::Updated(current))
}

/// Persist the mutable columns of an already-resolved establishment.
pub fn save_establishment(conn: &Connection, establishment: &Establishment) -> Result<()> {
    conn.execute(
        "UPDATE establishments
         SET abbreviation = ?2, category_id = ?3, address = ?4, latitude = ?5,
             longitude = ?6, region = ?7, city = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            establishment.id.to_string(),
            establishment.abbreviation,
            establishment.category_id.to_string(),
            establishment.address,
            establishment.latitude,
            establishment.longitude,
            establishment.region,
            establishment.city,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Department / Affiliation

pub fn upsert_department(conn: &Connection, key: &DepartmentKey) -> Result<Upsert<Uuid>> {
    if let Some(id) = conn
        .query_row(
            "SELECT id FROM departments WHERE establishment_id = ?1 AND name = ?2",
            params![key.establishment_id.to_string(), key.name],
            |row| uuid_at(row, 0),
        )
        .optional()?
    {
        return Ok(Upsert::Unchanged(id));
    }
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO departments (id, establishment_id, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            id.to_string(),
            key.establishment_id.to_string(),
            key.name,
            now_timestamp()
        ],
    )?;
    debug!(department = %key.name, "created department");
    Ok(Upsert::Created(id))
}

pub fn upsert_affiliation(conn: &Connection, key: &AffiliationKey) -> Result<Upsert<Uuid>> {
    if let Some(id) = conn
        .query_row(
            "SELECT id FROM affiliations WHERE establishment_id = ?1 AND institution_name = ?2",
            params![key.establishment_id.to_string(), key.institution_name],
            |row| uuid_at(row, 0),
        )
        .optional()?
    {
        return Ok(Upsert::Unchanged(id));
    }
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO affiliations (id, establishment_id, institution_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            id.to_string(),
            key.establishment_id.to_string(),
            key.institution_name,
            now_timestamp()
        ],
    )?;
    debug!(institution = %key.institution_name, "created affiliation");
    Ok(Upsert::Created(id))
}

// ---------------------------------------------------------------------------
// Program offering

#[derive(Debug, Clone, Default)]
pub struct OfferingDetails<'a> {
    pub tuition_fees: Option<&'a str>,
    pub duration: Option<&'a str>,
}

fn offering_from_row(row: &Row<'_>) -> rusqlite::Result<ProgramOffering> {
    Ok(ProgramOffering {
        id: uuid_at(row, 0)?,
        establishment_id: uuid_at(row, 1)?,
        domain_id: uuid_at(row, 2)?,
        grade_id: uuid_at(row, 3)?,
        mention_id: uuid_at(row, 4)?,
        department_id: opt_uuid_at(row, 5)?,
        tuition_fees: row.get(6)?,
        duration: row.get(7)?,
    })
}

pub fn find_program_offering(conn: &Connection, key: &ProgramOfferingKey) -> Result<Option<ProgramOffering>> {
    let found = conn
        .query_row(
            "SELECT id, establishment_id, domain_id, grade_id, mention_id, department_id,
                    tuition_fees, duration
             FROM program_offerings
             WHERE establishment_id = ?1 AND domain_id = ?2 AND grade_id = ?3
               AND mention_id = ?4 AND department_id IS ?5",
            params![
                key.establishment_id.to_string(),
                key.domain_id.to_string(),
                key.grade_id.to_string(),
                key.mention_id.to_string(),
                key.department_id.map(|d| d.to_string()),
            ],
            offering_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn upsert_program_offering(
    conn: &Connection,
    key: &ProgramOfferingKey,
    details: &OfferingDetails<'_>,
) -> Result<Upsert<ProgramOffering>> {
    let Some(mut current) = find_program_offering(conn, key)? else {
        let offering = ProgramOffering {
            id: Uuid::new_v4(),
            establishment_id: key.establishment_id,
            domain_id: key.domain_id,
            grade_id: key.grade_id,
            mention_id: key.mention_id,
            department_id: key.department_id,
            tuition_fees: trimmed(details.tuition_fees),
            duration: trimmed(details.duration),
        };
        conn.execute(
            "INSERT INTO program_offerings (id, establishment_id, domain_id, grade_id, mention_id,
                 department_id, tuition_fees, duration, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                offering.id.to_string(),
                offering.establishment_id.to_string(),
                offering.domain_id.to_string(),
                offering.grade_id.to_string(),
                offering.mention_id.to_string(),
                offering.department_id.map(|d| d.to_string()),
                offering.tuition_fees,
                offering.duration,
                now_timestamp(),
            ],
        )?;
        return Ok(Upsert::Created(offering));
    };

    let mut changes = ChangeSet::default();
    changes.fill_text("tuition_fees", &mut current.tuition_fees, details.tuition_fees);
    changes.fill_text("duration", &mut current.duration, details.duration);
    if !changes.has_changes() {
        return Ok(Upsert::Unchanged(current));
    }
    conn.execute(
        "UPDATE program_offerings SET tuition_fees = ?2, duration = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            current.id.to_string(),
            current.tuition_fees,
            current.duration,
            now_timestamp()
        ],
    )?;
    debug!(changes = %changes.summary(), "updated program offering");
    Ok(Upsert::Updated(current))
}

// ---------------------------------------------------------------------------
// Reference / Accreditation

#[derive(Debug, Clone, Default)]
pub struct ReferenceDetails<'a> {
    pub main_date: Option<NaiveDate>,
    pub description: Option<&'a str>,
    pub document_url: Option<&'a str>,
}

pub fn find_reference(conn: &Connection, key: &ReferenceKey) -> Result<Option<Reference>> {
    let found = conn
        .query_row(
            "SELECT id, title, main_date, description, document_url
             FROM decree_references WHERE title = ?1",
            params![key.title()],
            |row| {
                Ok(Reference {
                    id: uuid_at(row, 0)?,
                    title: row.get(1)?,
                    main_date: opt_date_at(row, 2)?,
                    description: row.get(3)?,
                    document_url: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

pub fn upsert_reference(
    conn: &Connection,
    key: &ReferenceKey,
    details: &ReferenceDetails<'_>,
) -> Result<Upsert<Reference>> {
    let Some(mut current) = find_reference(conn, key)? else {
        let reference = Reference {
            id: Uuid::new_v4(),
            title: key.title().to_string(),
            main_date: details.main_date,
            description: trimmed(details.description),
            document_url: trimmed(details.document_url),
        };
        conn.execute(
            "INSERT INTO decree_references (id, title, main_date, description, document_url,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                reference.id.to_string(),
                reference.title,
                date_text(reference.main_date),
                reference.description,
                reference.document_url,
                now_timestamp(),
            ],
        )?;
        debug!(title = %reference.title, "created reference");
        return Ok(Upsert::Created(reference));
    };

    let mut changes = ChangeSet::default();
    if let Some(date) = details.main_date {
        if current.main_date != Some(date) {
            changes.add_change(
                "main_date",
                date_text(current.main_date),
                date_text(Some(date)),
            );
            current.main_date = Some(date);
        }
    }
    changes.fill_text("description", &mut current.description, details.description);
    changes.fill_text("document_url", &mut current.document_url, details.document_url);
    if !changes.has_changes() {
        return Ok(Upsert::Unchanged(current));
    }
    conn.execute(
        "UPDATE decree_references
         SET main_date = ?2, description = ?3, document_url = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            current.id.to_string(),
            date_text(current.main_date),
            current.description,
            current.document_url,
            now_timestamp(),
        ],
    )?;
    debug!(title = %current.title, changes = %changes.summary(), "updated reference");
    Ok(Upsert::Updated(current))
}

#[derive(Debug, Clone, Default)]
pub struct AccreditationDetails<'a> {
    pub reference_type: Option<&'a str>,
    pub accreditation_date: Option<NaiveDate>,
    pub is_recent: bool,
}

pub fn find_accreditation(conn: &Connection, key: &AccreditationKey) -> Result<Option<Accreditation>> {
    let found = conn
        .query_row(
            "SELECT id, program_offering_id, reference_id, reference_type, accreditation_date, is_recent
             FROM accreditations WHERE program_offering_id = ?1 AND reference_id = ?2",
            params![key.program_offering_id.to_string(), key.reference_id.to_string()],
            |row| {
                Ok(Accreditation {
                    id: uuid_at(row, 0)?,
                    program_offering_id: uuid_at(row, 1)?,
                    reference_id: uuid_at(row, 2)?,
                    reference_type: row.get(3)?,
                    accreditation_date: opt_date_at(row, 4)?,
                    is_recent: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

/// Accreditations are write-once: an existing row is reported as
/// `Unchanged` and never touched, including its `is_recent` snapshot.
pub fn ensure_accreditation(
    conn: &Connection,
    key: &AccreditationKey,
    details: &AccreditationDetails<'_>,
) -> Result<Upsert<Accreditation>> {
    if let Some(existing) = find_accreditation(conn, key)? {
        return Ok(Upsert::Unchanged(existing));
    }
    let accreditation = Accreditation {
        id: Uuid::new_v4(),
        program_offering_id: key.program_offering_id,
        reference_id: key.reference_id,
        reference_type: trimmed(details.reference_type),
        accreditation_date: details.accreditation_date,
        is_recent: details.is_recent,
    };
    conn.execute(
        "INSERT INTO accreditations (id, program_offering_id, reference_id, reference_type,
             accreditation_date, is_recent, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            accreditation.id.to_string(),
            accreditation.program_offering_id.to_string(),
            accreditation.reference_id.to_string(),
            accreditation.reference_type,
            date_text(accreditation.accreditation_date),
            accreditation.is_recent,
            now_timestamp(),
        ],
    )?;
    Ok(Upsert::Created(accreditation))
}
