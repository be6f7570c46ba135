use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The entity kinds materialized by the importer, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Category,
    Establishment,
    Affiliation,
    Department,
    Domain,
    Grade,
    Mention,
    ProgramOffering,
    Reference,
    Accreditation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Category,
        EntityKind::Establishment,
        EntityKind::Affiliation,
        EntityKind::Department,
        EntityKind::Domain,
        EntityKind::Grade,
        EntityKind::Mention,
        EntityKind::ProgramOffering,
        EntityKind::Reference,
        EntityKind::Accreditation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Category => "Category",
            EntityKind::Establishment => "Establishment",
            EntityKind::Affiliation => "Affiliation",
            EntityKind::Department => "Department",
            EntityKind::Domain => "Domain",
            EntityKind::Grade => "Grade",
            EntityKind::Mention => "Mention",
            EntityKind::ProgramOffering => "ProgramOffering",
            EntityKind::Reference => "Reference",
            EntityKind::Accreditation => "Accreditation",
        }
    }

    /// Backing table in the catalog store
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Category => "categories",
            EntityKind::Establishment => "establishments",
            EntityKind::Affiliation => "affiliations",
            EntityKind::Department => "departments",
            EntityKind::Domain => "domains",
            EntityKind::Grade => "grades",
            EntityKind::Mention => "mentions",
            EntityKind::ProgramOffering => "program_offerings",
            EntityKind::Reference => "decree_references",
            EntityKind::Accreditation => "accreditations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Establishment {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: Option<String>,
    pub category_id: Uuid,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl Establishment {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramOffering {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub domain_id: Uuid,
    pub grade_id: Uuid,
    pub mention_id: Uuid,
    pub department_id: Option<Uuid>,
    pub tuition_fees: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    pub title: String,
    pub main_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accreditation {
    pub id: Uuid,
    pub program_offering_id: Uuid,
    pub reference_id: Uuid,
    pub reference_type: Option<String>,
    pub accreditation_date: Option<NaiveDate>,
    /// Snapshot taken when the row was created; never recomputed.
    pub is_recent: bool,
}
