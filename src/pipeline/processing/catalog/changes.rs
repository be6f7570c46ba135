use serde::{Deserialize, Serialize};

/// Outcome of resolving one entity by its natural key
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<T> {
    /// No row matched the key; a new one was inserted
    Created(T),
    /// An existing row matched and some mutable fields were rewritten
    Updated(T),
    /// An existing row matched and nothing needed to change
    Unchanged(T),
}

impl<T> Upsert<T> {
    pub fn value(&self) -> &T {
        match self {
            Upsert::Created(v) | Upsert::Updated(v) | Upsert::Unchanged(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Upsert::Created(v) | Upsert::Updated(v) | Upsert::Unchanged(v) => v,
        }
    }

}

/// Describes which mutable fields of an existing row were rewritten
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changed_fields: Vec<FieldChange>,
}

/// Represents a single field change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.changed_fields.is_empty()
    }

    pub fn add_change(&mut self, field: &str, old_value: Option<String>, new_value: Option<String>) {
        self.changed_fields.push(FieldChange {
            field_name: field.to_string(),
            old_value,
            new_value,
        });
    }

    /// Set-never-clear: an absent proposal leaves the current value alone.
    /// Returns true when the field was rewritten.
    pub fn fill_text(&mut self, field: &str, current: &mut Option<String>, proposed: Option<&str>) -> bool {
        let Some(proposed) = proposed.map(str::trim).filter(|p| !p.is_empty()) else {
            return false;
        };
        if current.as_deref() == Some(proposed) {
            return false;
        }
        self.add_change(field, current.clone(), Some(proposed.to_string()));
        *current = Some(proposed.to_string());
        true
    }

    pub fn fill_number(&mut self, field: &str, current: &mut Option<f64>, proposed: Option<f64>) -> bool {
        let Some(proposed) = proposed else {
            return false;
        };
        if *current == Some(proposed) {
            return false;
        }
        self.add_change(field, current.map(|v| v.to_string()), Some(proposed.to_string()));
        *current = Some(proposed);
        true
    }

    pub fn summary(&self) -> String {
        self.changed_fields
            .iter()
            .map(|c| c.field_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_text_never_clears() {
        let mut changes = ChangeSet::default();
        let mut current = Some("123 Rue A".to_string());

        assert!(!changes.fill_text("address", &mut current, None));
        assert!(!changes.fill_text("address", &mut current, Some("   ")));
        assert!(!changes.fill_text("address", &mut current, Some(" 123 Rue A ")));
        assert!(!changes.has_changes());

        assert!(changes.fill_text("address", &mut current, Some("7 Rue B")));
        assert_eq!(current.as_deref(), Some("7 Rue B"));
        assert_eq!(changes.summary(), "address");
    }

    #[test]
    fn fill_number_tracks_old_value() {
        let mut changes = ChangeSet::default();
        let mut lat = None;
        assert!(changes.fill_number("latitude", &mut lat, Some(-18.9)));
        assert_eq!(lat, Some(-18.9));
        assert_eq!(changes.changed_fields[0].old_value, None);
    }
}
