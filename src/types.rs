use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw feed element as decoded from the input array
pub type RawRecord = serde_json::Value;

/// Lenient view of one establishment entry in the feed. Every field is
/// optional here; the sanitizer decides what is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEstablishment {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub abbreviation: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(alias = "doctoral_schools", deserialize_with = "lenient_text_list")]
    pub affiliations: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub departments: Vec<FeedDepartment>,
    #[serde(deserialize_with = "lenient_list")]
    pub domains: Vec<FeedDomain>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedDepartment {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub domains: Vec<FeedDomain>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedDomain {
    #[serde(deserialize_with = "lenient_text")]
    pub domain_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub grade: Option<String>,
    #[serde(deserialize_with = "lenient_mentions")]
    pub mentions: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_text")]
    pub tuition_fees: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient_object")]
    pub reference: Option<FeedReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedReference {
    #[serde(deserialize_with = "lenient_text")]
    pub authority: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub decree_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub document_url: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub reference_type: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub accreditation_date: Option<String>,
}

/// Feeds carry coordinates as numbers, numeric strings, empty strings or null.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

/// Text fields: strings as-is, numbers and booleans stringified, anything else unset.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_of))
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Keeps the usable entries of a list of names; a non-list yields nothing.
fn text_list(value: Option<Value>) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => Some(items.into_iter().filter_map(text_of).collect()),
        _ => None,
    }
}

fn lenient_text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_list(Option::<Value>::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_mentions<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_list(Option::<Value>::deserialize(deserializer)?))
}

/// Nested entries that do not decode become empty defaults, so the sanitizer
/// drops and counts them instead of losing the whole establishment.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|v| !v.is_null())
        .map(|v| serde_json::from_value(v).unwrap_or_default()))
}

/// Trimmed, non-empty view of an optional text field.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coordinates_accept_numbers_and_strings() {
        let e: FeedEstablishment = serde_json::from_value(json!({
            "latitude": "-18,9137",
            "longitude": 47.5361
        }))
        .unwrap();
        assert_eq!(e.latitude, Some(-18.9137));
        assert_eq!(e.longitude, Some(47.5361));

        let e: FeedEstablishment =
            serde_json::from_value(json!({ "latitude": "", "longitude": null })).unwrap();
        assert_eq!(e.latitude, None);
        assert_eq!(e.longitude, None);
    }

    #[test]
    fn doctoral_schools_alias() {
        let e: FeedEstablishment =
            serde_json::from_value(json!({ "doctoral_schools": ["ED Sciences"] })).unwrap();
        assert_eq!(e.affiliations, vec!["ED Sciences".to_string()]);
    }

    #[test]
    fn odd_values_do_not_fail_the_establishment() {
        let e: FeedEstablishment = serde_json::from_value(json!({
            "name": "Uni A",
            "abbreviation": 42,
            "city": { "nested": true },
            "affiliations": ["ED Sciences", null, 7],
            "departments": ["not an object", { "name": "Sciences" }],
            "domains": [{
                "domain_name": "CS",
                "grade": "Licence",
                "mentions": ["Systems", null, 3],
                "duration": 36,
                "reference": "2019-123"
            }]
        }))
        .unwrap();

        assert_eq!(e.abbreviation.as_deref(), Some("42"));
        assert_eq!(e.city, None);
        assert_eq!(e.affiliations, vec!["ED Sciences", "7"]);
        assert_eq!(e.departments.len(), 2);
        assert_eq!(e.departments[0].name, None);
        let domain = &e.domains[0];
        assert_eq!(domain.mentions.as_deref(), Some(&["Systems".to_string(), "3".to_string()][..]));
        assert_eq!(domain.duration.as_deref(), Some("36"));
        assert_eq!(domain.reference.as_ref().and_then(|r| r.decree_number.clone()), None);
    }
}
