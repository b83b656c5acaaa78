use std::{fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Opaque identifier of an option.
///
/// Identifiers of loaded options are preserved verbatim; identifiers of
/// options created in an editing session are freshly generated UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(String);

impl OptionId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, globally unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for OptionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for OptionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single entry of an option catalogue.
///
/// An option without a parent is a top-level category; an option with a
/// parent is a sub-option of that category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    /// Stable identifier.
    #[serde(rename = "value")]
    pub id: OptionId,
    /// Display text. May be empty while editing, but not when saving.
    pub label: String,
    /// The top-level category this option belongs to, if any.
    #[serde(rename = "category", default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<OptionId>,
}

/// Stored catalogues mark top-level options with either `null` or `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<OptionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<OptionId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.as_str().is_empty()))
}

impl OptionRecord {
    /// Creates a top-level option.
    #[must_use]
    pub fn top_level(id: impl Into<OptionId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            parent_id: None,
        }
    }

    /// Creates a sub-option of `parent_id`.
    #[must_use]
    pub fn sub_option(
        id: impl Into<OptionId>,
        label: impl Into<String>,
        parent_id: impl Into<OptionId>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            parent_id: Some(parent_id.into()),
        }
    }

    /// Whether the option belongs to a top-level category.
    #[must_use]
    pub const fn is_sub_option(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// The catalogues that can be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Fields of activity.
    #[default]
    Activities,
    /// City districts.
    Districts,
}

impl OptionType {
    /// All option types.
    pub const ALL: [Self; 2] = [Self::Activities, Self::Districts];

    /// The lower-case name, also used as the data file stem.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activities => "activities",
            Self::Districts => "districts",
        }
    }

    /// What the options of this type are assigned as, for user prompts.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Activities => "fields of activity",
            Self::Districts => "areas of activity",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognised option type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown option type '{0}' (expected 'activities' or 'districts')")]
pub struct UnknownOptionType(String);

impl FromStr for OptionType {
    type Err = UnknownOptionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "activities" => Ok(Self::Activities),
            "districts" => Ok(Self::Districts),
            _ => Err(UnknownOptionType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(OptionId::generate(), OptionId::generate());
    }

    #[test]
    fn record_uses_original_wire_names() {
        let record = OptionRecord::sub_option("B", "Fußball", "A");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"value": "B", "label": "Fußball", "category": "A"})
        );
    }

    #[test]
    fn missing_category_is_top_level() {
        let record: OptionRecord = serde_json::from_str(r#"{"value":"A","label":"Sport"}"#).unwrap();
        assert!(!record.is_sub_option());
    }

    #[test_case(r#"{"value":"B","label":"Tennis","category":""}"#; "empty string")]
    #[test_case(r#"{"value":"B","label":"Tennis","category":null}"#; "null")]
    fn blank_category_is_top_level(json: &str) {
        let record: OptionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, OptionRecord::top_level("B", "Tennis"));
    }

    #[test_case("activities", OptionType::Activities; "activities")]
    #[test_case("Districts", OptionType::Districts; "mixed case")]
    #[test_case(" districts ", OptionType::Districts; "padded")]
    fn parses_option_type(input: &str, expected: OptionType) {
        assert_eq!(input.parse::<OptionType>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_option_type() {
        assert!("tags".parse::<OptionType>().is_err());
    }
}
