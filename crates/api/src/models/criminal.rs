//! Criminal case record domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crime_track_core::CriminalId;

/// A criminal case record.
///
/// Serialized as the API's record JSON: camelCase keys, `_id` for the id and
/// `null` for absent optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criminal {
    #[serde(rename = "_id")]
    pub id: CriminalId,
    pub name: String,
    pub alias: Option<String>,
    pub statement: Option<String>,
    pub image: Option<String>,
    pub image_id: Option<String>,
    pub inmate_number: Option<i32>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub address: Option<String>,
    pub identification_number: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub arrest_date: Option<String>,
    pub arrest_location: Option<String>,
    pub charges: Option<String>,
    pub status: Option<String>,
    pub sealed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Criminal {
    /// Text fields covered by keyword search, in match order.
    #[must_use]
    pub fn searchable_fields(&self) -> [Option<&str>; 15] {
        [
            Some(self.name.as_str()),
            self.statement.as_deref(),
            self.alias.as_deref(),
            self.gender.as_deref(),
            self.nationality.as_deref(),
            self.address.as_deref(),
            self.identification_number.as_deref(),
            self.height.as_deref(),
            self.weight.as_deref(),
            self.eye_color.as_deref(),
            self.hair_color.as_deref(),
            self.arrest_date.as_deref(),
            self.arrest_location.as_deref(),
            self.charges.as_deref(),
            self.status.as_deref(),
        ]
    }
}

/// Partial update to a criminal record.
///
/// Text fields that are absent or empty leave the stored value untouched.
/// `sealed` and `inmateNumber` are applied whenever they are present, so a
/// record can be unsealed with `"sealed": false`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CriminalUpdate {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub statement: Option<String>,
    pub image: Option<String>,
    pub inmate_number: Option<i32>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub address: Option<String>,
    pub identification_number: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub arrest_date: Option<String>,
    pub arrest_location: Option<String>,
    pub charges: Option<String>,
    pub status: Option<String>,
    pub sealed: Option<bool>,
}

impl CriminalUpdate {
    /// Merge this update into `record`.
    pub fn apply_to(self, record: &mut Criminal) {
        if let Some(name) = non_empty(self.name) {
            record.name = name;
        }
        coalesce(&mut record.alias, self.alias);
        coalesce(&mut record.statement, self.statement);
        coalesce(&mut record.image, self.image);
        coalesce(&mut record.dob, self.dob);
        coalesce(&mut record.gender, self.gender);
        coalesce(&mut record.nationality, self.nationality);
        coalesce(&mut record.address, self.address);
        coalesce(
            &mut record.identification_number,
            self.identification_number,
        );
        coalesce(&mut record.height, self.height);
        coalesce(&mut record.weight, self.weight);
        coalesce(&mut record.eye_color, self.eye_color);
        coalesce(&mut record.hair_color, self.hair_color);
        coalesce(&mut record.arrest_date, self.arrest_date);
        coalesce(&mut record.arrest_location, self.arrest_location);
        coalesce(&mut record.charges, self.charges);
        coalesce(&mut record.status, self.status);

        if let Some(inmate_number) = self.inmate_number {
            record.inmate_number = Some(inmate_number);
        }
        if let Some(sealed) = self.sealed {
            record.sealed = sealed;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn coalesce(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = non_empty(value) {
        *target = Some(value);
    }
}

/// Keyword filter for listing records.
///
/// The keyword is a literal, case-insensitive substring matched against any
/// of [`Criminal::searchable_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriminalSearch {
    keyword: String,
}

impl CriminalSearch {
    /// Build a search from a query-string keyword. Blank keywords mean "no filter".
    #[must_use]
    pub fn from_keyword(keyword: Option<&str>) -> Option<Self> {
        keyword
            .filter(|k| !k.trim().is_empty())
            .map(|k| Self {
                keyword: k.to_string(),
            })
    }

    /// The keyword as a POSIX regex with every metacharacter escaped.
    #[must_use]
    pub fn pattern(&self) -> String {
        regex::escape(&self.keyword)
    }

    /// Whether `record` matches, using the same rule as the database query.
    #[must_use]
    pub fn matches(&self, record: &Criminal) -> bool {
        let needle = self.keyword.to_lowercase();
        record
            .searchable_fields()
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
