//! Raw and canonical listing records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Columns retained from the raw export. Everything else is dropped on selection.
pub const RAW_COLUMNS: [&str; 39] = [
    "id",
    "listing_url",
    "last_scraped",
    "name",
    "description",
    "property_type",
    "room_type",
    "accommodates",
    "bathrooms_text",
    "bedrooms",
    "beds",
    "amenities",
    "price",
    "minimum_nights",
    "maximum_nights",
    "instant_bookable",
    "host_id",
    "host_name",
    "host_since",
    "host_location",
    "host_about",
    "host_is_superhost",
    "host_listings_count",
    "host_has_profile_pic",
    "host_identity_verified",
    "neighbourhood_cleansed",
    "latitude",
    "longitude",
    "number_of_reviews",
    "review_scores_rating",
    "review_scores_accuracy",
    "review_scores_cleanliness",
    "review_scores_checkin",
    "review_scores_communication",
    "review_scores_location",
    "review_scores_value",
    "first_review",
    "last_review",
    "has_availability",
];

/// One loosely-typed row from the raw export, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    /// The raw text of `column`, or `None` when the column is absent or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keeps only the columns in `allowed`, returning the projected record and how many
    /// columns were dropped.
    pub fn select(mut self, allowed: &[&str]) -> (Self, usize) {
        let before = self.fields.len();
        self.fields.retain(|column, _| allowed.contains(&column.as_str()));
        let dropped = before - self.fields.len();
        (self, dropped)
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A cleaned, fully-typed listing.
///
/// Serialises to one row of the canonical CSV. Dates are written as RFC 3339 (empty when
/// unknown) and `amenities` as a list literal; both are read back through the same coercers
/// that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: Option<i64>,
    pub listing_url: Option<String>,
    #[serde(with = "canonical_date")]
    pub last_scraped: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub description: String,
    pub property_type: Option<String>,
    pub room_type: Option<String>,
    pub accommodates: Option<i64>,
    pub bathrooms: f64,
    pub bedrooms: f64,
    pub beds: f64,
    #[serde(with = "canonical_list")]
    pub amenities: Vec<String>,
    pub price: f64,
    pub minimum_nights: Option<i64>,
    pub maximum_nights: Option<i64>,
    pub instant_bookable: bool,
    pub host_id: Option<i64>,
    pub host_name: Option<String>,
    #[serde(with = "canonical_date")]
    pub host_since: Option<DateTime<Utc>>,
    pub host_location: String,
    pub host_about: String,
    pub host_is_superhost: bool,
    pub host_listings_count: Option<i64>,
    pub host_has_profile_pic: bool,
    pub host_identity_verified: bool,
    pub neighbourhood_cleansed: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub number_of_reviews: Option<i64>,
    pub review_scores_rating: f64,
    pub review_scores_accuracy: f64,
    pub review_scores_cleanliness: f64,
    pub review_scores_checkin: f64,
    pub review_scores_communication: f64,
    pub review_scores_location: f64,
    pub review_scores_value: f64,
    #[serde(with = "canonical_date")]
    pub first_review: Option<DateTime<Utc>>,
    #[serde(with = "canonical_date")]
    pub last_review: Option<DateTime<Utc>>,
    pub has_availability: bool,
}

mod canonical_date {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::coerce;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(coerce::date(Some(&raw)).into_value())
    }
}

mod canonical_list {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::{coerce, literal};

    pub fn serialize<S: Serializer>(value: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&literal::stringify_strings(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(coerce::string_list(Some(&raw)).into_value())
    }
}
