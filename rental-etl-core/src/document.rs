//! Nested listing documents, as stored in the document sink.
//!
//! [`to_document`] is pure and deterministic: one canonical record in, one document out.
//! Every string on the way passes through [`sanitize`].

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::CanonicalRecord;

/// Re-encodes `input` as UTF-8, replacing invalid byte sequences with U+FFFD.
///
/// Total and idempotent: valid UTF-8 comes back unchanged, so sanitising twice is the same as
/// sanitising once.
pub fn sanitize(input: impl AsRef<[u8]>) -> String {
    match String::from_utf8_lossy(input.as_ref()) {
        Cow::Borrowed(s) => s.to_owned(),
        Cow::Owned(s) => s,
    }
}

fn sanitize_opt(input: Option<&String>) -> Option<String> {
    input.map(sanitize)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDocument {
    /// Absent when the source row had no usable id; the store then assigns the key.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub listing_url: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub description: String,
    pub property_type: Option<String>,
    pub room_type: Option<String>,
    pub accommodates: Option<i64>,
    pub bathrooms: f64,
    pub bedrooms: f64,
    pub beds: f64,
    pub amenities: Vec<String>,
    pub price: f64,
    pub minimum_nights: Option<i64>,
    pub maximum_nights: Option<i64>,
    pub instant_bookable: bool,
    pub host: Host,
    pub location: Location,
    pub reviews: Reviews,
    pub availability: Availability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub location: String,
    pub about: String,
    pub is_superhost: bool,
    pub listings_count: Option<i64>,
    pub has_profile_pic: bool,
    pub is_identity_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub neighbourhood_cleansed: Option<String>,
    /// `None` when either coordinate is missing.
    pub coordinates: Option<GeoPoint>,
}

/// A GeoJSON point. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_owned(),
            coordinates: [longitude, latitude],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviews {
    pub number_of_reviews: Option<i64>,
    pub first_review: Option<DateTime<Utc>>,
    pub last_review: Option<DateTime<Utc>>,
    pub scores: ReviewScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScores {
    pub rating: f64,
    pub accuracy: f64,
    pub cleanliness: f64,
    pub checkin: f64,
    pub communication: f64,
    pub location: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub has_availability: bool,
}

/// Projects a canonical record into its nested document.
pub fn to_document(record: &CanonicalRecord) -> ListingDocument {
    let coordinates = match (record.longitude, record.latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
        _ => None,
    };

    ListingDocument {
        id: record.id,
        listing_url: sanitize_opt(record.listing_url.as_ref()),
        scraped_at: record.last_scraped,
        name: sanitize_opt(record.name.as_ref()),
        description: sanitize(&record.description),
        property_type: sanitize_opt(record.property_type.as_ref()),
        room_type: sanitize_opt(record.room_type.as_ref()),
        accommodates: record.accommodates,
        bathrooms: record.bathrooms,
        bedrooms: record.bedrooms,
        beds: record.beds,
        amenities: record.amenities.iter().map(sanitize).collect(),
        price: record.price,
        minimum_nights: record.minimum_nights,
        maximum_nights: record.maximum_nights,
        instant_bookable: record.instant_bookable,
        host: Host {
            id: record.host_id,
            name: sanitize_opt(record.host_name.as_ref()),
            since: record.host_since,
            location: sanitize(&record.host_location),
            about: sanitize(&record.host_about),
            is_superhost: record.host_is_superhost,
            listings_count: record.host_listings_count,
            has_profile_pic: record.host_has_profile_pic,
            is_identity_verified: record.host_identity_verified,
        },
        location: Location {
            neighbourhood_cleansed: sanitize_opt(record.neighbourhood_cleansed.as_ref()),
            coordinates,
        },
        reviews: Reviews {
            number_of_reviews: record.number_of_reviews,
            first_review: record.first_review,
            last_review: record.last_review,
            scores: ReviewScores {
                rating: record.review_scores_rating,
                accuracy: record.review_scores_accuracy,
                cleanliness: record.review_scores_cleanliness,
                checkin: record.review_scores_checkin,
                communication: record.review_scores_communication,
                location: record.review_scores_location,
                value: record.review_scores_value,
            },
        },
        availability: Availability {
            has_availability: record.has_availability,
        },
    }
}

/// Maps a batch in order.
pub fn to_documents(records: &[CanonicalRecord]) -> Vec<ListingDocument> {
    records.iter().map(to_document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_bytes() {
        let out = sanitize(b"caf\xe9 \xff ok");
        assert_eq!(out, "caf\u{FFFD} \u{FFFD} ok");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs: [&[u8]; 4] = [b"", b"plain", "Montmartre \u{2013} vue".as_bytes(), b"\xc3\x28\xa0\xa1"];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn geo_point_is_longitude_first() {
        let point = GeoPoint::new(2.35, 48.85);
        assert_eq!(point.coordinates, [2.35, 48.85]);
        assert_eq!(point.kind, "Point");
    }
}
