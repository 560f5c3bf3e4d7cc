//! Record cleaning: raw export rows to canonical records.
//!
//! Each retained column runs through its designated coercer independently. Defaulted values
//! are counted per column. A record whose price or flag cannot be coerced is left out of the
//! output and reported in [`CleanReport::rejected`]; the rest of the batch carries on. A missing
//! id is only counted: the document then goes to the store without a key of its own.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::coerce::{self, Coerced};
use crate::error::{CoerceError, RecordRejection};
use crate::record::{CanonicalRecord, RawRecord, RAW_COLUMNS};

/// Floor and fallback for `bedrooms` and `beds`: a listing has at least one.
pub const MIN_ROOM_COUNT: f64 = 1.0;
/// Fallback for review scores and bathrooms.
pub const DEFAULT_SCORE: f64 = 0.0;

/// Summary of one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub attempted: usize,
    pub cleaned: usize,
    pub rejected: Vec<RecordRejection>,
    /// Number of records in which each column fell back to its default.
    pub defaulted: BTreeMap<&'static str, usize>,
}

/// Canonical records in input order, plus the report for the pass.
#[derive(Debug, Clone, Default)]
pub struct CleanOutput {
    pub records: Vec<CanonicalRecord>,
    pub report: CleanReport,
}

/// Cleans `raw` one-to-one, preserving order, minus rejected records.
pub fn clean_records(raw: Vec<RawRecord>) -> CleanOutput {
    let mut output = CleanOutput::default();
    output.report.attempted = raw.len();
    info!(records = raw.len(), "[CLEAN] Starting record cleaning");

    for (index, record) in raw.into_iter().enumerate() {
        let row = index + 1;
        let (record, dropped) = record.select(&RAW_COLUMNS);
        if dropped > 0 {
            debug!(row, dropped, "[CLEAN] Dropped columns outside the allow-list");
        }
        match clean_record(&record) {
            Ok((canonical, defaulted)) => {
                for field in defaulted {
                    *output.report.defaulted.entry(field).or_default() += 1;
                }
                output.records.push(canonical);
            }
            Err((field, error)) => {
                let rejection = RecordRejection {
                    row,
                    id: record.get("id").map(str::to_owned),
                    field,
                    error,
                };
                warn!(row, id = ?rejection.id, field, error = %rejection.error, "[CLEAN] Record rejected");
                output.report.rejected.push(rejection);
            }
        }
    }

    output.report.cleaned = output.records.len();
    info!(
        attempted = output.report.attempted,
        cleaned = output.report.cleaned,
        rejected = output.report.rejected.len(),
        "[CLEAN] Record cleaning complete"
    );
    for (field, count) in &output.report.defaulted {
        info!(field, count, "[CLEAN] Column defaulted");
    }
    output
}

/// Collects the names of columns that fell back to their default while a record is cleaned.
#[derive(Default)]
struct Defaults(Vec<&'static str>);

impl Defaults {
    fn take<T>(&mut self, field: &'static str, value: Coerced<T>) -> T {
        if value.is_defaulted() {
            self.0.push(field);
        }
        value.into_value()
    }
}

/// Cleans a single record, returning the canonical record and the columns that were defaulted,
/// or the column and reason that rejected it.
pub fn clean_record(
    raw: &RawRecord,
) -> Result<(CanonicalRecord, Vec<&'static str>), (&'static str, CoerceError)> {
    let mut d = Defaults::default();

    let price = coerce::currency(raw.get("price")).map_err(|e| ("price", e))?;
    let instant_bookable = flag(&mut d, raw, "instant_bookable")?;
    let host_is_superhost = flag(&mut d, raw, "host_is_superhost")?;
    let host_has_profile_pic = flag(&mut d, raw, "host_has_profile_pic")?;
    let host_identity_verified = flag(&mut d, raw, "host_identity_verified")?;
    let has_availability = flag(&mut d, raw, "has_availability")?;

    let record = CanonicalRecord {
        id: d.take("id", coerce::optional_integer(raw.get("id"))),
        listing_url: coerce::optional_text(raw.get("listing_url")),
        last_scraped: d.take("last_scraped", coerce::date(raw.get("last_scraped"))),
        name: coerce::optional_text(raw.get("name")),
        description: d.take("description", coerce::text_or_empty(raw.get("description"))),
        property_type: coerce::optional_text(raw.get("property_type")),
        room_type: coerce::optional_text(raw.get("room_type")),
        accommodates: d.take("accommodates", coerce::optional_integer(raw.get("accommodates"))),
        bathrooms: d.take("bathrooms_text", coerce::bathrooms(raw.get("bathrooms_text"))),
        bedrooms: d.take(
            "bedrooms",
            coerce::number_at_least(raw.get("bedrooms"), MIN_ROOM_COUNT),
        ),
        beds: d.take("beds", coerce::number_at_least(raw.get("beds"), MIN_ROOM_COUNT)),
        amenities: d.take("amenities", coerce::string_list(raw.get("amenities"))),
        price,
        minimum_nights: d.take(
            "minimum_nights",
            coerce::optional_integer(raw.get("minimum_nights")),
        ),
        maximum_nights: d.take(
            "maximum_nights",
            coerce::optional_integer(raw.get("maximum_nights")),
        ),
        instant_bookable,
        host_id: d.take("host_id", coerce::optional_integer(raw.get("host_id"))),
        host_name: coerce::optional_text(raw.get("host_name")),
        host_since: d.take("host_since", coerce::date(raw.get("host_since"))),
        host_location: d.take("host_location", coerce::text_or_empty(raw.get("host_location"))),
        host_about: d.take("host_about", coerce::text_or_empty(raw.get("host_about"))),
        host_is_superhost,
        host_listings_count: d.take(
            "host_listings_count",
            coerce::optional_integer(raw.get("host_listings_count")),
        ),
        host_has_profile_pic,
        host_identity_verified,
        neighbourhood_cleansed: coerce::optional_text(raw.get("neighbourhood_cleansed")),
        latitude: d.take("latitude", coerce::optional_number(raw.get("latitude"))),
        longitude: d.take("longitude", coerce::optional_number(raw.get("longitude"))),
        number_of_reviews: d.take(
            "number_of_reviews",
            coerce::optional_integer(raw.get("number_of_reviews")),
        ),
        review_scores_rating: score(&mut d, raw, "review_scores_rating"),
        review_scores_accuracy: score(&mut d, raw, "review_scores_accuracy"),
        review_scores_cleanliness: score(&mut d, raw, "review_scores_cleanliness"),
        review_scores_checkin: score(&mut d, raw, "review_scores_checkin"),
        review_scores_communication: score(&mut d, raw, "review_scores_communication"),
        review_scores_location: score(&mut d, raw, "review_scores_location"),
        review_scores_value: score(&mut d, raw, "review_scores_value"),
        first_review: d.take("first_review", coerce::date(raw.get("first_review"))),
        last_review: d.take("last_review", coerce::date(raw.get("last_review"))),
        has_availability,
    };

    Ok((record, d.0))
}

fn score(d: &mut Defaults, raw: &RawRecord, field: &'static str) -> f64 {
    d.take(field, coerce::number_or(raw.get(field), DEFAULT_SCORE))
}

fn flag(
    d: &mut Defaults,
    raw: &RawRecord,
    field: &'static str,
) -> Result<bool, (&'static str, CoerceError)> {
    let value = coerce::flag(raw.get(field)).map_err(|e| (field, e))?;
    Ok(d.take(field, value))
}
