//! Great-circle distance and proximity filtering.
//!
//! [`distance_m`] is the single source of truth for geographic distance
//! in the platform: a pure haversine on a spherical Earth. On top of it,
//! [`within_radius`] answers "what is near me, closest first" and
//! [`annotate`] attaches distances to an already-ordered result set
//! without reordering it.
//!
//! Coordinate range validation happens at the API boundary; out-of-domain
//! inputs here propagate as `NaN` rather than errors, and `NaN` distances
//! never satisfy a radius cut.

use chrono::{DateTime, Utc};
use serde::Serialize;

use groundwatch_types::{CrowdReport, SosRequest};

/// Earth's mean radius in meters (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default search radius in meters for nearby queries.
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 1000.0;

/// Compute the haversine great-circle distance between two coordinates.
///
/// Inputs are degrees; the result is meters. Pure and deterministic,
/// symmetric in its arguments, and zero for identical points.
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1r = lat1.to_radians();
    let lat2r = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1r.cos() * lat2r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// A query origin: the client's position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Point {
    /// Build a point from a latitude/longitude pair.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Distance in meters from this point to a record's position.
    pub fn distance_to<R: Locatable>(self, record: &R) -> f64 {
        distance_m(
            self.latitude,
            self.longitude,
            record.latitude(),
            record.longitude(),
        )
    }
}

/// A record that sits at a fixed position and carries a creation time.
///
/// The creation time breaks distance ties in proximity queries: of two
/// records at the same distance, the more recent one sorts first.
pub trait Locatable {
    /// Latitude in degrees.
    fn latitude(&self) -> f64;
    /// Longitude in degrees.
    fn longitude(&self) -> f64;
    /// When the record was created (UTC).
    fn created_at(&self) -> DateTime<Utc>;
}

impl Locatable for CrowdReport {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Locatable for SosRequest {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A record annotated with its distance from a query origin, in meters.
///
/// Serializes as the record's own fields plus a `distance` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located<R> {
    /// The underlying record, flattened on the wire.
    #[serde(flatten)]
    pub record: R,
    /// Meters from the query origin.
    pub distance: f64,
}

/// Retain records within `radius_m` of `origin`, sorted nearest first.
///
/// Ties on distance are broken by creation time, most recent first. Total
/// over any input, including empty; records whose distance computes to
/// `NaN` are dropped (a `NaN` comparison never satisfies `<=`).
pub fn within_radius<R: Locatable>(
    origin: Point,
    radius_m: f64,
    records: Vec<R>,
) -> Vec<Located<R>> {
    let mut hits: Vec<Located<R>> = records
        .into_iter()
        .map(|record| Located {
            distance: origin.distance_to(&record),
            record,
        })
        .filter(|hit| hit.distance <= radius_m)
        .collect();

    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| b.record.created_at().cmp(&a.record.created_at()))
    });
    hits
}

/// Attach a distance from `origin` to every record, preserving the input
/// order exactly.
///
/// Used when the client supplies a position but no radius: the caller's
/// ordering (newest first, for list queries) stays intact.
pub fn annotate<R: Locatable>(origin: Point, records: Vec<R>) -> Vec<Located<R>> {
    records
        .into_iter()
        .map(|record| Located {
            distance: origin.distance_to(&record),
            record,
        })
        .collect()
}
