//! Geospatial query and result types for the near-query streaming path.
//!
//! These types only describe coordinates and distances; computing distances
//! is the data-store collaborator's job.

use serde::{Deserialize, Serialize};

use crate::query::Filter;

/// WGS84 coordinate, longitude before latitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPoint {
    /// Builds a point from longitude and latitude in degrees.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Unit in which a distance is denominated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    /// SI meters.
    Meters,
    /// Kilometers.
    Kilometers,
    /// Statute miles.
    Miles,
}

impl Metric {
    /// Meters per one unit of this metric.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Metric::Meters => 1.0,
            Metric::Kilometers => 1000.0,
            Metric::Miles => 1609.344,
        }
    }
}

/// A distance value paired with its metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Distance {
    /// Magnitude, denominated in `metric`.
    pub value: f64,
    /// Unit of `value`.
    pub metric: Metric,
}

impl Distance {
    /// Builds a distance directly in the given metric.
    pub fn new(value: f64, metric: Metric) -> Self {
        Self { value, metric }
    }

    /// Converts a meter-denominated distance into the given metric.
    pub fn from_meters(meters: f64, metric: Metric) -> Self {
        Self {
            value: meters / metric.meters_per_unit(),
            metric,
        }
    }

    /// This distance expressed in meters.
    pub fn in_meters(&self) -> f64 {
        self.value * self.metric.meters_per_unit()
    }
}

/// Descriptor for a distance-ordered query around a reference point.
///
/// Unlike [`Query`](crate::query::Query), a near query carries no skip, limit,
/// or sort: results are implicitly ordered by ascending distance and
/// pagination on this path is unsupported.
#[derive(Clone, Debug)]
pub struct NearQuery {
    center: GeoPoint,
    max_distance: Distance,
    filter: Option<Filter>,
}

impl NearQuery {
    /// Builds a near query around `center`, bounded by `max_distance`.
    ///
    /// The metric of `max_distance` is also the metric in which result
    /// distances are reported.
    pub fn new(center: GeoPoint, max_distance: Distance) -> Self {
        Self {
            center,
            max_distance,
            filter: None,
        }
    }

    /// Restricts candidates to records matching `filter`.
    pub fn filtered(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Reference point of the query.
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Maximum distance a candidate may be from the reference point.
    pub fn max_distance(&self) -> Distance {
        self.max_distance
    }

    /// Metric in which result distances are reported.
    pub fn metric(&self) -> Metric {
        self.max_distance.metric
    }

    /// Optional candidate filter.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}
