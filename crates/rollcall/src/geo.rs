//! Geolocation resolver.
//!
//! Participant locations are stored as free text. These functions turn that
//! text into validated coordinates on demand and compute the region a map
//! needs to show all of them. Nothing here touches registry state.

use serde::{Deserialize, Serialize};

use crate::participant::Participant;

/// Padding applied around a box whose points all coincide, in degrees.
pub const DEFAULT_PADDING_DEGREES: f64 = 0.01;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate if both values are finite and in range.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// The rectangle enclosing a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South-west corner: minimum latitude and longitude.
    pub min: Coordinate,
    /// North-east corner: maximum latitude and longitude.
    pub max: Coordinate,
}

impl BoundingBox {
    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate {
            lat: (self.min.lat + self.max.lat) / 2.0,
            lng: (self.min.lng + self.max.lng) / 2.0,
        }
    }

    /// Whether `point` lies inside the box or on its edge.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min.lat..=self.max.lat).contains(&point.lat)
            && (self.min.lng..=self.max.lng).contains(&point.lng)
    }

    /// Whether the box has non-zero extent on both axes.
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.max.lat > self.min.lat && self.max.lng > self.min.lng
    }
}

/// Parse a free-text `"lat,lng"` location.
///
/// The text is split on commas, or on whitespace when it has no comma, and
/// the first two non-empty tokens are read as latitude and longitude. Any
/// text that does not yield an in-range pair gives `None`.
#[must_use]
pub fn parse_location(raw: Option<&str>) -> Option<Coordinate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = if raw.contains(',') {
        raw.split(',').collect()
    } else {
        raw.split_whitespace().collect()
    };
    let mut numbers = tokens.into_iter().map(str::trim).filter(|t| !t.is_empty());

    let lat = numbers.next()?.parse::<f64>().ok()?;
    let lng = numbers.next()?.parse::<f64>().ok()?;
    Coordinate::new(lat, lng)
}

/// Compute the box enclosing `coordinates`, with the default padding.
#[must_use]
pub fn compute_bounds(coordinates: &[Coordinate]) -> Option<BoundingBox> {
    compute_bounds_with_padding(coordinates, DEFAULT_PADDING_DEGREES)
}

/// Compute the box enclosing `coordinates`.
///
/// Returns `None` for an empty slice. When every point coincides the box is
/// grown by `padding` degrees on each side so it has a visible extent,
/// clamped to the valid latitude and longitude ranges.
#[must_use]
pub fn compute_bounds_with_padding(
    coordinates: &[Coordinate],
    padding: f64,
) -> Option<BoundingBox> {
    let (first, rest) = coordinates.split_first()?;

    let mut min = *first;
    let mut max = *first;
    for c in rest {
        min.lat = min.lat.min(c.lat);
        min.lng = min.lng.min(c.lng);
        max.lat = max.lat.max(c.lat);
        max.lng = max.lng.max(c.lng);
    }

    #[allow(clippy::float_cmp)]
    let degenerate = min.lat == max.lat && min.lng == max.lng;
    if degenerate {
        min.lat = (min.lat - padding).max(-90.0);
        min.lng = (min.lng - padding).max(-180.0);
        max.lat = (max.lat + padding).min(90.0);
        max.lng = (max.lng + padding).min(180.0);
    }

    Some(BoundingBox { min, max })
}

/// Participants whose location parses, paired with their coordinate.
#[must_use]
pub fn locate(participants: &[Participant]) -> Vec<(u64, Coordinate)> {
    participants
        .iter()
        .filter_map(|p| parse_location(p.location.as_deref()).map(|c| (p.id, c)))
        .collect()
}
