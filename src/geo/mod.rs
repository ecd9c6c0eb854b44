//! Geographic binning of postings onto reference cities
//!
//! Distances are planar Euclidean over (latitude, longitude) degrees. This is
//! a coarse bucketing rule, not a geodesic distance.

mod cities;

pub use cities::*;

use crate::meta::JobPosting;
use serde::{Deserialize, Serialize};

/// A reference city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCity {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NamedCity {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Planar distance to a coordinate, in degrees
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        (self.latitude - latitude).hypot(self.longitude - longitude)
    }
}

/// Nearest city strictly closer than `max_distance`
///
/// Ties go to the first city in iteration order.
pub fn nearest_city<'a>(
    latitude: f64,
    longitude: f64,
    cities: &'a [NamedCity],
    max_distance: f64,
) -> Option<&'a NamedCity> {
    let mut best: Option<(&NamedCity, f64)> = None;

    for city in cities {
        let distance = city.distance_to(latitude, longitude);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((city, distance)),
        }
    }

    best.filter(|(_, distance)| *distance < max_distance)
        .map(|(city, _)| city)
}

/// City bucket for a posting, if it has coordinates near a reference city
pub fn bin_posting<'a>(
    posting: &JobPosting,
    cities: &'a CityList,
    max_distance: f64,
) -> Option<&'a NamedCity> {
    let (latitude, longitude) = posting.coordinates()?;
    nearest_city(latitude, longitude, cities.as_slice(), max_distance)
}
