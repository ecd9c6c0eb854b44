//! Reference city list

use super::NamedCity;
use crate::config::GeoConfig;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

/// Built-in reference cities (name, latitude, longitude)
const BUILTIN_CITIES: &[(&str, f64, f64)] = &[
    ("Atlanta, GA", 33.749, -84.388),
    ("Austin, TX", 30.267, -97.743),
    ("Boston, MA", 42.360, -71.059),
    ("Chicago, IL", 41.878, -87.630),
    ("Dallas, TX", 32.777, -96.797),
    ("Denver, CO", 39.739, -104.990),
    ("Houston, TX", 29.760, -95.370),
    ("Los Angeles, CA", 34.052, -118.244),
    ("Miami, FL", 25.762, -80.192),
    ("Minneapolis, MN", 44.978, -93.265),
    ("New York, NY", 40.713, -74.006),
    ("Philadelphia, PA", 39.953, -75.165),
    ("Phoenix, AZ", 33.448, -112.074),
    ("Pittsburgh, PA", 40.441, -79.996),
    ("Portland, OR", 45.505, -122.675),
    ("Raleigh, NC", 35.780, -78.639),
    ("San Diego, CA", 32.716, -117.161),
    ("San Francisco, CA", 37.775, -122.419),
    ("San Jose, CA", 37.339, -121.895),
    ("Seattle, WA", 47.606, -122.332),
    ("Washington, DC", 38.907, -77.037),
];

/// Reference cities, always sorted by name so nearest-city ties are reproducible
#[derive(Debug, Clone, Default)]
pub struct CityList {
    cities: Vec<NamedCity>,
}

impl CityList {
    pub fn new(mut cities: Vec<NamedCity>) -> Self {
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        cities.dedup_by(|a, b| a.name == b.name);
        Self { cities }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_CITIES
                .iter()
                .map(|(name, lat, lon)| NamedCity::new(*name, *lat, *lon))
                .collect(),
        )
    }

    /// Load cities from a JSON array of `{name, latitude, longitude}`
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading reference cities from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let cities: Vec<NamedCity> = serde_json::from_str(&content)?;

        if cities.is_empty() {
            return Err(Error::Config(format!(
                "City list is empty: {}",
                path.display()
            )));
        }

        Ok(Self::new(cities))
    }

    /// Cities configured for this run
    pub fn load(config: &GeoConfig) -> Result<Self> {
        let list = match &config.cities_file {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin(),
        };
        info!("Loaded {} reference cities", list.len());
        Ok(list)
    }

    pub fn as_slice(&self) -> &[NamedCity] {
        &self.cities
    }

    pub fn names(&self) -> Vec<String> {
        self.cities.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_is_sorted_by_name() {
        let list = CityList::new(vec![
            NamedCity::new("Seattle", 47.6, -122.3),
            NamedCity::new("Austin", 30.3, -97.7),
            NamedCity::new("Boston", 42.4, -71.1),
        ]);
        assert_eq!(list.names(), vec!["Austin", "Boston", "Seattle"]);
    }

    #[test]
    fn test_builtin_list() {
        let list = CityList::builtin();
        assert_eq!(list.len(), BUILTIN_CITIES.len());
        assert!(list.names().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cities.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Portland", "latitude": 45.5, "longitude": -122.7},
                {"name": "Denver", "latitude": 39.7, "longitude": -105.0}
            ]"#,
        )
        .unwrap();

        let config = GeoConfig {
            cities_file: Some(path),
            ..GeoConfig::default()
        };
        let list = CityList::load(&config).unwrap();
        assert_eq!(list.names(), vec!["Denver", "Portland"]);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cities.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(CityList::from_file(&path).is_err());
    }
}
