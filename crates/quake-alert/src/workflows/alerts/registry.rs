use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{Coordinates, Facility};
use super::geodesy::{self, GeodesyError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read facility list: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid facility CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("facility list is empty")]
    Empty,
    #[error("facility name must not be blank")]
    BlankName,
    #[error("facility '{0}' is listed more than once")]
    DuplicateName(String),
    #[error("facility '{name}' has invalid coordinates: {source}")]
    InvalidLocation {
        name: String,
        #[source]
        source: GeodesyError,
    },
}

/// Fixed set of monitored facilities, keyed by name. Immutable once built.
#[derive(Debug, Clone)]
pub struct FacilityRegistry {
    facilities: Vec<Facility>,
}

impl FacilityRegistry {
    pub fn new(facilities: Vec<Facility>) -> Result<Self, RegistryError> {
        if facilities.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for facility in &facilities {
            if facility.name.trim().is_empty() {
                return Err(RegistryError::BlankName);
            }
            if !seen.insert(facility.name.as_str()) {
                return Err(RegistryError::DuplicateName(facility.name.clone()));
            }
            geodesy::validate(facility.location).map_err(|source| {
                RegistryError::InvalidLocation {
                    name: facility.name.clone(),
                    source,
                }
            })?;
        }

        Ok(Self { facilities })
    }

    /// Placeholder sites shipped with the monitor until a deployment supplies its own list.
    pub fn example() -> Self {
        Self {
            facilities: vec![
                Facility::new("Example Facility 1", 37.12345, -121.12345),
                Facility::new("Example Facility 2", 37.0123, -121.0123),
                Facility::new("Example Facility 3", 36.98765, -120.98765),
            ],
        }
    }

    /// Reads `name,latitude,longitude` rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegistryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut facilities = Vec::new();
        for row in csv_reader.deserialize::<FacilityRow>() {
            let row = row?;
            facilities.push(Facility {
                name: row.name,
                location: Coordinates::new(row.latitude, row.longitude),
            });
        }

        Self::new(facilities)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn all(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn get(&self, name: &str) -> Option<&Facility> {
        self.facilities.iter().find(|facility| facility.name == name)
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct FacilityRow {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn example_registry_is_valid() {
        let registry = FacilityRegistry::example();
        let rebuilt = FacilityRegistry::new(registry.all().to_vec()).expect("valid");
        assert_eq!(rebuilt.len(), 3);
        assert!(rebuilt.get("Example Facility 2").is_some());
    }

    #[test]
    fn csv_loader_reads_named_rows() {
        let csv = "name,latitude,longitude\n\
Oroville Dam, 39.5388, -121.4850\n\
San Luis Dam,37.0586,-121.0747\n";
        let registry = FacilityRegistry::from_reader(Cursor::new(csv)).expect("loads");
        assert_eq!(registry.len(), 2);
        let oroville = registry.get("Oroville Dam").expect("present");
        assert_eq!(oroville.location, Coordinates::new(39.5388, -121.4850));
    }

    #[test]
    fn rejects_duplicates_and_bad_locations() {
        let duplicate = vec![
            Facility::new("Dam", 37.0, -121.0),
            Facility::new("Dam", 38.0, -122.0),
        ];
        match FacilityRegistry::new(duplicate) {
            Err(RegistryError::DuplicateName(name)) => assert_eq!(name, "Dam"),
            other => panic!("expected duplicate error, got {other:?}"),
        }

        let out_of_range = vec![Facility::new("Nowhere", 95.0, 0.0)];
        match FacilityRegistry::new(out_of_range) {
            Err(RegistryError::InvalidLocation { name, .. }) => assert_eq!(name, "Nowhere"),
            other => panic!("expected location error, got {other:?}"),
        }

        assert!(matches!(
            FacilityRegistry::new(Vec::new()),
            Err(RegistryError::Empty)
        ));
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match FacilityRegistry::from_path("./does-not-exist.csv") {
            Err(RegistryError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
