use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Alert radius, stored in meters like the tier table it comes from.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RadiusMeters(pub f64);

impl RadiusMeters {
    pub fn from_km(km: f64) -> Self {
        Self(km * 1000.0)
    }

    pub fn as_km(self) -> f64 {
        self.0 / 1000.0
    }

    /// Strict comparison in meters: a facility exactly on the radius is outside.
    pub fn covers(self, distance_km: f64) -> bool {
        distance_km * 1000.0 < self.0
    }
}

/// Magnitude band `[min_magnitude, max_magnitude)` mapped to a radius.
/// `max_magnitude: None` marks the open top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiusTier {
    pub min_magnitude: f64,
    pub max_magnitude: Option<f64>,
    pub radius: RadiusMeters,
}

impl RadiusTier {
    pub fn new(min_magnitude: f64, max_magnitude: Option<f64>, radius_km: f64) -> Self {
        Self {
            min_magnitude,
            max_magnitude,
            radius: RadiusMeters::from_km(radius_km),
        }
    }

    pub fn matches(&self, magnitude: f64) -> bool {
        magnitude >= self.min_magnitude
            && self
                .max_magnitude
                .map(|upper| magnitude < upper)
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TierTableError {
    #[error("tier table is empty")]
    Empty,
    #[error("tier {index} has a non-finite bound or radius")]
    NonFinite { index: usize },
    #[error("tier {index} has a non-positive radius")]
    NonPositiveRadius { index: usize },
    #[error("tier {index} has an empty magnitude range")]
    EmptyRange { index: usize },
    #[error("tier {index} is open-ended but is not the last tier")]
    OpenInterior { index: usize },
    #[error("tier {index} does not start where the previous tier ends")]
    Discontinuous { index: usize },
    #[error("the last tier must have an open upper bound")]
    BoundedTop,
}

#[derive(Debug, thiserror::Error)]
pub enum TierLoadError {
    #[error("failed to read tier table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tier table CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TierTableError),
}

/// Contiguous, non-overlapping magnitude bands. At most one band matches any magnitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierTable {
    tiers: Vec<RadiusTier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<RadiusTier>) -> Result<Self, TierTableError> {
        if tiers.is_empty() {
            return Err(TierTableError::Empty);
        }

        tiers.sort_by(|a, b| a.min_magnitude.total_cmp(&b.min_magnitude));
        let last = tiers.len() - 1;

        for (index, tier) in tiers.iter().enumerate() {
            let bounds_finite = tier.min_magnitude.is_finite()
                && tier.max_magnitude.map(f64::is_finite).unwrap_or(true);
            if !bounds_finite || !tier.radius.0.is_finite() {
                return Err(TierTableError::NonFinite { index });
            }
            if tier.radius.0 <= 0.0 {
                return Err(TierTableError::NonPositiveRadius { index });
            }

            match tier.max_magnitude {
                Some(upper) if upper <= tier.min_magnitude => {
                    return Err(TierTableError::EmptyRange { index });
                }
                Some(_) if index == last => return Err(TierTableError::BoundedTop),
                None if index != last => return Err(TierTableError::OpenInterior { index }),
                _ => {}
            }

            if index > 0 && tiers[index - 1].max_magnitude != Some(tier.min_magnitude) {
                return Err(TierTableError::Discontinuous { index });
            }
        }

        Ok(Self { tiers })
    }

    /// Radius bands used by the facility alert program since it was first deployed.
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                RadiusTier::new(3.95, Some(4.95), 71.0),
                RadiusTier::new(4.95, Some(5.95), 118.0),
                RadiusTier::new(5.95, Some(6.95), 221.0),
                RadiusTier::new(6.95, Some(7.95), 420.0),
                RadiusTier::new(7.95, None, 750.0),
            ],
        }
    }

    /// Reads `min_magnitude,max_magnitude,radius_km` rows; an empty max marks the open tier.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TierLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut tiers = Vec::new();
        for row in csv_reader.deserialize::<TierRow>() {
            let row = row?;
            tiers.push(RadiusTier::new(
                row.min_magnitude,
                row.max_magnitude,
                row.radius_km,
            ));
        }

        Ok(Self::new(tiers)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TierLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn tiers(&self) -> &[RadiusTier] {
        &self.tiers
    }

    pub fn tier_for(&self, magnitude: Option<f64>) -> Option<&RadiusTier> {
        let magnitude = magnitude.filter(|value| !value.is_nan())?;
        self.tiers.iter().find(|tier| tier.matches(magnitude))
    }

    /// `None` means "no alert": magnitude missing or below the lowest band.
    pub fn radius_for(&self, magnitude: Option<f64>) -> Option<RadiusMeters> {
        self.tier_for(magnitude).map(|tier| tier.radius)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
struct TierRow {
    min_magnitude: f64,
    #[serde(default)]
    max_magnitude: Option<f64>,
    radius_km: f64,
}
