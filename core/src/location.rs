use crate::{
    config::{ClimateMultiplier, GeographyConfig},
    types::Climate,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub climate: Climate,
    pub population: u64,
    /// Population share of the total.
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct Geography {
    pub locations: Vec<Location>,
    climate_multipliers: BTreeMap<Climate, ClimateMultiplier>,
}

impl Geography {
    pub fn from_config(config: &GeographyConfig) -> Self {
        let total: u64 = config.locations.iter().map(|l| l.population).sum();
        let locations = config
            .locations
            .iter()
            .map(|l| Location {
                name: l.name.clone(),
                climate: l.climate,
                population: l.population,
                weight: if total > 0 { l.population as f64 / total as f64 } else { 0.0 },
            })
            .collect();
        Self {
            locations,
            climate_multipliers: config.climate_multipliers.clone(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Location> {
        self.locations.get(index)
    }

    /// Index of the most populous location; ties go to the earliest entry.
    pub fn most_populous(&self) -> Option<usize> {
        self.locations
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, u64)>, (i, l)| match best {
                Some((_, pop)) if pop >= l.population => best,
                _ => Some((i, l.population)),
            })
            .map(|(i, _)| i)
    }

    /// Seasonal-item multipliers for a location. Unknown location or
    /// climate reads as temperate.
    pub fn climate_multiplier(&self, location: Option<&Location>) -> ClimateMultiplier {
        let climate = location.map_or(Climate::Temperate, |l| l.climate);
        self.climate_multipliers
            .get(&climate)
            .or_else(|| self.climate_multipliers.get(&Climate::Temperate))
            .copied()
            .unwrap_or_default()
    }
}
