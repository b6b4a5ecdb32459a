use crate::{
    error::{SynthError, SynthResult},
    sales::SalesTargets,
    sampler::WeightTable,
    types::{AgeGroup, Climate, Gender, Season, Size},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Calendar ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    pub month: u32,
    pub day: u32,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialPeriodConfig {
    pub name: String,
    /// (month, day), inclusive.
    pub start: (u32, u32),
    /// (month, day), inclusive.
    pub end: (u32, u32),
    /// Key into the sales-derived special-day factors.
    pub factor: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EndBoost {
    pub within_days: u32,
    pub factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub season_months: BTreeMap<Season, Vec<u32>>,
    pub holidays: Vec<HolidayConfig>,
    pub special_periods: Vec<SpecialPeriodConfig>,
    pub end_boost: EndBoost,
}

// ── Catalog ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTag {
    Summer,
    Winter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeasonalWeights {
    pub winter: f64,
    pub spring: f64,
    pub summer: f64,
    pub fall: f64,
}

impl SeasonalWeights {
    pub fn get(&self, season: Season) -> f64 {
        match season {
            Season::Winter => self.winter,
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Fall => self.fall,
        }
    }

    pub fn to_table(&self) -> WeightTable<Season> {
        Season::ALL.iter().map(|s| (*s, self.get(*s))).collect()
    }
}

fn default_popularity() -> f64 {
    0.5
}

/// One purchasable item with its demographic and seasonal affinities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemProfile {
    pub name: String,
    #[serde(default)]
    pub tag: Option<ItemTag>,
    #[serde(default = "default_popularity")]
    pub popularity: f64,
    pub seasons: SeasonalWeights,
    #[serde(default)]
    pub gender: BTreeMap<Gender, f64>,
    #[serde(default)]
    pub age: BTreeMap<AgeGroup, f64>,
    #[serde(default)]
    pub price: Option<PriceStats>,
}

impl ItemProfile {
    /// Missing gender keys count as 0.5.
    pub fn gender_factor(&self, gender: Gender) -> f64 {
        self.gender.get(&gender).copied().unwrap_or(0.5)
    }

    /// Missing age keys count as 0.25.
    pub fn age_factor(&self, age: AgeGroup) -> f64 {
        self.age.get(&age).copied().unwrap_or(0.25)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub items: Vec<ItemProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemographicCategoryWeights {
    pub gender: BTreeMap<Gender, WeightTable<String>>,
    pub age: BTreeMap<AgeGroup, WeightTable<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub categories: Vec<CategoryConfig>,
    pub category_weights: DemographicCategoryWeights,
    pub season_category_weights: BTreeMap<Season, WeightTable<String>>,
    pub season_colors: BTreeMap<Season, WeightTable<String>>,
    pub sizes: BTreeMap<Gender, WeightTable<Size>>,
    pub shipping: WeightTable<String>,
    pub payment: WeightTable<String>,
    pub price_bands: Vec<PriceBand>,
    pub default_price: PriceStats,
    pub season_price_multipliers: BTreeMap<Season, f64>,
}

impl CatalogConfig {
    pub fn category(&self, name: &str) -> SynthResult<&CategoryConfig> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SynthError::UnknownCategory { name: name.to_string() })
    }
}

// ── Geography ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub climate: Climate,
    pub population: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClimateMultiplier {
    pub summer_items: f64,
    pub winter_items: f64,
}

impl Default for ClimateMultiplier {
    fn default() -> Self {
        Self { summer_items: 1.0, winter_items: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyConfig {
    pub locations: Vec<LocationConfig>,
    pub climate_multipliers: BTreeMap<Climate, ClimateMultiplier>,
}

// ── Generation knobs ────────────────────────────────────────────────

/// Season preference tables for the four shopper archetypes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeTables {
    pub winter_lover: WeightTable<Season>,
    pub summer_lover: WeightTable<Season>,
    pub spring_lover: WeightTable<Season>,
    pub neutral: WeightTable<Season>,
}

impl ArchetypeTables {
    /// Quartile pick on a single uniform roll.
    pub fn for_roll(&self, roll: f64) -> &WeightTable<Season> {
        if roll < 0.25 {
            &self.winter_lover
        } else if roll < 0.5 {
            &self.summer_lover
        } else if roll < 0.75 {
            &self.spring_lover
        } else {
            &self.neutral
        }
    }

    pub fn all(&self) -> [&WeightTable<Season>; 4] {
        [&self.winter_lover, &self.summer_lover, &self.spring_lover, &self.neutral]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LastPurchaseConfig {
    pub year_2022_ratio: f64,
    pub year_2023_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PromoConfig {
    pub subscriber_ratio: f64,
    pub non_subscriber_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovidConfig {
    pub year: i32,
    pub reduce_ratio: f64,
    pub reduce_range: (f64, f64),
    pub online_ratio: f64,
    pub online_increase_range: (f64, f64),
    pub online_shipping: WeightTable<String>,
    pub online_payment: WeightTable<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RedistributionConfig {
    pub max_moved: usize,
    pub late_day_threshold: u32,
    pub early_day_weight: f64,
    pub late_day_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub seed: u64,
    pub archetypes: ArchetypeTables,
    pub last_purchase: LastPurchaseConfig,
    pub promo: PromoConfig,
    pub covid: CovidConfig,
    pub redistribution: RedistributionConfig,
}

// ── Top level ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub sales: SalesTargets,
    pub calendar: CalendarConfig,
    pub catalog: CatalogConfig,
    pub geography: GeographyConfig,
    pub generation: GenerationConfig,
}

fn read_json<T: DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

impl SynthConfig {
    /// Load all configuration tables from the data/ directory.
    /// In tests, use SynthConfig::builtin().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let config = Self {
            sales: read_json(data_dir, "sales.json")?,
            calendar: read_json(data_dir, "calendar.json")?,
            catalog: read_json(data_dir, "catalog.json")?,
            geography: read_json(data_dir, "locations.json")?,
            generation: read_json(data_dir, "generation.json")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// The shipped tables, compiled into the library.
    pub fn builtin() -> SynthResult<Self> {
        let config = Self {
            sales: serde_json::from_str(include_str!("../../data/sales.json"))?,
            calendar: serde_json::from_str(include_str!("../../data/calendar.json"))?,
            catalog: serde_json::from_str(include_str!("../../data/catalog.json"))?,
            geography: serde_json::from_str(include_str!("../../data/locations.json"))?,
            generation: serde_json::from_str(include_str!("../../data/generation.json"))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject tables the generator cannot run against. Everything checked
    /// here would otherwise surface as a fatal error mid-run.
    pub fn validate(&self) -> SynthResult<()> {
        for month in 1..=12u32 {
            let owners = self
                .calendar
                .season_months
                .values()
                .filter(|months| months.contains(&month))
                .count();
            if owners != 1 {
                return Err(SynthError::config(format!(
                    "month {month} belongs to {owners} seasons, expected exactly 1"
                )));
            }
        }
        for table in self.generation.archetypes.all() {
            if !table.has_positive() {
                return Err(SynthError::config("archetype table has no positive weight"));
            }
            for (season, weight) in table.iter() {
                let has_months = self
                    .calendar
                    .season_months
                    .get(season)
                    .is_some_and(|m| !m.is_empty());
                if weight > 0.0 && !has_months {
                    return Err(SynthError::config(format!(
                        "archetype weights season {} which has no months",
                        season.name()
                    )));
                }
            }
        }

        let catalog = &self.catalog;
        if catalog.categories.is_empty() {
            return Err(SynthError::config("catalog has no categories"));
        }
        for category in &catalog.categories {
            if category.items.is_empty() {
                return Err(SynthError::config(format!("category {} has no items", category.name)));
            }
        }
        for season in self.calendar.season_months.keys() {
            let category_table = catalog.season_category_weights.get(season);
            if category_table.map_or(true, |t| t.is_empty()) {
                return Err(SynthError::config(format!(
                    "no category weights for {}",
                    season.name()
                )));
            }
            if let Some(table) = category_table {
                for name in table.keys() {
                    catalog.category(name)?;
                }
            }
            if catalog.season_colors.get(season).map_or(true, |t| t.is_empty()) {
                return Err(SynthError::config(format!("no colors for {}", season.name())));
            }
        }
        if catalog.shipping.is_empty() || catalog.payment.is_empty() {
            return Err(SynthError::config("shipping and payment tables must be non-empty"));
        }
        if catalog.price_bands.is_empty() {
            return Err(SynthError::config("no price bands"));
        }
        for band in &catalog.price_bands {
            if band.min < 20.0 || band.max > 100.0 || band.min > band.max {
                return Err(SynthError::config(format!(
                    "price band {:.2}-{:.2} outside 20-100",
                    band.min, band.max
                )));
            }
        }

        if self.geography.locations.is_empty() {
            return Err(SynthError::config("no locations"));
        }
        if self.geography.locations.iter().all(|l| l.population == 0) {
            return Err(SynthError::config("total location population is zero"));
        }
        if self.sales.monthly_sales.is_empty() {
            return Err(SynthError::config("sales table is empty"));
        }
        if !self.sales.monthly_sales.contains_key(&self.sales.future_year) {
            return Err(SynthError::config(format!(
                "no monthly sales for future year {}",
                self.sales.future_year
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_validate() {
        let config = SynthConfig::builtin().unwrap();
        assert_eq!(config.catalog.categories.len(), 4);
        assert_eq!(config.geography.locations.len(), 50);
        assert_eq!(config.generation.seed, 42);
    }

    #[test]
    fn item_profile_defaults() {
        let item: ItemProfile = serde_json::from_str(
            r#"{"name": "Scarf", "seasons": {"Winter": 1.0, "Spring": 0.0, "Summer": 0.0, "Fall": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(item.popularity, 0.5);
        assert_eq!(item.gender_factor(Gender::Male), 0.5);
        assert_eq!(item.age_factor(AgeGroup::Age36To44), 0.25);
        assert!(item.tag.is_none());
        assert!(item.price.is_none());
    }

    #[test]
    fn archetype_quartiles() {
        let config = SynthConfig::builtin().unwrap();
        let a = &config.generation.archetypes;
        assert!(std::ptr::eq(a.for_roll(0.1), &a.winter_lover));
        assert!(std::ptr::eq(a.for_roll(0.25), &a.summer_lover));
        assert!(std::ptr::eq(a.for_roll(0.6), &a.spring_lover));
        assert!(std::ptr::eq(a.for_roll(0.99), &a.neutral));
    }

    #[test]
    fn price_band_outside_range_is_rejected() {
        let mut config = SynthConfig::builtin().unwrap();
        config.catalog.price_bands.push(PriceBand { min: 90.0, max: 120.0, weight: 0.1 });
        assert!(matches!(config.validate(), Err(SynthError::InvalidConfig { .. })));
    }
}
