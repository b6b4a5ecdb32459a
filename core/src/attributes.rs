//! Per-purchase attribute sampling: category, item, amount, color, size,
//! rating, shipping and payment.

use crate::{
    config::{CatalogConfig, ItemProfile, ItemTag, PriceStats},
    error::{SynthError, SynthResult},
    location::{Geography, Location},
    rating,
    record::PurchaseDetails,
    rng::SynthRng,
    sampler::{normalize, sample, sample_index, WeightTable},
    types::{AgeGroup, Gender, Season, Size},
};

pub const MIN_AMOUNT: f64 = 20.0;
pub const MAX_AMOUNT: f64 = 100.0;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Who is buying, when, and where.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseContext<'a> {
    pub season: Season,
    pub gender: Option<Gender>,
    pub age_group: Option<AgeGroup>,
    pub location: Option<&'a Location>,
}

pub struct AttributeSynthesizer {
    catalog: CatalogConfig,
    geography: Geography,
}

impl AttributeSynthesizer {
    pub fn new(catalog: CatalogConfig, geography: Geography) -> Self {
        Self { catalog, geography }
    }

    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    pub fn geography(&self) -> &Geography {
        &self.geography
    }

    /// Seasonal category weights, sharpened by gender and age when both
    /// are known.
    pub fn category_weights(&self, ctx: &PurchaseContext) -> SynthResult<WeightTable<String>> {
        let seasonal = self
            .catalog
            .season_category_weights
            .get(&ctx.season)
            .ok_or_else(|| SynthError::empty(format!("categories for {}", ctx.season.name())))?;
        let (Some(gender), Some(age)) = (ctx.gender, ctx.age_group) else {
            return Ok(seasonal.clone());
        };
        let by_gender = self.catalog.category_weights.gender.get(&gender);
        let by_age = self.catalog.category_weights.age.get(&age);
        let combined: WeightTable<String> = seasonal
            .iter()
            .map(|(name, w)| {
                let g = by_gender.and_then(|t| t.get_str(name)).unwrap_or(1.0);
                let a = by_age.and_then(|t| t.get_str(name)).unwrap_or(1.0);
                (name.clone(), w * g * a)
            })
            .collect();
        Ok(normalize(&combined))
    }

    fn item_weight(&self, item: &ItemProfile, ctx: &PurchaseContext) -> f64 {
        let mut weight = item.seasons.get(ctx.season);
        if let Some(gender) = ctx.gender {
            weight *= item.gender_factor(gender);
        }
        if let Some(age) = ctx.age_group {
            weight *= item.age_factor(age);
        }
        let climate = self.geography.climate_multiplier(ctx.location);
        match item.tag {
            Some(ItemTag::Summer) => weight *= climate.summer_items,
            Some(ItemTag::Winter) => weight *= climate.winter_items,
            None => {}
        }
        weight * item.popularity
    }

    /// Normalized item weights within `category`, in catalog order.
    pub fn item_weights(&self, category: &str, ctx: &PurchaseContext) -> SynthResult<Vec<f64>> {
        let items = &self.catalog.category(category)?.items;
        if items.is_empty() {
            return Err(SynthError::empty(format!("items of {category}")));
        }
        let raw: WeightTable<usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (i, self.item_weight(item, ctx)))
            .collect();
        Ok(normalize(&raw).weights())
    }

    /// Reference price statistics for an item, or the catalog default.
    pub fn price_stats(&self, item: &str) -> PriceStats {
        self.catalog
            .categories
            .iter()
            .flat_map(|c| &c.items)
            .find(|i| i.name == item)
            .and_then(|i| i.price)
            .unwrap_or(self.catalog.default_price)
    }

    /// Banded amount with the seasonal multiplier applied. Capped at
    /// `MAX_AMOUNT` only: a summer discount can take a low band below
    /// `MIN_AMOUNT`, which the adjuster's final clamp lifts back.
    pub fn sample_amount(&self, season: Season, rng: &mut SynthRng) -> SynthResult<f64> {
        let bands = &self.catalog.price_bands;
        let weights: Vec<f64> = bands.iter().map(|b| b.weight).collect();
        let band = bands
            .get(sample_index(&weights, rng)?)
            .ok_or_else(|| SynthError::empty("price bands"))?;
        let amount = round2(rng.uniform(band.min, band.max));
        let multiplier = self
            .catalog
            .season_price_multipliers
            .get(&season)
            .copied()
            .unwrap_or(1.0);
        Ok(round2((amount * multiplier).min(MAX_AMOUNT)))
    }

    pub fn sample_color(&self, season: Season, rng: &mut SynthRng) -> SynthResult<String> {
        let colors = self
            .catalog
            .season_colors
            .get(&season)
            .ok_or_else(|| SynthError::empty(format!("colors for {}", season.name())))?;
        sample(colors, rng).cloned()
    }

    pub fn sample_size(&self, gender: Option<Gender>, rng: &mut SynthRng) -> SynthResult<Size> {
        match gender.and_then(|g| self.catalog.sizes.get(&g)) {
            Some(table) if !table.is_empty() => sample(table, rng).copied(),
            _ => Ok(Size::ALL[rng.next_u64_below(Size::ALL.len() as u64) as usize]),
        }
    }

    pub fn synthesize(&self, ctx: &PurchaseContext, rng: &mut SynthRng) -> SynthResult<PurchaseDetails> {
        let categories = self.category_weights(ctx)?;
        let category = sample(&categories, rng)?.clone();

        let item_weights = self.item_weights(&category, ctx)?;
        let items = &self.catalog.category(&category)?.items;
        let item = items[sample_index(&item_weights, rng)?].name.clone();

        let amount = self.sample_amount(ctx.season, rng)?;
        let color = self.sample_color(ctx.season, rng)?;
        let size = self.sample_size(ctx.gender, rng)?;
        let rating = rating::sample_rating(&category, &item, amount, rng)?;
        let shipping_type = sample(&self.catalog.shipping, rng)?.clone();
        let payment_method = sample(&self.catalog.payment, rng)?.clone();

        Ok(PurchaseDetails {
            category,
            item,
            amount,
            color,
            size,
            rating,
            shipping_type,
            payment_method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;

    fn synth() -> AttributeSynthesizer {
        let config = SynthConfig::builtin().unwrap();
        AttributeSynthesizer::new(config.catalog, Geography::from_config(&config.geography))
    }

    fn ctx<'a>(season: Season) -> PurchaseContext<'a> {
        PurchaseContext {
            season,
            gender: Some(Gender::Female),
            age_group: Some(AgeGroup::Age27To35),
            location: None,
        }
    }

    #[test]
    fn every_field_is_filled_and_amount_in_range() {
        let s = synth();
        let mut rng = SynthRng::new(42);
        for season in Season::ALL {
            for _ in 0..200 {
                let d = s.synthesize(&ctx(season), &mut rng).unwrap();
                assert!(!d.item.is_empty() && !d.color.is_empty());
                assert!((MIN_AMOUNT * 0.92..=MAX_AMOUNT).contains(&d.amount), "amount {}", d.amount);
                assert_eq!(round2(d.amount), d.amount);
            }
        }
    }

    #[test]
    fn summer_discount_can_undercut_the_floor() {
        let s = synth();
        let mut rng = SynthRng::new(9);
        let amounts: Vec<f64> =
            (0..2_000).map(|_| s.sample_amount(Season::Summer, &mut rng).unwrap()).collect();
        assert!(amounts.iter().all(|a| *a >= round2(MIN_AMOUNT * 0.92)));
        assert!(amounts.iter().any(|a| *a < MIN_AMOUNT), "no summer amount below the floor");
    }

    #[test]
    fn item_belongs_to_category() {
        let s = synth();
        let mut rng = SynthRng::new(5);
        for _ in 0..200 {
            let d = s.synthesize(&ctx(Season::Winter), &mut rng).unwrap();
            let category = s.catalog().category(&d.category).unwrap();
            assert!(category.items.iter().any(|i| i.name == d.item));
        }
    }

    #[test]
    fn cold_climate_favours_winter_items() {
        let s = synth();
        let cold = s
            .geography()
            .locations
            .iter()
            .find(|l| l.climate == crate::types::Climate::Cold)
            .unwrap();
        let tropical = s
            .geography()
            .locations
            .iter()
            .find(|l| l.climate == crate::types::Climate::Tropical)
            .unwrap();
        let mut c = ctx(Season::Winter);
        c.location = Some(cold);
        let in_cold = s.item_weights("Outerwear", &c).unwrap();
        c.location = Some(tropical);
        let in_tropics = s.item_weights("Outerwear", &c).unwrap();
        // Outerwear lists Coat (winter-tagged) first.
        assert!(in_cold[0] > in_tropics[0]);
    }

    #[test]
    fn unknown_item_uses_default_price() {
        let s = synth();
        let stats = s.price_stats("Kimono");
        assert_eq!(stats.mean, 59.764);
        assert!(s.price_stats("Jeans").mean > 70.0);
    }

    #[test]
    fn unknown_gender_gets_uniform_sizes() {
        let s = synth();
        let mut rng = SynthRng::new(13);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..400 {
            seen.insert(s.sample_size(None, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 4);
    }
}
