//! Review ratings on a J-curve: mostly five stars, a bump at one star,
//! thin middle. Price, category and item nudge the shape.

use crate::{error::SynthResult, rng::SynthRng, sampler::sample_index};

/// Rating values, high to low.
pub const RATINGS: [f64; 9] = [5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0, 1.5, 1.0];

const BASE_WEIGHTS: [f64; 9] = [0.48, 0.11, 0.09, 0.05, 0.04, 0.02, 0.03, 0.03, 0.15];

/// Items bought with high expectations draw harsher reviews.
const HIGH_EXPECTATION_ITEMS: [&str; 4] = ["Suit", "Dress", "Heels", "Boots"];
/// Basics draw milder ones.
const BASIC_ITEMS: [&str; 3] = ["Socks", "T-Shirt", "Gloves"];

pub fn base_weights() -> [f64; 9] {
    BASE_WEIGHTS
}

fn slot(rating: f64) -> usize {
    RATINGS
        .iter()
        .position(|r| (*r - rating).abs() < f64::EPSILON)
        .unwrap_or(RATINGS.len() - 1)
}

fn scale(weights: &mut [f64; 9], ratings: &[f64], factor: f64) {
    for r in ratings {
        weights[slot(*r)] *= factor;
    }
}

/// Normalized rating weights, aligned with `RATINGS`.
pub fn review_weights(category: &str, item: &str, amount: f64) -> [f64; 9] {
    let mut w = BASE_WEIGHTS;

    if amount > 80.0 {
        scale(&mut w, &[5.0], 1.1);
        scale(&mut w, &[1.0], 1.2);
        scale(&mut w, &[2.0, 2.5, 3.0, 3.5, 4.0], 0.9);
    } else if amount < 30.0 {
        scale(&mut w, &[5.0], 0.9);
        scale(&mut w, &[1.0], 0.85);
        scale(&mut w, &[2.5, 3.0, 3.5, 4.0], 1.15);
    }

    match category {
        "Accessories" => {
            scale(&mut w, &[5.0, 4.5], 1.05);
            scale(&mut w, &[1.0], 0.9);
        }
        "Footwear" => {
            scale(&mut w, &[5.0], 1.1);
            scale(&mut w, &[1.0], 1.15);
            scale(&mut w, &[2.5, 3.0, 3.5], 0.85);
        }
        _ => {}
    }

    if HIGH_EXPECTATION_ITEMS.contains(&item) {
        scale(&mut w, &[1.0], 1.2);
        scale(&mut w, &[1.5], 1.1);
        scale(&mut w, &[5.0], 0.95);
    } else if BASIC_ITEMS.contains(&item) {
        scale(&mut w, &[1.0], 0.85);
        scale(&mut w, &[5.0], 0.95);
        scale(&mut w, &[3.0, 3.5, 4.0], 1.1);
    }

    let total: f64 = w.iter().sum();
    w.iter_mut().for_each(|x| *x /= total);
    w
}

pub fn sample_rating(category: &str, item: &str, amount: f64, rng: &mut SynthRng) -> SynthResult<f64> {
    let weights = review_weights(category, item, amount);
    Ok(RATINGS[sample_index(&weights, rng)?])
}

/// Combined probability of ratings in [low, high].
pub fn mass_between(weights: &[f64; 9], low: f64, high: f64) -> f64 {
    RATINGS
        .iter()
        .zip(weights)
        .filter(|(r, _)| **r >= low && **r <= high)
        .map(|(_, w)| w)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_normalized() {
        let w = review_weights("Footwear", "Boots", 95.0);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pricey_boots_polarize() {
        let base = base_weights();
        let base_total: f64 = base.iter().sum();
        let w = review_weights("Footwear", "Boots", 95.0);
        assert!(w[slot(1.0)] > base[slot(1.0)] / base_total);
    }

    #[test]
    fn sampled_ratings_are_half_steps() {
        let mut rng = SynthRng::new(2);
        for _ in 0..200 {
            let r = sample_rating("Clothing", "Jeans", 55.0, &mut rng).unwrap();
            assert!((1.0..=5.0).contains(&r));
            assert_eq!((r * 2.0).fract(), 0.0);
        }
    }
}
