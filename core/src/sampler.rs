//! Weighted categorical sampling.
//!
//! A WeightTable keeps its entries in insertion order. Sampling walks the
//! cumulative weights with a single `next_f64()` draw, so the keyed form
//! (`sample`) and the list form (`sample_index`) consume the stream
//! identically for the same weights.

use crate::{
    error::{SynthError, SynthResult},
    rng::SynthRng,
};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Ordered mapping from outcome to non-negative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable<K> {
    entries: Vec<(K, f64)>,
}

impl<K> Default for WeightTable<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K> WeightTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, weight: f64) {
        self.entries.push((key, weight));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.entries.iter().map(|(k, w)| (k, *w))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, w)| *w).sum()
    }

    /// True when at least one weight is positive.
    pub fn has_positive(&self) -> bool {
        self.entries.iter().any(|(_, w)| *w > 0.0)
    }

    /// Multiply every weight whose key matches `pred` by `factor`.
    pub fn scale_where(&mut self, pred: impl Fn(&K) -> bool, factor: f64) {
        for (k, w) in &mut self.entries {
            if pred(k) {
                *w *= factor;
            }
        }
    }

    /// Keep only entries whose key matches `pred`, order preserved.
    pub fn retain(&mut self, pred: impl Fn(&K) -> bool) {
        self.entries.retain(|(k, _)| pred(k));
    }
}

impl<K: PartialEq> WeightTable<K> {
    pub fn get(&self, key: &K) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, w)| *w)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn scale(&mut self, key: &K, factor: f64) {
        self.scale_where(|k| k == key, factor);
    }
}

impl WeightTable<String> {
    /// Lookup by `&str` without allocating a key.
    pub fn get_str(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, w)| *w)
    }
}

impl<K> FromIterator<(K, f64)> for WeightTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Divide every weight by the sum. A non-positive (or non-finite) sum
/// yields a uniform table over the same keys.
pub fn normalize<K: Clone>(table: &WeightTable<K>) -> WeightTable<K> {
    let total = table.total();
    if total > 0.0 && total.is_finite() {
        table.iter().map(|(k, w)| (k.clone(), w / total)).collect()
    } else {
        let uniform = 1.0 / table.len().max(1) as f64;
        table.keys().map(|k| (k.clone(), uniform)).collect()
    }
}

/// Draw an index with probability proportional to its weight.
/// Negative and NaN weights count as zero; a list with no usable
/// weight (all zero, or an infinite total) is sampled uniformly.
pub fn sample_index(weights: &[f64], rng: &mut SynthRng) -> SynthResult<usize> {
    if weights.is_empty() {
        return Err(SynthError::empty("weight list"));
    }
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if !(total > 0.0 && total.is_finite()) {
        return Ok(rng.next_u64_below(weights.len() as u64) as usize);
    }

    let roll = rng.next_f64() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, w) in weights.iter().enumerate() {
        if w.is_nan() || *w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if roll < cumulative {
            return Ok(i);
        }
    }
    // Float rounding can leave roll a hair above the final cumulative sum.
    Ok(last_positive)
}

/// Draw a key from the table with probability proportional to its weight.
pub fn sample<'a, K>(table: &'a WeightTable<K>, rng: &mut SynthRng) -> SynthResult<&'a K> {
    let idx = sample_index(&table.weights(), rng)?;
    Ok(&table.entries[idx].0)
}

// ── serde: JSON objects in document order ───────────────────────────

impl<K: Serialize> Serialize for WeightTable<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, w) in &self.entries {
            map.serialize_entry(k, w)?;
        }
        map.end()
    }
}

struct WeightTableVisitor<K>(PhantomData<K>);

impl<'de, K: Deserialize<'de>> Visitor<'de> for WeightTableVisitor<K> {
    type Value = WeightTable<K>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of outcome to weight")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = WeightTable::new();
        while let Some((key, weight)) = access.next_entry::<K, f64>()? {
            if weight < 0.0 {
                return Err(serde::de::Error::custom(format!("negative weight {weight}")));
            }
            table.push(key, weight);
        }
        Ok(table)
    }
}

impl<'de, K: Deserialize<'de>> Deserialize<'de> for WeightTable<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WeightTableVisitor(PhantomData))
    }
}
