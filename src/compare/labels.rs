//! Labeled values and alignment against a reference label set.

use super::{ComparisonError, LabelList};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Collapse runs of whitespace and trim. Case is kept.
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic float id for a label: the first 8 bytes of its SHA-256
/// digest (big-endian) reduced modulo 2^53, so it is exact as an `f64`.
///
/// Lets label sets be compared with the Jaccard metric.
pub fn label_id(label: &str) -> f64 {
    let digest = Sha256::digest(label.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % (1u64 << 53)) as f64
}

/// Ordered `(label, value)` pairs. Duplicates are kept so alignment can
/// reject them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabeledValues(pub Vec<(String, f64)>);

impl LabeledValues {
    pub fn new(pairs: Vec<(String, f64)>) -> Self {
        Self(pairs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }

    /// Label ids (see [`label_id`]) of the normalized labels, in order.
    pub fn label_ids(&self) -> Vec<f64> {
        self.labels().map(|l| label_id(&normalize_label(l))).collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for LabeledValues {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, v)| (l.into(), v)).collect())
    }
}

impl<'de> Deserialize<'de> for LabeledValues {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tree = super::series::Tree::deserialize(deserializer)?;
        tree.flatten(None, "labeled values")
            .map_err(serde::de::Error::custom)
    }
}

/// How observed labels must relate to the reference label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignPolicy {
    /// Observed must contain every reference label; extra labels are ignored.
    #[default]
    Superset,
    /// Observed must contain exactly the reference labels.
    Exact,
}

/// Values paired by label, in reference order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned {
    pub labels: Vec<String>,
    pub observed: Vec<f64>,
    pub reference: Vec<f64>,
}

fn unique_map(
    values: &LabeledValues,
    side: &'static str,
) -> Result<(HashMap<String, f64>, Vec<String>), ComparisonError> {
    let mut map = HashMap::with_capacity(values.len());
    let mut order = Vec::with_capacity(values.len());
    for (raw, value) in &values.0 {
        let key = normalize_label(raw);
        if map.insert(key.clone(), *value).is_some() {
            return Err(ComparisonError::DuplicateLabel {
                side,
                label: raw.clone(),
            });
        }
        order.push(key);
    }
    Ok((map, order))
}

/// Pair observed values with reference values by normalized label.
///
/// The reference defines the expected labels and their order. Duplicate
/// labels on either side are an error, as is any reference label missing
/// from `observed`; with [`AlignPolicy::Exact`] so is any extra observed
/// label. Reported labels are sorted and capped at `max_items`.
pub fn align_by_reference(
    observed: &LabeledValues,
    reference: &LabeledValues,
    policy: AlignPolicy,
    max_items: usize,
) -> Result<Aligned, ComparisonError> {
    let (obs_map, _) = unique_map(observed, "observed")?;
    let (ref_map, ref_order) = unique_map(reference, "reference")?;

    let mut missing: Vec<String> = ref_order
        .iter()
        .filter(|k| !obs_map.contains_key(*k))
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ComparisonError::MissingLabels(LabelList::new(missing, max_items)));
    }

    if policy == AlignPolicy::Exact {
        let expected: HashSet<&String> = ref_order.iter().collect();
        let mut extra: Vec<String> = obs_map
            .keys()
            .filter(|k| !expected.contains(k))
            .cloned()
            .collect();
        if !extra.is_empty() {
            extra.sort();
            return Err(ComparisonError::ExtraLabels(LabelList::new(extra, max_items)));
        }
    }

    let mut aligned = Aligned {
        labels: Vec::with_capacity(ref_order.len()),
        observed: Vec::with_capacity(ref_order.len()),
        reference: Vec::with_capacity(ref_order.len()),
    };
    for key in ref_order {
        aligned.observed.push(obs_map[&key]);
        aligned.reference.push(ref_map[&key]);
        aligned.labels.push(key);
    }
    Ok(aligned)
}
