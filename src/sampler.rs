//! Ancestral sampling of class-conditioned records
//!
//! The class label is drawn first; every feature is then drawn from the
//! distribution registered for that class and feature index. Features are
//! conditionally independent given the class.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::distribution::{Categorical, FeatureDistribution, Value};
use crate::rng::SynthRng;
use crate::{Result, SynthError};

/// Per-class, per-feature distributions.
#[derive(Debug, Clone, Default)]
pub struct FeatureModel {
    by_class: BTreeMap<String, BTreeMap<usize, FeatureDistribution>>,
}

impl FeatureModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the distribution of `feature` under `class`, returning any
    /// distribution it replaces.
    pub fn insert(
        &mut self,
        class: impl Into<String>,
        feature: usize,
        distribution: impl Into<FeatureDistribution>,
    ) -> Option<FeatureDistribution> {
        self.by_class
            .entry(class.into())
            .or_default()
            .insert(feature, distribution.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(
        mut self,
        class: impl Into<String>,
        feature: usize,
        distribution: impl Into<FeatureDistribution>,
    ) -> Self {
        self.insert(class, feature, distribution);
        self
    }

    pub fn get(&self, class: &str, feature: usize) -> Option<&FeatureDistribution> {
        self.by_class.get(class)?.get(&feature)
    }

    /// Number of (class, feature) entries.
    pub fn len(&self) -> usize {
        self.by_class.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One synthesized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub class: String,
    pub features: Vec<Value>,
}

impl Record {
    /// Features followed by the class label, joined by `sep`.
    pub fn to_delimited(&self, sep: &str, precision: usize) -> String {
        let mut fields: Vec<String> = self.features.iter().map(|f| f.render(precision)).collect();
        fields.push(self.class.clone());
        fields.join(sep)
    }

    /// Same as [`to_delimited`](Self::to_delimited) with `id` as the first field.
    pub fn to_delimited_with_id(&self, id: &str, sep: &str, precision: usize) -> String {
        format!("{id}{sep}{}", self.to_delimited(sep, precision))
    }
}

/// Star-shaped generative model: class is the sole parent of every feature.
pub struct AncestralSampler<R = SynthRng> {
    classes: Categorical,
    model: FeatureModel,
    order: Vec<usize>,
    rng: R,
}

impl<R: Rng> AncestralSampler<R> {
    /// Sample the features listed in `order`, in that order.
    pub fn new(classes: Categorical, model: FeatureModel, order: Vec<usize>, rng: R) -> Self {
        debug!(
            classes = classes.labels().len(),
            features = order.len(),
            entries = model.len(),
            "built ancestral sampler"
        );
        Self {
            classes,
            model,
            order,
            rng,
        }
    }

    /// Sample features `0..num_features`.
    pub fn with_feature_count(
        classes: Categorical,
        model: FeatureModel,
        num_features: usize,
        rng: R,
    ) -> Self {
        Self::new(classes, model, (0..num_features).collect(), rng)
    }

    /// Check up front that every class can produce every feature.
    ///
    /// Sampling performs the same check lazily for the realized class only.
    pub fn validate(&self) -> Result<()> {
        for class in self.classes.labels() {
            for &feature in &self.order {
                if self.model.get(class, feature).is_none() {
                    return Err(SynthError::MissingDistribution {
                        class: class.clone(),
                        feature,
                    });
                }
            }
        }
        Ok(())
    }

    /// Draw a class, then each configured feature conditioned on it.
    pub fn sample(&mut self) -> Result<Record> {
        let class = self.classes.sample_label(&mut self.rng).to_string();
        let mut features = Vec::with_capacity(self.order.len());

        for &feature in &self.order {
            let distribution =
                self.model
                    .get(&class, feature)
                    .ok_or_else(|| SynthError::MissingDistribution {
                        class: class.clone(),
                        feature,
                    })?;
            features.push(distribution.sample(&mut self.rng));
        }

        trace!(class = %class, "sampled record");
        Ok(Record { class, features })
    }

    /// Lazy sequence of `count` records. Each call starts a fresh sequence
    /// that continues the random stream.
    pub fn samples(&mut self, count: usize) -> Samples<'_, R> {
        Samples {
            sampler: self,
            remaining: count,
        }
    }

    pub fn classes(&self) -> &Categorical {
        &self.classes
    }

    pub fn feature_order(&self) -> &[usize] {
        &self.order
    }

    pub fn model(&self) -> &FeatureModel {
        &self.model
    }

    /// Hand back the random source, e.g. to share it with a noise injector.
    pub fn into_rng(self) -> R {
        self.rng
    }
}

/// Iterator returned by [`AncestralSampler::samples`].
pub struct Samples<'a, R> {
    sampler: &'a mut AncestralSampler<R>,
    remaining: usize,
}

impl<R: Rng> Iterator for Samples<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.sampler.sample())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for Samples<'_, R> {}
