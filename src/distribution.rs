//! Feature value distributions
//!
//! Four families share one capability, drawing a value from a caller-owned
//! random source. Each family implements [`rand_distr::Distribution`];
//! [`FeatureDistribution`] is the tagged variant stored in a sampler.

use std::fmt;

use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Distribution, Exp1, Normal, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;
use crate::{Result, SynthError};

/// Intervals containing the mode at least this wide (in standard deviations)
/// are sampled by plain normal rejection; narrower ones by uniform proposals.
const WIDE_INTERVAL: f64 = 2.506_628_274_631;

/// A single sampled feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Num(f64),
    Cat(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Num(v) => Some(*v),
            Value::Cat(_) => None,
        }
    }

    pub fn as_cat(&self) -> Option<&str> {
        match self {
            Value::Cat(s) => Some(s),
            _ => None,
        }
    }

    /// Text form with `precision` decimals for floating values.
    pub fn render(&self, precision: usize) -> String {
        format!("{self:.precision$}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Num(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Value::Cat(s) => f.write_str(s),
        }
    }
}

/// Cumulative weights scanned in declaration order.
#[derive(Debug, Clone, PartialEq)]
struct WeightTable {
    cumulative: Vec<f64>,
}

impl WeightTable {
    fn new(weights: &[f64]) -> Result<Self> {
        if weights.is_empty() {
            return Err(SynthError::InvalidParameter(
                "weight table must not be empty".to_string(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SynthError::InvalidParameter(
                "weights must be finite and non-negative".to_string(),
            ));
        }

        let cumulative: Vec<f64> = weights
            .iter()
            .scan(0.0, |acc, &w| {
                *acc += w;
                Some(*acc)
            })
            .collect();
        let total = cumulative[cumulative.len() - 1];
        if !(total > 0.0 && total.is_finite()) {
            return Err(SynthError::InvalidParameter(
                "total weight must be finite and > 0".to_string(),
            ));
        }
        Ok(Self { cumulative })
    }

    fn total(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u = rng.gen_range(0.0..self.total());
        self.cumulative
            .iter()
            .position(|&c| c > u)
            .unwrap_or(self.cumulative.len() - 1)
    }
}

/// Weighted choice over a fixed set of labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    labels: Vec<String>,
    weights: Vec<f64>,
    table: WeightTable,
}

impl Categorical {
    /// Build from `(label, weight)` pairs; every weight must be positive.
    pub fn new<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (labels, weights): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(l, w)| (l.into(), w)).unzip();
        if weights.iter().any(|w| !(*w > 0.0)) {
            return Err(SynthError::InvalidParameter(
                "categorical weights must be > 0".to_string(),
            ));
        }
        let table = WeightTable::new(&weights)?;
        Ok(Self {
            labels,
            weights,
            table,
        })
    }

    /// Draw a label by scanning cumulative weights against `u ~ U[0, total)`.
    pub fn sample_label<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.labels[self.table.draw(rng)]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn total_weight(&self) -> f64 {
        self.table.total()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl Distribution<String> for Categorical {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.sample_label(rng).to_string()
    }
}

/// Empirical distribution given as relative weights over equal-width bins.
///
/// A bin is chosen by weight, then the value is placed uniformly inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NonParametric {
    base: f64,
    bin_width: f64,
    table: WeightTable,
}

impl NonParametric {
    pub fn new(base: f64, bin_width: f64, weights: &[f64]) -> Result<Self> {
        if !base.is_finite() {
            return Err(SynthError::InvalidParameter(
                "base must be finite".to_string(),
            ));
        }
        if !(bin_width.is_finite() && bin_width > 0.0) {
            return Err(SynthError::InvalidParameter(
                "bin width must be finite and > 0".to_string(),
            ));
        }
        let table = WeightTable::new(weights)?;
        if !(base + bin_width * weights.len() as f64).is_finite() {
            return Err(SynthError::InvalidParameter(
                "support upper bound overflows".to_string(),
            ));
        }
        Ok(Self {
            base,
            bin_width,
            table,
        })
    }

    /// Resample the shape of an observed histogram.
    pub fn from_histogram(histogram: &Histogram) -> Result<Self> {
        let (min, _) = histogram.bounds();
        Self::new(min, histogram.bin_width(), histogram.bins())
    }

    pub fn num_bins(&self) -> usize {
        self.table.cumulative.len()
    }

    /// `[low, high)` covered by the bins.
    pub fn support(&self) -> (f64, f64) {
        (
            self.base,
            self.base + self.bin_width * self.num_bins() as f64,
        )
    }
}

impl Distribution<f64> for NonParametric {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let bin = self.table.draw(rng);
        self.base + bin as f64 * self.bin_width + rng.gen_range(0.0..self.bin_width)
    }
}

/// Normal distribution, optionally truncated to explicit bounds.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian {
    mean: f64,
    std_dev: f64,
    normal: Normal<f64>,
    truncation: Option<Truncation>,
}

/// Truncation bounds, raw and in standard deviations from the mean.
#[derive(Debug, Clone, Copy)]
struct Truncation {
    low: f64,
    high: f64,
    a: f64,
    b: f64,
}

impl Gaussian {
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        if !(mean.is_finite() && std_dev.is_finite()) {
            return Err(SynthError::InvalidParameter(
                "mean and standard deviation must be finite".to_string(),
            ));
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| SynthError::InvalidParameter(format!("gaussian: {e}")))?;
        Ok(Self {
            mean,
            std_dev,
            normal,
            truncation: None,
        })
    }

    /// Normal conditioned on `[low, high]`.
    ///
    /// Sampling is exact for any interval, including ones deep in a tail. The
    /// proposal (normal, uniform or shifted exponential) depends on where the
    /// interval sits; expected proposals per draw are bounded for every interval.
    pub fn truncated(mean: f64, std_dev: f64, low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(SynthError::InvalidParameter(
                "truncation bounds must be finite with low < high".to_string(),
            ));
        }
        let mut gaussian = Self::new(mean, std_dev)?;
        if !(std_dev > 0.0) {
            return Err(SynthError::InvalidParameter(
                "truncated gaussian needs std_dev > 0".to_string(),
            ));
        }

        let a = (low - mean) / std_dev;
        let b = (high - mean) / std_dev;
        if !((b - a).is_finite() && a < b) {
            return Err(SynthError::InvalidParameter(format!(
                "truncation bounds [{low}, {high}] are not resolvable at std_dev {std_dev}"
            )));
        }
        gaussian.truncation = Some(Truncation { low, high, a, b });
        Ok(gaussian)
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.truncation.map(|t| (t.low, t.high))
    }
}

impl Distribution<f64> for Gaussian {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let Some(t) = self.truncation else {
            return self.normal.sample(rng);
        };

        let z = standard_truncated(t.a, t.b, rng);
        // rescaling may round a hair past an edge
        (self.mean + self.std_dev * z).clamp(t.low, t.high)
    }
}

/// Standard normal conditioned on `[a, b]` (Robert, 1995).
fn standard_truncated<R: Rng + ?Sized>(a: f64, b: f64, rng: &mut R) -> f64 {
    if a < 0.0 && b > 0.0 {
        if b - a >= WIDE_INTERVAL {
            loop {
                let z: f64 = StandardNormal.sample(rng);
                if (a..=b).contains(&z) {
                    return z;
                }
            }
        }
        loop {
            let z = rng.gen_range(a..b);
            if rng.gen::<f64>() <= (-0.5 * z * z).exp() {
                return z;
            }
        }
    }

    if b <= 0.0 {
        -upper_tail(-b, -a, rng)
    } else {
        upper_tail(a, b, rng)
    }
}

/// Standard normal conditioned on `[a, b]` with `a >= 0`.
fn upper_tail<R: Rng + ?Sized>(a: f64, b: f64, rng: &mut R) -> f64 {
    if b - a < 1.0 / (a + 1.0) {
        loop {
            let z = rng.gen_range(a..b);
            if rng.gen::<f64>() <= (-0.5 * (z - a) * (z + a)).exp() {
                return z;
            }
        }
    }

    let rate = 0.5 * (a + a.hypot(2.0));
    loop {
        let e: f64 = Exp1.sample(rng);
        let z = a + e / rate;
        if z <= b && rng.gen::<f64>() <= (-0.5 * (z - rate) * (z - rate)).exp() {
            return z;
        }
    }
}

/// Continuous uniform over `[low, high)`.
#[derive(Debug, Clone, Copy)]
pub struct UniformRange {
    low: f64,
    high: f64,
    uniform: Uniform<f64>,
}

impl UniformRange {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(SynthError::InvalidParameter(
                "uniform bounds must be finite with low < high".to_string(),
            ));
        }
        if !(high - low).is_finite() {
            return Err(SynthError::InvalidParameter(format!(
                "uniform width {low}..{high} overflows"
            )));
        }
        Ok(Self {
            low,
            high,
            uniform: Uniform::new(low, high),
        })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

impl Distribution<f64> for UniformRange {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.uniform.sample(rng)
    }
}

/// Any distribution a feature can be drawn from.
#[derive(Debug, Clone)]
pub enum FeatureDistribution {
    Categorical(Categorical),
    NonParametric(NonParametric),
    Gaussian(Gaussian),
    Uniform(UniformRange),
}

impl FeatureDistribution {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FeatureDistribution::Categorical(_))
    }

    /// Draw a numeric value; `None` for categorical distributions, which leave
    /// the random source untouched.
    pub fn sample_num<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        match self {
            FeatureDistribution::Categorical(_) => None,
            FeatureDistribution::NonParametric(d) => Some(d.sample(rng)),
            FeatureDistribution::Gaussian(d) => Some(d.sample(rng)),
            FeatureDistribution::Uniform(d) => Some(d.sample(rng)),
        }
    }
}

impl Distribution<Value> for FeatureDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            FeatureDistribution::Categorical(d) => Value::Cat(d.sample(rng)),
            FeatureDistribution::NonParametric(d) => Value::Num(d.sample(rng)),
            FeatureDistribution::Gaussian(d) => Value::Num(d.sample(rng)),
            FeatureDistribution::Uniform(d) => Value::Num(d.sample(rng)),
        }
    }
}

impl From<Categorical> for FeatureDistribution {
    fn from(d: Categorical) -> Self {
        FeatureDistribution::Categorical(d)
    }
}

impl From<NonParametric> for FeatureDistribution {
    fn from(d: NonParametric) -> Self {
        FeatureDistribution::NonParametric(d)
    }
}

impl From<Gaussian> for FeatureDistribution {
    fn from(d: Gaussian) -> Self {
        FeatureDistribution::Gaussian(d)
    }
}

impl From<UniformRange> for FeatureDistribution {
    fn from(d: UniformRange) -> Self {
        FeatureDistribution::Uniform(d)
    }
}
