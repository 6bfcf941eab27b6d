//! Fixed-width binned histogram
//!
//! Bins cover `[xmin, xmin + num_bins * bin_width)`. Insertions and lookups
//! are accepted only for coordinates within `[xmin, xmax]`, where `xmax` is
//! the configured upper bound (or the lower edge of the last bin when the
//! histogram is built from existing counts).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, SynthError};

/// Upper bound on the number of bins a histogram may allocate.
pub const MAX_BINS: usize = 1 << 24;

/// Binned frequency table over a bounded numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    xmin: f64,
    xmax: f64,
    bin_width: f64,
    bins: Vec<f64>,
    /// Prefix sums over `bins`, present only after `cum_distr` and until the next `add`
    cumulative: Option<Vec<f64>>,
}

fn check_geometry(min: f64, bin_width: f64) -> Result<()> {
    if !min.is_finite() {
        return Err(SynthError::InvalidParameter(
            "histogram minimum must be finite".to_string(),
        ));
    }
    if !(bin_width.is_finite() && bin_width > 0.0) {
        return Err(SynthError::InvalidParameter(
            "bin width must be finite and > 0".to_string(),
        ));
    }
    Ok(())
}

impl Histogram {
    /// Create a zeroed histogram with `floor((max - min) / bin_width) + 1` bins.
    pub fn with_range(min: f64, max: f64, bin_width: f64) -> Result<Self> {
        check_geometry(min, bin_width)?;
        if !max.is_finite() || max < min {
            return Err(SynthError::InvalidParameter(
                "histogram maximum must be finite and >= minimum".to_string(),
            ));
        }

        let span = ((max - min) / bin_width).floor();
        let num_bins = if span.is_finite() && span < MAX_BINS as f64 {
            (span as usize).checked_add(1)
        } else {
            None
        }
        .ok_or_else(|| {
            SynthError::InvalidParameter(format!(
                "range [{min}, {max}] with bin width {bin_width} needs more than {MAX_BINS} bins"
            ))
        })?;
        debug!(min, max, bin_width, num_bins, "created empty histogram");

        Ok(Self {
            xmin: min,
            xmax: max,
            bin_width,
            bins: vec![0.0; num_bins],
            cumulative: None,
        })
    }

    /// Adopt `values` as bin contents; `xmax` becomes the lower edge of the last bin.
    pub fn from_bins(min: f64, bin_width: f64, values: Vec<f64>) -> Result<Self> {
        check_geometry(min, bin_width)?;
        if values.is_empty() {
            return Err(SynthError::InvalidParameter(
                "histogram needs at least one bin".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SynthError::InvalidParameter(
                "bin contents must be finite and non-negative".to_string(),
            ));
        }

        let xmax = min + bin_width * (values.len() - 1) as f64;
        if !xmax.is_finite() {
            return Err(SynthError::InvalidParameter(
                "histogram upper bound overflows".to_string(),
            ));
        }
        Ok(Self {
            xmin: min,
            xmax,
            bin_width,
            bins: values,
            cumulative: None,
        })
    }

    /// Index of the bin containing `x`, if `x` lies within the histogram bounds.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !(x >= self.xmin && x <= self.xmax) {
            return None;
        }
        let bin = ((x - self.xmin) / self.bin_width).floor();
        if bin >= 0.0 && bin < self.bins.len() as f64 {
            Some(bin as usize)
        } else {
            None
        }
    }

    fn locate(&self, x: f64) -> Result<usize> {
        self.bin_index(x).ok_or(SynthError::OutOfRange {
            value: x,
            min: self.xmin,
            max: self.xmax,
        })
    }

    /// Count one observation. Invalidates any derived cumulative distribution.
    pub fn add(&mut self, value: f64) -> Result<()> {
        let bin = self.locate(value)?;
        self.bins[bin] += 1.0;
        self.cumulative = None;
        Ok(())
    }

    /// Count every value in order, stopping at the first one out of range.
    ///
    /// Values preceding the failing one stay counted.
    pub fn extend_from<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.add(value)?;
        }
        Ok(())
    }

    /// A copy whose bins sum to 1.0. The receiver is left untouched, so
    /// normalizing repeatedly never compounds.
    pub fn normalized(&self) -> Result<Self> {
        let total = self.total();
        if total <= 0.0 {
            return Err(SynthError::EmptyHistogram);
        }

        Ok(Self {
            xmin: self.xmin,
            xmax: self.xmax,
            bin_width: self.bin_width,
            bins: self.bins.iter().map(|b| b / total).collect(),
            cumulative: None,
        })
    }

    /// Derive and cache the prefix sums over the bins.
    pub fn cum_distr(&mut self) -> &[f64] {
        let cumulative: Vec<f64> = self
            .bins
            .iter()
            .scan(0.0, |acc, &b| {
                *acc += b;
                Some(*acc)
            })
            .collect();
        self.cumulative.insert(cumulative).as_slice()
    }

    /// Cached prefix sums, if derived since the last insertion.
    pub fn cumulative(&self) -> Option<&[f64]> {
        self.cumulative.as_deref()
    }

    /// Coordinate at which the cumulative distribution reaches `p`.
    ///
    /// Finds the first bin whose cumulative value exceeds `p` and interpolates
    /// linearly inside it, anchored on the previous bin's cumulative value.
    /// `p` is in the units of the cumulative sequence: a count for a raw
    /// histogram, a fraction after normalization.
    pub fn percentile(&self, p: f64) -> Result<f64> {
        let cumulative = self.cumulative.as_deref().ok_or(SynthError::NotReady)?;
        let last = cumulative.last().copied().unwrap_or(0.0);
        if !(p >= 0.0 && p <= last) {
            return Err(SynthError::OutOfRange {
                value: p,
                min: 0.0,
                max: last,
            });
        }

        match cumulative.iter().position(|&c| c > p) {
            Some(i) => {
                let lower = if i == 0 { 0.0 } else { cumulative[i - 1] };
                let fraction = (p - lower) / (cumulative[i] - lower);
                Ok(self.xmin + (i as f64 + fraction) * self.bin_width)
            }
            None => {
                // p equals the total: the upper edge of the first bin reaching it
                let i = cumulative
                    .iter()
                    .position(|&c| c >= p)
                    .unwrap_or(cumulative.len() - 1);
                Ok(self.xmin + (i + 1) as f64 * self.bin_width)
            }
        }
    }

    /// Content of the bin containing `x`.
    pub fn value(&self, x: f64) -> Result<f64> {
        let bin = self.locate(x)?;
        Ok(self.bins[bin])
    }

    /// Cumulative content up to and including the bin containing `x`.
    pub fn cum_value(&self, x: f64) -> Result<f64> {
        let bin = self.locate(x)?;
        let cumulative = self.cumulative.as_deref().ok_or(SynthError::NotReady)?;
        Ok(cumulative[bin])
    }

    pub fn max_count(&self) -> f64 {
        self.bins.iter().copied().fold(0.0, f64::max)
    }

    pub fn total(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// `(xmin, xmax)`
    pub fn bounds(&self) -> (f64, f64) {
        (self.xmin, self.xmax)
    }

    /// Clamp `x` into `[xmin, xmax]`.
    pub fn bounded_value(&self, x: f64) -> f64 {
        x.clamp(self.xmin, self.xmax)
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }
}
