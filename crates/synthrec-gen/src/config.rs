use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use tracing::debug;

use crate::GenError;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde_as(as = "DefaultOnNull")]
    pub num_samples: usize,
    /// Standard deviation of numeric noise and flip probability of categorical noise
    #[serde_as(as = "DefaultOnNull")]
    pub noise: f64,
    /// Length of the random id prefixed to each record, none when absent
    pub key_len: Option<usize>,
    pub seed: Option<u64>,
    #[serde_as(as = "DefaultOnNull")]
    pub precision: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub delimiter: char,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            noise: 0.1,
            key_len: None,
            seed: None,
            precision: 3,
            delimiter: ',',
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenError> {
        if self.num_samples == 0 {
            return Err(GenError::InvalidConfig(
                "num_samples must be greater than zero".to_string(),
            ));
        }

        if !self.noise.is_finite() || !(0.0..=1.0).contains(&self.noise) {
            return Err(GenError::InvalidConfig(
                "noise must be within [0, 1]".to_string(),
            ));
        }

        if self.key_len == Some(0) {
            return Err(GenError::InvalidConfig(
                "key_len must be greater than zero when set".to_string(),
            ));
        }

        if self.precision > 12 {
            return Err(GenError::InvalidConfig(
                "precision must be at most 12".to_string(),
            ));
        }

        if !(self.delimiter == '\t' || self.delimiter.is_ascii_punctuation()) {
            return Err(GenError::InvalidConfig(format!(
                "delimiter {:?} must be ascii punctuation or tab",
                self.delimiter
            )));
        }

        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, GenError> {
        let raw = fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "loaded generator config");
        Ok(config)
    }

    /// Explicit path first, then `config.json` in the working directory,
    /// then the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, GenError> {
        if let Some(path) = path {
            return Self::from_json_file(path);
        }

        let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
        if cwd_config.exists() {
            return Self::from_json_file(&cwd_config);
        }

        Ok(Self::default())
    }

    pub fn delimiter_str(&self) -> String {
        self.delimiter.to_string()
    }
}

/// Column index paired with the half-width of its uniform noise band,
/// written `index:half_width` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseColumn {
    pub index: usize,
    pub half_width: f64,
}

impl FromStr for NoiseColumn {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, half_width) = s.split_once(':').ok_or_else(|| {
            GenError::InvalidConfig(format!("expected index:half_width, got {s:?}"))
        })?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| GenError::InvalidConfig(format!("bad column index in {s:?}")))?;
        let half_width: f64 = half_width
            .trim()
            .parse()
            .map_err(|_| GenError::InvalidConfig(format!("bad half width in {s:?}")))?;
        if !(half_width.is_finite() && half_width > 0.0) {
            return Err(GenError::InvalidConfig(format!(
                "half width in {s:?} must be > 0"
            )));
        }
        Ok(Self { index, half_width })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GeneratorConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"num_samples": 20, "seed": 7, "precision": null}"#).unwrap();
        assert_eq!(config.num_samples, 20);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.precision, 0);
        assert_eq!(config.delimiter, ',');
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            GeneratorConfig {
                num_samples: 0,
                ..Default::default()
            },
            GeneratorConfig {
                noise: 1.5,
                ..Default::default()
            },
            GeneratorConfig {
                key_len: Some(0),
                ..Default::default()
            },
            GeneratorConfig {
                delimiter: 'a',
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(GenError::InvalidConfig(_))));
        }
    }

    #[test]
    fn parses_noise_column() {
        let column: NoiseColumn = "8:0.4".parse().unwrap();
        assert_eq!(
            column,
            NoiseColumn {
                index: 8,
                half_width: 0.4
            }
        );
        assert!("8".parse::<NoiseColumn>().is_err());
        assert!("x:0.4".parse::<NoiseColumn>().is_err());
        assert!("8:-1".parse::<NoiseColumn>().is_err());
    }
}
