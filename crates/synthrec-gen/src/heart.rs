//! Heart disease record generator
//!
//! Ten features conditioned on a binary disease label:
//! sex, age, weight, systolic and diastolic blood pressure, smoking habit,
//! diet, weekly physical activity, years of education and ethnicity.

use std::io::Write;

use rand::Rng;
use synthrec::rng::seeded_or_entropy;
use synthrec::{
    AncestralSampler, Categorical, FeatureModel, Gaussian, NoiseInjector, NonParametric, Record,
    SynthError, Value,
};
use tracing::info;

use crate::config::GeneratorConfig;
use crate::id::generate_id;
use crate::GenError;

pub const CLASSES: [&str; 2] = ["1", "0"];
pub const SEX: [&str; 2] = ["M", "F"];
pub const SMOKER: [&str; 3] = ["NS", "SS", "SM"];
pub const DIET: [&str; 3] = ["BA", "AV", "GO"];
pub const ETHNICITY: [&str; 4] = ["WH", "BL", "SA", "EA"];

pub const NUM_FEATURES: usize = 10;

/// Numeric fields perturbed by additive noise and emitted as integers
pub const INTEGER_FEATURES: [usize; 3] = [2, 7, 8];

/// Categorical fields perturbed by flips, with their domains
pub const CATEGORICAL_FEATURES: [(usize, &[&str]); 4] =
    [(0, &SEX), (5, &SMOKER), (6, &DIET), (9, &ETHNICITY)];

/// Field count of a generated record and its categorical columns with
/// their domains, shifted past the id column when records are keyed.
pub fn record_layout(keyed: bool) -> (usize, Vec<(usize, &'static [&'static str])>) {
    let offset = usize::from(keyed);
    let columns = CATEGORICAL_FEATURES
        .iter()
        .map(|&(index, domain)| (index + offset, domain))
        .collect();
    (NUM_FEATURES + 1 + offset, columns)
}

/// Salt separating the noise stream from the sampling stream under one seed
const NOISE_SEED_SALT: u64 = 0x5EED_0F_401_5E;

fn categorical(pairs: &[(&str, f64)]) -> Result<Categorical, SynthError> {
    Categorical::new(pairs.iter().copied())
}

fn class_distribution() -> Result<Categorical, SynthError> {
    categorical(&[("1", 25.0), ("0", 75.0)])
}

pub fn heart_disease_model() -> Result<FeatureModel, SynthError> {
    let mut model = FeatureModel::new();

    // sex
    model.insert("1", 0, categorical(&[("M", 60.0), ("F", 40.0)])?);
    model.insert("0", 0, categorical(&[("M", 50.0), ("F", 50.0)])?);

    // age
    model.insert("1", 1, NonParametric::new(30.0, 10.0, &[10.0, 20.0, 35.0, 60.0, 90.0])?);
    model.insert("0", 1, NonParametric::new(30.0, 10.0, &[15.0, 20.0, 25.0, 30.0, 30.0])?);

    // weight
    model.insert("1", 2, Gaussian::new(190.0, 8.0)?);
    model.insert("0", 2, Gaussian::new(150.0, 15.0)?);

    // systolic blood pressure
    model.insert(
        "1",
        3,
        NonParametric::new(100.0, 10.0, &[20.0, 25.0, 25.0, 30.0, 35.0, 45.0, 60.0, 75.0])?,
    );
    model.insert(
        "0",
        3,
        NonParametric::new(100.0, 10.0, &[20.0, 30.0, 40.0, 20.0, 12.0, 8.0, 6.0, 4.0])?,
    );

    // diastolic blood pressure
    model.insert("1", 4, NonParametric::new(60.0, 10.0, &[20.0, 20.0, 25.0, 35.0, 50.0, 70.0])?);
    model.insert("0", 4, NonParametric::new(60.0, 10.0, &[20.0, 20.0, 25.0, 18.0, 12.0, 7.0])?);

    // smoker
    model.insert("1", 5, categorical(&[("NS", 20.0), ("SS", 35.0), ("SM", 60.0)])?);
    model.insert("0", 5, categorical(&[("NS", 40.0), ("SS", 20.0), ("SM", 15.0)])?);

    // diet
    model.insert("1", 6, categorical(&[("BA", 60.0), ("AV", 35.0), ("GO", 20.0)])?);
    model.insert("0", 6, categorical(&[("BA", 15.0), ("AV", 40.0), ("GO", 45.0)])?);

    // physical activity per week
    model.insert("1", 7, Gaussian::new(5.0, 1.0)?);
    model.insert("0", 7, Gaussian::new(15.0, 2.0)?);

    // education
    model.insert("1", 8, Gaussian::new(11.0, 2.0)?);
    model.insert("0", 8, Gaussian::new(17.0, 1.0)?);

    // ethnicity
    model.insert(
        "1",
        9,
        categorical(&[("WH", 30.0), ("BL", 40.0), ("SA", 50.0), ("EA", 20.0)])?,
    );
    model.insert(
        "0",
        9,
        categorical(&[("WH", 50.0), ("BL", 20.0), ("SA", 16.0), ("EA", 20.0)])?,
    );

    Ok(model)
}

pub fn heart_disease_sampler<R: Rng>(rng: R) -> Result<AncestralSampler<R>, SynthError> {
    let sampler = AncestralSampler::with_feature_count(
        class_distribution()?,
        heart_disease_model()?,
        NUM_FEATURES,
        rng,
    );
    sampler.validate()?;
    Ok(sampler)
}

/// Noise applied to every generated record.
#[derive(Debug, Clone, Copy)]
pub struct HeartNoise {
    error: Gaussian,
    flip_probability: f64,
}

impl HeartNoise {
    /// `level` is both the standard deviation of numeric noise and the flip
    /// probability of categorical fields and the class label.
    pub fn new(level: f64) -> Result<Self, SynthError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(SynthError::InvalidParameter(format!(
                "noise level {level} is outside [0, 1]"
            )));
        }
        Ok(Self {
            error: Gaussian::new(0.0, level)?,
            flip_probability: level,
        })
    }

    pub fn apply<R: Rng>(
        &self,
        record: &mut Record,
        injector: &mut NoiseInjector<R>,
    ) -> Result<(), SynthError> {
        for index in INTEGER_FEATURES {
            let value = record.features[index].as_f64().ok_or_else(|| {
                SynthError::InvalidParameter(format!("feature {index} is not numeric"))
            })?;
            let noisy = injector.add_noise_num(value, &self.error);
            record.features[index] = Value::Int(noisy.trunc() as i64);
        }

        for (index, domain) in CATEGORICAL_FEATURES {
            let value = record.features[index].as_cat().ok_or_else(|| {
                SynthError::InvalidParameter(format!("feature {index} is not categorical"))
            })?;
            let noisy = injector.add_noise_cat(value, domain, self.flip_probability)?;
            record.features[index] = Value::Cat(noisy);
        }

        record.class = injector.add_noise_cat(&record.class, &CLASSES, self.flip_probability)?;
        Ok(())
    }
}

/// Write `config.num_samples` noisy records as delimited lines.
pub fn generate_records<W: Write>(config: &GeneratorConfig, out: &mut W) -> Result<usize, GenError> {
    config.validate()?;

    let mut sampler = heart_disease_sampler(seeded_or_entropy(config.seed))?;
    let mut injector = NoiseInjector::new(seeded_or_entropy(
        config.seed.map(|seed| seed ^ NOISE_SEED_SALT),
    ));
    let noise = HeartNoise::new(config.noise)?;
    let sep = config.delimiter_str();

    info!(
        num_samples = config.num_samples,
        noise = config.noise,
        seeded = config.seed.is_some(),
        "generating heart disease records"
    );

    let mut written = 0;
    for record in sampler.samples(config.num_samples) {
        let mut record = record?;
        noise.apply(&mut record, &mut injector)?;

        let line = match config.key_len {
            Some(len) => {
                let id = generate_id(len, injector.rng_mut());
                record.to_delimited_with_id(&id, &sep, config.precision)
            }
            None => record.to_delimited(&sep, config.precision),
        };
        writeln!(out, "{line}")?;
        written += 1;
    }
    out.flush()?;

    info!(written, "generation complete");
    Ok(written)
}
