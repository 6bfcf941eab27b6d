//! Rewriting existing delimited record files.

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rand::Rng;
use rand_distr::Distribution;
use synthrec::{Gaussian, NoiseInjector, UniformRange};
use tracing::info;

use crate::config::NoiseColumn;
use crate::GenError;

fn reader<Rd: Read>(input: Rd, delimiter: u8) -> csv::Reader<Rd> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(input)
}

fn writer<W: Write>(output: W, delimiter: u8) -> csv::Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_writer(output)
}

fn line_of(record: &StringRecord, fallback: usize) -> u64 {
    record
        .position()
        .map(|p| p.line())
        .unwrap_or(fallback as u64 + 1)
}

/// Add uniform integer noise to the selected integer columns of every record.
pub fn add_column_noise<Rd, W, R>(
    input: Rd,
    output: W,
    columns: &[NoiseColumn],
    delimiter: u8,
    injector: &mut NoiseInjector<R>,
) -> Result<usize, GenError>
where
    Rd: Read,
    W: Write,
    R: Rng,
{
    let errors = columns
        .iter()
        .map(|c| UniformRange::new(-c.half_width, c.half_width).map(|e| (c.index, e)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut reader = reader(input, delimiter);
    let mut writer = writer(output, delimiter);
    let mut rewritten = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = line_of(&record, idx);
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();

        for (column, error) in &errors {
            let field = fields.get_mut(*column).ok_or_else(|| GenError::InvalidRecord {
                line,
                reason: format!("no column {column}"),
            })?;
            let value: i64 = field.trim().parse().map_err(|_| GenError::InvalidRecord {
                line,
                reason: format!("column {column} is not an integer: {field:?}"),
            })?;
            *field = injector.add_noise_int(value, error).to_string();
        }

        writer.write_record(&fields)?;
        rewritten += 1;
    }

    writer.flush()?;
    info!(rewritten, columns = columns.len(), "added column noise");
    Ok(rewritten)
}

/// Insert two class-independent integer features ahead of the trailing class
/// field: years in current job (at least 0) and income (at least 20).
pub fn append_spurious_features<Rd, W, R>(
    input: Rd,
    output: W,
    delimiter: u8,
    rng: &mut R,
) -> Result<usize, GenError>
where
    Rd: Read,
    W: Write,
    R: Rng + ?Sized,
{
    let years_in_job = Gaussian::new(8.0, 3.0)?;
    let income = Gaussian::new(100.0, 40.0)?;

    let mut reader = reader(input, delimiter);
    let mut writer = writer(output, delimiter);
    let mut rewritten = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let fields: Vec<&str> = record.iter().collect();
        let Some((class, features)) = fields.split_last() else {
            return Err(GenError::InvalidRecord {
                line: line_of(&record, idx),
                reason: "empty record".to_string(),
            });
        };

        let years = (years_in_job.sample(rng).trunc() as i64).max(0);
        let earned = (income.sample(rng).trunc() as i64).max(20);

        let mut fields: Vec<String> = features.iter().map(|f| f.to_string()).collect();
        fields.push(years.to_string());
        fields.push(earned.to_string());
        fields.push(class.to_string());

        writer.write_record(&fields)?;
        rewritten += 1;
    }

    writer.flush()?;
    info!(rewritten, "appended spurious features");
    Ok(rewritten)
}

/// Replace every categorical column by one indicator column per member of
/// its domain, in domain order, holding `1` for the member present and `0`
/// elsewhere. Other columns pass through unchanged. Every record must have
/// exactly `row_len` fields.
pub fn expand_dummy_vars<Rd, W>(
    input: Rd,
    output: W,
    row_len: usize,
    columns: &[(usize, &[&str])],
    delimiter: u8,
) -> Result<usize, GenError>
where
    Rd: Read,
    W: Write,
{
    if let Some((index, _)) = columns.iter().find(|(index, _)| *index >= row_len) {
        return Err(GenError::InvalidConfig(format!(
            "categorical column {index} is outside a {row_len} field record"
        )));
    }

    let mut reader = reader(input, delimiter);
    let mut writer = writer(output, delimiter);
    let mut rewritten = 0;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = line_of(&record, idx);
        if record.len() != row_len {
            return Err(GenError::InvalidRecord {
                line,
                reason: format!("expected {row_len} fields, found {}", record.len()),
            });
        }

        let mut fields: Vec<&str> = Vec::with_capacity(row_len);
        for (index, field) in record.iter().enumerate() {
            let Some((_, domain)) = columns.iter().find(|(c, _)| *c == index) else {
                fields.push(field);
                continue;
            };
            if !domain.contains(&field) {
                return Err(GenError::InvalidRecord {
                    line,
                    reason: format!("column {index} value {field:?} is not one of {domain:?}"),
                });
            }
            fields.extend(
                domain
                    .iter()
                    .map(|member| if *member == field { "1" } else { "0" }),
            );
        }

        writer.write_record(&fields)?;
        rewritten += 1;
    }

    writer.flush()?;
    info!(rewritten, columns = columns.len(), "expanded dummy variables");
    Ok(rewritten)
}
