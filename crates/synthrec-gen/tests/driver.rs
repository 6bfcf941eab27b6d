use std::fs::{self, File};
use std::io::Write;

use synthrec::rng::seeded;
use synthrec::NoiseInjector;
use synthrec_gen::{
    add_column_noise, append_spurious_features, expand_dummy_vars, generate_records,
    record_layout, GeneratorConfig, NoiseColumn,
};

#[test]
fn config_file_drives_generation() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let mut file = File::create(&config_path).unwrap();
    writeln!(
        file,
        r#"{{"num_samples": 40, "noise": 0.05, "seed": 21, "delimiter": ";", "key_len": null}}"#
    )
    .unwrap();
    drop(file);

    let config = GeneratorConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.num_samples, 40);
    assert_eq!(config.delimiter, ';');
    assert_eq!(config.key_len, None);

    let mut out = Vec::new();
    assert_eq!(generate_records(&config, &mut out).unwrap(), 40);
    let text = String::from_utf8(out).unwrap();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(';').collect();
        assert_eq!(fields.len(), 11);
        assert!(matches!(fields[10], "0" | "1"));
    }
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(GeneratorConfig::load(Some(&missing)).is_err());
}

#[test]
fn generated_file_can_be_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let generated = dir.path().join("records.csv");

    let config = GeneratorConfig {
        num_samples: 30,
        seed: Some(5),
        ..Default::default()
    };
    let mut file = File::create(&generated).unwrap();
    generate_records(&config, &mut file).unwrap();
    drop(file);

    // weight, activity and education are integer columns after generation
    let columns: Vec<NoiseColumn> = ["2:0.5", "7:0.5"]
        .iter()
        .map(|c| c.parse().unwrap())
        .collect();
    let mut injector = NoiseInjector::new(seeded(6));
    let mut noisy = Vec::new();
    let rewritten = add_column_noise(
        File::open(&generated).unwrap(),
        &mut noisy,
        &columns,
        b',',
        &mut injector,
    )
    .unwrap();
    assert_eq!(rewritten, 30);

    let original = fs::read_to_string(&generated).unwrap();
    let noisy = String::from_utf8(noisy).unwrap();
    for (before, after) in original.lines().zip(noisy.lines()) {
        let before: Vec<&str> = before.split(',').collect();
        let after: Vec<&str> = after.split(',').collect();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0], after[0]);
        assert_eq!(before[10], after[10]);
        let w0: i64 = before[2].parse().unwrap();
        let w1: i64 = after[2].parse().unwrap();
        assert!((w0 - w1).abs() <= 1);
    }

    let mut rng = seeded(7);
    let mut extended = Vec::new();
    append_spurious_features(noisy.as_bytes(), &mut extended, b',', &mut rng).unwrap();
    let extended = String::from_utf8(extended).unwrap();
    for (before, after) in noisy.lines().zip(extended.lines()) {
        let before: Vec<&str> = before.split(',').collect();
        let after: Vec<&str> = after.split(',').collect();
        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(after.last(), before.last());
    }
}

#[test]
fn keyed_records_expand_to_indicators() {
    let config = GeneratorConfig {
        num_samples: 50,
        seed: Some(8),
        key_len: Some(5),
        ..Default::default()
    };
    let mut generated = Vec::new();
    generate_records(&config, &mut generated).unwrap();

    let (row_len, columns) = record_layout(true);
    let mut encoded = Vec::new();
    let n = expand_dummy_vars(generated.as_slice(), &mut encoded, row_len, &columns, b',').unwrap();
    assert_eq!(n, 50);

    // sex 2, smoker 3, diet 3 and ethnicity 4 indicators replace 4 columns
    let widened = row_len - columns.len() + 2 + 3 + 3 + 4;
    let generated = String::from_utf8(generated).unwrap();
    let encoded = String::from_utf8(encoded).unwrap();
    for (before, after) in generated.lines().zip(encoded.lines()) {
        let before: Vec<&str> = before.split(',').collect();
        let after: Vec<&str> = after.split(',').collect();
        assert_eq!(after.len(), widened);
        assert_eq!(after[0], before[0]);
        assert_eq!(after.last(), before.last());

        // sex indicators sit right after the id
        let male = before[1] == "M";
        assert_eq!(after[1], if male { "1" } else { "0" });
        assert_eq!(after[2], if male { "0" } else { "1" });

        // each categorical group holds exactly one set indicator
        for group in [1..3, 7..10, 10..13, 15..19] {
            let set = after[group].iter().filter(|f| **f == "1").count();
            assert_eq!(set, 1);
        }
    }

    // Unkeyed layout does not match keyed records
    let (unkeyed_len, unkeyed) = record_layout(false);
    assert!(expand_dummy_vars(
        generated.as_bytes(),
        Vec::new(),
        unkeyed_len,
        &unkeyed,
        b','
    )
    .is_err());
}
