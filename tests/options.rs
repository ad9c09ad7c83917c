use audio_cleanup_core::{
    options::{
        validate_cutoff_hz, validate_duration_ms, validate_silence_thresh_db, validate_strength,
        validate_target_dbfs, DEFAULT_HPF_CUTOFF_HZ, DEFAULT_NOISE_REDUCTION_STRENGTH,
        DEFAULT_NORMALIZATION_TARGET_DBFS, DEFAULT_SILENCE_THRESH_DB,
        DEFAULT_TRIM_MIN_SILENCE_MS,
    },
    CleanupError, CleanupOptions, HighPassParams, NoiseReduceParams, NormalizeParams,
    PipelineStep, RawParam, TrimSilenceParams,
};
use serde_json::json;

#[test]
fn strength_outside_unit_interval_falls_back() {
    assert_eq!(validate_strength(0.5).value, 0.5);
    assert!(validate_strength(0.5).note.is_none());
    assert_eq!(validate_strength(1.0).value, 1.0);

    for bad in [0.0, -0.2, 1.5] {
        let v = validate_strength(bad);
        assert_eq!(v.value, DEFAULT_NOISE_REDUCTION_STRENGTH);
        assert!(v.note.is_some());
    }
    assert_eq!(
        validate_strength(RawParam::Invalid).value,
        DEFAULT_NOISE_REDUCTION_STRENGTH
    );
}

#[test]
fn cutoff_and_target_validation() {
    assert_eq!(validate_cutoff_hz(120.0).value, 120.0);
    assert_eq!(validate_cutoff_hz(-5.0).value, DEFAULT_HPF_CUTOFF_HZ);
    assert_eq!(validate_cutoff_hz(0.0).value, DEFAULT_HPF_CUTOFF_HZ);

    assert_eq!(validate_target_dbfs(-20.0).value, -20.0);
    assert_eq!(validate_target_dbfs(0.0).value, 0.0);
    let v = validate_target_dbfs(3.0);
    assert_eq!(v.value, DEFAULT_NORMALIZATION_TARGET_DBFS);
    assert!(v.note.is_some());
}

#[test]
fn trim_fields_validate_independently() {
    assert_eq!(validate_duration_ms(1500.7, 10).value, 1500);
    assert_eq!(validate_duration_ms(-1.0, 10).value, 10);
    assert_eq!(validate_duration_ms(RawParam::Missing, 10).value, 10);
    assert!(validate_duration_ms(RawParam::Missing, 10).note.is_none());

    assert_eq!(validate_silence_thresh_db(-55.0).value, -55.0);
    // Any number is accepted, even a positive one.
    assert_eq!(validate_silence_thresh_db(3.0).value, 3.0);
    assert_eq!(
        validate_silence_thresh_db(RawParam::Invalid).value,
        DEFAULT_SILENCE_THRESH_DB
    );
}

#[test]
fn parses_option_bag() {
    let opts = CleanupOptions::from_value(&json!({
        "noise_reduce": {"enabled": true, "strength": 0.5},
        "high_pass": {"enabled": false, "cutoff_hz": 200},
        "normalize": {"enabled": true, "target_dbfs": -20},
        "trim_silence": {
            "enabled": true,
            "min_silence_ms": 2000,
            "silence_thresh_db": -50,
            "chunk_min_duration_ms": 250,
            "insert_ms": 750
        }
    }));

    assert_eq!(opts.noise_reduce, Some(NoiseReduceParams { strength: 0.5 }));
    assert_eq!(opts.high_pass, None);
    assert_eq!(opts.normalize, Some(NormalizeParams { target_dbfs: -20.0 }));
    assert_eq!(
        opts.trim_silence,
        Some(TrimSilenceParams {
            min_silence_ms: 2000,
            silence_thresh_db: -50.0,
            chunk_min_duration_ms: 250,
            insert_silence_ms: 750,
        })
    );
}

#[test]
fn insert_silence_alias_is_accepted() {
    let opts = CleanupOptions::from_value(&json!({
        "trim_silence": {"enabled": true, "insert_silence_ms": 1200}
    }));
    let trim = opts.trim_silence.unwrap();
    assert_eq!(trim.insert_silence_ms, 1200);
    assert_eq!(trim.min_silence_ms, DEFAULT_TRIM_MIN_SILENCE_MS);
}

#[test]
fn malformed_entries_disable_their_step() {
    let opts = CleanupOptions::from_value(&json!({
        "noise_reduce": {"enabled": "yes", "strength": 0.5},
        "high_pass": true,
        "normalize": {"target_dbfs": -20},
        "trim_silence": {"enabled": true, "min_silence_ms": "long"},
        "reverb": {"enabled": true}
    }));
    assert_eq!(opts.noise_reduce, None);
    assert_eq!(opts.high_pass, None);
    assert_eq!(opts.normalize, None);
    assert_eq!(
        opts.trim_silence.unwrap().min_silence_ms,
        DEFAULT_TRIM_MIN_SILENCE_MS
    );
}

#[test]
fn bad_parameter_falls_back_to_default() {
    let opts = CleanupOptions::from_value(&json!({
        "noise_reduce": {"enabled": true, "strength": 2.0},
        "high_pass": {"enabled": true, "cutoff_hz": "low"}
    }));
    assert_eq!(opts.noise_reduce, Some(NoiseReduceParams::default()));
    assert_eq!(opts.high_pass, Some(HighPassParams::default()));
}

#[test]
fn json_must_be_an_object() {
    assert!(matches!(
        CleanupOptions::from_json_str("[1, 2, 3]"),
        Err(CleanupError::Options(_))
    ));
    assert!(matches!(
        CleanupOptions::from_json_str("{not json"),
        Err(CleanupError::Options(_))
    ));
    let empty = CleanupOptions::from_json_str("{}").unwrap();
    assert!(empty.steps().is_empty());
}

#[test]
fn steps_run_in_fixed_order() {
    let opts = CleanupOptions::builder()
        .normalize(-18.0)
        .min_silence_ms(1000.0)
        .noise_reduce(0.9)
        .build();

    let keys: Vec<_> = opts.steps().iter().map(PipelineStep::key).collect();
    assert_eq!(keys, vec!["noise_reduce", "normalize", "trim_silence"]);

    let all: Vec<_> = CleanupOptions::all_defaults()
        .steps()
        .iter()
        .map(PipelineStep::status)
        .collect();
    assert_eq!(
        all,
        vec![
            "Applying Noise Reduction...",
            "Applying High-Pass Filter...",
            "Normalizing Volume...",
            "Trimming Silences...",
        ]
    );
}

#[test]
fn option_bag_survives_to_value() {
    let opts = CleanupOptions::builder()
        .high_pass(150.0)
        .insert_silence_ms(250.0)
        .build();
    let value = opts.to_value();
    assert_eq!(value["noise_reduce"]["enabled"], json!(false));
    assert_eq!(value["trim_silence"]["insert_ms"], json!(250));
    assert_eq!(CleanupOptions::from_value(&value), opts);
}
