//! Integration tests for the preparation pipeline
//!
//! Tests the complete data flow from JSON ingest through resampling,
//! windowing, aggregation and normalization.

mod common;

use echoguard_core::{
    parse_batch, prepare_dataset, Aggregator, CancellationToken, FixedTime, Label, Normalizer,
    PipelineConfig, PipelineError, Resampler, Windower,
};

use common::generators::{DeviceProfile, TelemetryGenerator};
use common::{assert_max_labels, assert_one_row_per_bin, START};

const MINUTE: i64 = 60_000;

#[test]
fn test_failure_scenario_windows() {
    let profile = DeviceProfile::failing("pump_17", START);
    let failure = START + profile.failure_at_ms.unwrap();
    let readings = TelemetryGenerator::new(17).generate(&profile);

    let config = PipelineConfig::default();
    let series = Resampler::new(&config).resample(&readings).unwrap();
    let set = Windower::new(&config).extract(&series);

    // ~45 s sampling with small gaps: interpolation leaves every window complete
    assert!(series.len() >= 115);
    assert!(!set.windows.is_empty());
    assert_eq!(set.discarded, 0);
    assert_max_labels(&series, &set.windows);

    // A failure-labeled bin sits at the failure time
    let failure_bin = series
        .bins
        .iter()
        .find(|b| b.label == Label::Failure)
        .expect("failure bin");
    assert!((failure_bin.start - failure).abs() <= MINUTE);
    assert!(set.windows.iter().any(|w| w.label == Label::Failure));

    let end_of = |w: &echoguard_core::Window| w.start + (w.rows.len() as i64 - 1) * MINUTE;

    // Windows ending inside the ramp are PreFailure
    let ramp: Vec<_> = set
        .windows
        .iter()
        .filter(|w| {
            let end = end_of(w);
            end >= failure - 28 * MINUTE && end <= failure - 3 * MINUTE
        })
        .collect();
    assert!(!ramp.is_empty());
    assert!(ramp.iter().all(|w| w.label == Label::PreFailure));

    // Windows ending before the ramp are Normal
    assert!(set
        .windows
        .iter()
        .filter(|w| end_of(w) < failure - 32 * MINUTE)
        .all(|w| w.label == Label::Normal));

    // Windows covering the failure bin are Failure
    assert!(set
        .windows
        .iter()
        .filter(|w| w.start <= failure_bin.start && end_of(w) >= failure_bin.start)
        .all(|w| w.label == Label::Failure));
}

#[test]
fn test_aggregates_one_row_per_bin() {
    let mut generator = TelemetryGenerator::new(3);
    for seed_profile in [
        DeviceProfile::healthy("fan_1", START),
        DeviceProfile::failing("pump_2", START + 7 * MINUTE),
        DeviceProfile {
            duration_ms: 20 * MINUTE,
            ..DeviceProfile::healthy("fan_short", START)
        },
    ] {
        let readings = generator.generate(&seed_profile);
        let series = Resampler::default().resample(&readings).unwrap();
        let rows = Aggregator::new(60).aggregate(&series);
        assert_one_row_per_bin(&series, &rows);

        // Rows before 30 populated bins carry no statistics
        assert!(rows.iter().take(29).all(|r| r.feature_vector().iter().all(Option::is_none)));
        if rows.len() > 30 {
            assert!(rows[30..].iter().all(|r| r.feature_vector().iter().all(Option::is_some)));
        }
    }
}

#[test]
fn test_short_device_yields_no_windows() {
    let profile = DeviceProfile {
        duration_ms: 30 * MINUTE,
        ..DeviceProfile::healthy("fan_short", START)
    };
    let readings = TelemetryGenerator::new(5).generate(&profile);
    let series = Resampler::default().resample(&readings).unwrap();
    let set = Windower::default().extract(&series);

    assert!(series.len() < 60);
    assert!(set.windows.is_empty());
    assert_eq!(set.discarded, 0);
}

#[test]
fn test_prepare_fleet_end_to_end() {
    let mut generator = TelemetryGenerator::new(99);
    let readings = generator.fleet(&[
        DeviceProfile::failing("pump_a", START),
        DeviceProfile::healthy("pump_b", START),
    ]);

    let dataset =
        prepare_dataset(&readings, &PipelineConfig::default(), &CancellationToken::new()).unwrap();

    assert_eq!(dataset.report.devices, 2);
    assert_eq!(dataset.windows.len(), dataset.report.kept_windows);
    assert_eq!(dataset.windows.labels.len(), dataset.windows.len());
    assert_eq!(dataset.aggregates.len(), dataset.report.bins);
    assert!(dataset.windows.labels.contains(&Label::Failure));
    assert!(dataset.windows.labels.contains(&Label::PreFailure));
    assert!(dataset
        .windows
        .windows
        .iter()
        .flatten()
        .flatten()
        .all(|v| v.is_finite()));

    // The frozen state reproduces the prepared values exactly
    let normalizer = Normalizer::from_state(dataset.state.clone());
    let again = prepare_dataset(&readings, &PipelineConfig::default(), &CancellationToken::new())
        .unwrap();
    assert_eq!(again.state, dataset.state);
    assert_eq!(again.windows, dataset.windows);
    assert!(normalizer.is_fitted());
}

#[test]
fn test_json_ingest_to_series() {
    let json = r#"[
        {"device_id": "cmp_9", "device_type": "compressor", "timestamp": "2024-03-01T12:00:10Z",
         "temperature": 70.0, "vibration": 0.4, "rpm": 2000.0, "humidity": 35.0},
        {"device_id": "cmp_9", "device_type": "compressor", "timestamp": "2024-03-01T12:00:50Z",
         "temperature": 72.0, "vibration": null, "rpm": 2010.0, "humidity": 36.0, "label": 1},
        {"device_id": "cmp_9", "device_type": "compressor",
         "temperature": 71.0, "rpm": 2005.0}
    ]"#;
    let clock = FixedTime::new(START + 2 * MINUTE + 30_000);
    let readings = parse_batch(json, &clock).unwrap();
    let series = Resampler::default().resample(&readings).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.bins[0].values[0], Some(71.0));
    assert_eq!(series.bins[0].values[1], Some(0.4));
    assert_eq!(series.bins[0].label, Label::PreFailure);
    // Empty middle bin interpolated from both neighbors
    assert_eq!(series.bins[1].values[2], Some(2005.0));
    assert_eq!(series.bins[2].start, START + 2 * MINUTE);
}

#[test]
fn test_stray_timestamp_rejected_before_binning() {
    // Epoch seconds, epoch millis, then one reading stamped in year 9999
    let json = r#"[
        {"device_id": "fan_3", "device_type": "fan", "timestamp": 1709294400, "rpm": 900.0},
        {"device_id": "fan_3", "device_type": "fan", "timestamp": 1709294460000, "rpm": 905.0},
        {"device_id": "fan_3", "device_type": "fan", "timestamp": 253402300799000, "rpm": 910.0}
    ]"#;
    let readings = parse_batch(json, &FixedTime::new(0)).unwrap();
    assert_eq!(readings[0].timestamp, START);
    assert_eq!(readings[1].timestamp, START + MINUTE);

    let err = prepare_dataset(&readings, &PipelineConfig::default(), &CancellationToken::new())
        .unwrap_err();
    match err {
        PipelineError::SeriesTooLong { device_id, max_bins, .. } => {
            assert_eq!(device_id, "fan_3");
            assert_eq!(max_bins, 1_000_000);
        }
        other => panic!("unexpected: {:?}", other),
    }

    let series = Resampler::default().resample(&readings[..2]).unwrap();
    assert_eq!(series.len(), 2);
}

#[test]
fn test_cancelled_job() {
    let readings = TelemetryGenerator::new(1).generate(&DeviceProfile::healthy("p", START));
    let token = CancellationToken::new();
    let handle = token.clone();
    handle.cancel();
    assert_eq!(
        prepare_dataset(&readings, &PipelineConfig::default(), &token),
        Err(PipelineError::Cancelled)
    );
}
