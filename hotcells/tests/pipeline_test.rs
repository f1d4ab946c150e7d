// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use googletest::prelude::*;
use hotcells::error::Error;
use hotcells::error::ErrorKind;
use hotcells::geocode::Offline;
use hotcells::pipeline::Ingesting;
use hotcells::pipeline::Lookup;
use hotcells::pipeline::Pipeline;
use hotcells::pipeline::PipelineConfig;
use hotcells::pipeline::RankedPlace;
use hotcells::pipeline::RunObserver;
use hotcells::pipeline::RunSummary;
use hotcells::sample::LocationSample;
use hotcells::spatial::Coordinate;
use hotcells::spatial::SpatialIndexer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const CITIES: [(f64, f64); 10] = [
    (48.8566, 2.3522),    // Paris
    (51.5074, -0.1278),   // London
    (40.7128, -74.0060),  // New York
    (35.6762, 139.6503),  // Tokyo
    (-33.8688, 151.2093), // Sydney
    (55.7558, 37.6173),   // Moscow
    (-23.5505, -46.6333), // São Paulo
    (19.4326, -99.1332),  // Mexico City
    (1.3521, 103.8198),   // Singapore
    (30.0444, 31.2357),   // Cairo
];

/// 1000 samples over the ten cities; city `i` is visited `55 + 10 * i` times.
fn city_samples(seed: u64) -> Vec<LocationSample> {
    let mut samples = Vec::with_capacity(1_000);
    for (i, (lat, lon)) in CITIES.iter().enumerate() {
        for _ in 0..55 + 10 * i {
            samples.push(LocationSample::new(*lat, *lon));
        }
    }
    samples.shuffle(&mut StdRng::seed_from_u64(seed));
    samples
}

fn city_names(at: Coordinate) -> std::result::Result<Vec<String>, Error> {
    Ok(vec![format!("city at {:.0},{:.0}", at.latitude, at.longitude)])
}

#[derive(Default)]
struct Recorder {
    skipped: Mutex<Vec<u64>>,
    summaries: Mutex<Vec<RunSummary>>,
    failed: Mutex<Vec<usize>>,
    reported: Mutex<Vec<usize>>,
}

impl RunObserver for Recorder {
    fn sample_skipped(&self, position: u64, error: &Error) {
        assert_eq!(error.kind(), ErrorKind::InvalidCoordinate);
        self.skipped.lock().unwrap().push(position);
    }

    fn ingestion_finished(&self, summary: &RunSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }

    fn lookup_failed(&self, place: &RankedPlace, error: &Error) {
        assert_eq!(error.kind(), ErrorKind::ExternalLookupFailure);
        self.failed.lock().unwrap().push(place.rank());
    }

    fn place_reported(&self, place: &RankedPlace) {
        self.reported.lock().unwrap().push(place.rank());
    }
}

#[test]
fn test_capacity_covering_all_cells_is_exact() {
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(5)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, city_names, ());
    let report = pipeline.run(city_samples(11)).unwrap();

    let summary = report.summary();
    assert_that!(summary.total_samples(), eq(1_000));
    assert_that!(summary.skipped_samples(), eq(0));
    assert_eq!(summary.distinct_cells(), Some(10));
    assert_that!(summary.tracked_cells(), eq(10));
    // Full sketch: any untracked cell is bounded by the smallest counter.
    assert_that!(summary.maximum_error(), eq(55));

    let indexer = SpatialIndexer::new(9).unwrap();
    let places = report.places();
    assert_that!(places.len(), eq(5));
    for (position, place) in places.iter().enumerate() {
        let city = 9 - position;
        let (lat, lon) = CITIES[city];
        assert_that!(place.rank(), eq(position + 1));
        assert_eq!(place.cell(), indexer.index(lat, lon).unwrap());
        assert_that!(place.estimate(), eq(55 + 10 * city as u64));
        assert_that!(place.error(), eq(0));
        assert!(!place.lookup_failed());
        assert_that!(place.address(), starts_with("city at "));
    }
}

#[test]
fn test_invalid_sample_is_skipped() {
    let config = PipelineConfig::builder().capacity(4).top_k(4).build().unwrap();
    let clean = vec![
        LocationSample::new(CITIES[0].0, CITIES[0].1),
        LocationSample::new(CITIES[1].0, CITIES[1].1),
        LocationSample::new(CITIES[0].0, CITIES[0].1),
    ];
    let mut dirty = clean.clone();
    dirty.insert(1, LocationSample::new(f64::NAN, CITIES[2].1));

    let baseline = Pipeline::new(config.clone(), Offline, ())
        .run(clean)
        .unwrap();
    let pipeline = Pipeline::new(config, Offline, Recorder::default());
    let report = pipeline.run(dirty).unwrap();

    assert_that!(report.summary().skipped_samples(), eq(1));
    assert_that!(report.summary().total_samples(), eq(4));
    assert_that!(report.summary().indexed_samples(), eq(3));
    assert_eq!(
        report.summary().distinct_cells(),
        baseline.summary().distinct_cells()
    );
    assert_that!(
        report.summary().tracked_cells(),
        eq(baseline.summary().tracked_cells())
    );
    assert_eq!(report.places(), baseline.places());
    assert_eq!(*pipeline.observer().skipped.lock().unwrap(), vec![2]);
}

#[test]
fn test_lookup_failure_blanks_only_that_place() {
    let geocoder = |at: Coordinate| -> std::result::Result<Vec<String>, Error> {
        if at.longitude > 100.0 {
            Err(Error::lookup_failed("quota exceeded"))
        } else if at.latitude < 0.0 {
            Ok(Vec::new())
        } else {
            city_names(at)
        }
    };
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(10)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, geocoder, Recorder::default());
    let report = pipeline.run(city_samples(5)).unwrap();

    assert_that!(report.places().len(), eq(10));
    // Tokyo, Sydney and Singapore are east of 100°E.
    assert_that!(report.failed_lookups(), eq(3));
    for place in report.places() {
        let centroid = place.centroid();
        if centroid.longitude > 100.0 {
            assert!(place.lookup_failed());
            assert_eq!(place.address(), "");
            assert!(matches!(place.lookup(), Lookup::Failed(reason) if reason.contains("quota")));
        } else if centroid.latitude < 0.0 {
            assert!(!place.lookup_failed());
            assert_eq!(place.lookup(), &Lookup::NoMatch);
            assert_eq!(place.address(), "");
        } else {
            assert!(matches!(place.lookup(), Lookup::Resolved(_)));
        }
    }

    let observer = pipeline.observer();
    assert_that!(observer.failed.lock().unwrap().len(), eq(3));
    assert_eq!(
        *observer.reported.lock().unwrap(),
        (1..=10).collect::<Vec<_>>()
    );
    assert_that!(observer.summaries.lock().unwrap().len(), eq(1));
}

#[test]
fn test_slow_lookup_times_out() {
    let geocoder = |at: Coordinate| -> std::result::Result<Vec<String>, Error> {
        if at.latitude < -30.0 {
            thread::sleep(Duration::from_secs(2));
        }
        city_names(at)
    };
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(10)
        .lookup_workers(3)
        .lookup_timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();
    let report = Pipeline::new(config, geocoder, ())
        .run(city_samples(9))
        .unwrap();

    let sydney = SpatialIndexer::new(9)
        .unwrap()
        .index(CITIES[4].0, CITIES[4].1)
        .unwrap();
    for place in report.places() {
        if place.cell() == sydney {
            assert_eq!(place.lookup(), &Lookup::TimedOut);
            assert_eq!(place.address(), "");
            assert_that!(place.to_string(), ends_with("[lookup timed out]"));
        } else {
            assert!(!place.lookup_failed(), "{place}");
        }
    }
    assert_that!(report.failed_lookups(), eq(1));
}

#[test]
fn test_shared_geocoder_is_called_once_per_place() {
    struct Counting(Mutex<usize>);

    impl hotcells::geocode::ReverseGeocoder for Counting {
        fn reverse_geocode(&self, _at: Coordinate) -> std::result::Result<Vec<String>, Error> {
            *self.0.lock().unwrap() += 1;
            Ok(vec!["somewhere".to_string()])
        }
    }

    let geocoder = Arc::new(Counting(Mutex::new(0)));
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(7)
        .lookup_timeout(None)
        .build()
        .unwrap();
    let pipeline = Pipeline::with_shared_geocoder(config, Arc::clone(&geocoder), ());
    let report = pipeline.run(city_samples(1)).unwrap();

    assert_that!(report.places().len(), eq(7));
    assert_that!(*geocoder.0.lock().unwrap(), eq(7));
}

#[test]
fn test_top_k_is_bounded_by_capacity() {
    let config = PipelineConfig::builder()
        .capacity(3)
        .top_k(50)
        .build()
        .unwrap();
    let report = Pipeline::new(config, Offline, ())
        .run(city_samples(2))
        .unwrap();
    assert_that!(report.places().len(), eq(3));
    assert_that!(report.summary().tracked_cells(), eq(3));
    assert_eq!(report.summary().distinct_cells(), Some(10));

    // Counters of a full sketch sum to the stream length.
    assert_that!(report.places()[0].estimate(), ge(145));
}

#[test]
fn test_exact_tally_can_be_disabled() {
    let config = PipelineConfig::builder()
        .capacity(10)
        .exact_tally(false)
        .build()
        .unwrap();
    let report = Pipeline::new(config, Offline, ())
        .run(city_samples(3))
        .unwrap();
    assert_eq!(report.summary().distinct_cells(), None);
    assert_eq!(report.summary().compression_ratio(), None);
    assert_that!(report.places().len(), eq(10));
}

#[test]
fn test_summary_display() {
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(3)
        .build()
        .unwrap();
    let report = Pipeline::new(config, Offline, ())
        .run(city_samples(4))
        .unwrap();

    assert_eq!(report.summary().compression_ratio(), Some(0.01));
    insta::assert_snapshot!(
        report.summary().to_string(),
        @"samples: 1000 read, 0 skipped; distinct cells: 10; compression: 99%; tracked cells: 10, max error: 55"
    );
}

#[test]
fn test_sharded_run_matches_sequential_when_exact() {
    let samples = city_samples(8);
    let shards: Vec<Vec<LocationSample>> = samples.chunks(300).map(<[_]>::to_vec).collect();
    assert_that!(shards.len(), eq(4));

    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(10)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, Offline, Recorder::default());
    let sharded = pipeline.run_sharded(shards).unwrap();
    let sequential = pipeline.run(samples).unwrap();

    assert_eq!(sharded.summary(), sequential.summary());
    assert_eq!(sharded.places(), sequential.places());
}

#[test]
fn test_sharded_run_with_eviction_never_underestimates() {
    let samples = city_samples(21);
    let shards: Vec<Vec<LocationSample>> = samples.chunks(250).map(<[_]>::to_vec).collect();

    let config = PipelineConfig::builder()
        .capacity(4)
        .top_k(4)
        .build()
        .unwrap();
    let report = Pipeline::new(config, Offline, ())
        .run_sharded(shards)
        .unwrap();

    let indexer = SpatialIndexer::new(9).unwrap();
    assert_that!(report.places().len(), eq(4));
    for place in report.places() {
        let city = CITIES
            .iter()
            .position(|(lat, lon)| indexer.index(*lat, *lon).unwrap() == place.cell())
            .unwrap();
        let truth = 55 + 10 * city as u64;
        assert_that!(place.estimate(), ge(truth));
        assert_that!(place.estimate() - place.error(), le(truth));
    }
}

#[test]
fn test_stages_by_hand() {
    let config = PipelineConfig::builder().capacity(2).build().unwrap();
    let mut ingesting = Ingesting::new(&config).unwrap();
    for (lat, lon) in [CITIES[0], CITIES[0], CITIES[0], CITIES[1], CITIES[2]] {
        ingesting.ingest(&LocationSample::new(lat, lon)).unwrap();
    }
    let err = ingesting
        .ingest(&LocationSample::new(0.0, f64::INFINITY))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinate);
    assert_that!(ingesting.sketch().size(), eq(2));
    assert_that!(ingesting.tally().unwrap().distinct(), eq(3));

    let ranking = ingesting.finish();
    assert_that!(ranking.summary().skipped_samples(), eq(1));
    let reporting = ranking.rank(2);
    let rows = reporting.rows();
    assert_that!(rows[0].estimate(), eq(3));
    assert_that!(rows[1].estimate(), eq(2));
    assert_that!(rows[1].error(), eq(1));

    let report = reporting.report(&Arc::new(Offline), 2, None, &());
    assert_that!(report.places().len(), eq(2));
    assert_eq!(report.places()[0].lookup(), &Lookup::NoMatch);
}

#[test]
fn test_config_validation() {
    let err = PipelineConfig::builder().capacity(0).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCapacity);

    let err = PipelineConfig::builder().resolution(16).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = PipelineConfig::builder().top_k(0).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = PipelineConfig::builder()
        .lookup_workers(0)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let config = PipelineConfig::default();
    assert_that!(config.resolution(), eq(9));
    assert_that!(config.capacity(), eq(50));
    assert_that!(config.top_k(), eq(50));
}

/// A geocoder that sleeps on every call and records the peak number of
/// concurrent calls.
fn slow_geocoder(
    delay: Duration,
) -> (
    Arc<AtomicUsize>,
    impl Fn(Coordinate) -> std::result::Result<Vec<String>, Error> + Send + Sync + 'static,
) {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&peak);
    let geocoder = move |at: Coordinate| {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(delay);
        running.fetch_sub(1, Ordering::SeqCst);
        city_names(at)
    };
    (observed, geocoder)
}

#[test]
fn test_abandoned_lookups_count_against_worker_limit() {
    let (peak, geocoder) = slow_geocoder(Duration::from_millis(200));
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(8)
        .lookup_workers(2)
        .lookup_timeout(Some(Duration::from_millis(20)))
        .build()
        .unwrap();
    let report = Pipeline::new(config, geocoder, ())
        .run(city_samples(6))
        .unwrap();

    assert_that!(report.places().len(), eq(8));
    assert_that!(report.failed_lookups(), eq(8));
    for place in report.places() {
        assert_eq!(place.lookup(), &Lookup::TimedOut);
    }
    // Let abandoned calls drain before reading the peak.
    thread::sleep(Duration::from_millis(500));
    assert_that!(peak.load(Ordering::SeqCst), le(2));
}

#[test]
fn test_lookups_without_timeout_respect_worker_limit() {
    let (peak, geocoder) = slow_geocoder(Duration::from_millis(20));
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(10)
        .lookup_workers(3)
        .lookup_timeout(None)
        .build()
        .unwrap();
    let report = Pipeline::new(config, geocoder, ())
        .run(city_samples(7))
        .unwrap();

    assert_that!(report.failed_lookups(), eq(0));
    assert_that!(peak.load(Ordering::SeqCst), le(3));
    assert_that!(peak.load(Ordering::SeqCst), ge(1));
}

#[test]
fn test_panicking_geocoder_fails_only_that_place() {
    // Only Moscow lies north of 53°.
    let geocoder = |at: Coordinate| -> std::result::Result<Vec<String>, Error> {
        if at.latitude > 53.0 {
            panic!("geocoder bug");
        }
        city_names(at)
    };

    let mut reports = Vec::new();
    for timeout in [None, Some(Duration::from_secs(5))] {
        let config = PipelineConfig::builder()
            .capacity(10)
            .top_k(10)
            .lookup_timeout(timeout)
            .build()
            .unwrap();
        let report = Pipeline::new(config, geocoder, ())
            .run(city_samples(12))
            .unwrap();
        assert_that!(report.failed_lookups(), eq(1));

        let moscow = SpatialIndexer::new(9)
            .unwrap()
            .index(CITIES[5].0, CITIES[5].1)
            .unwrap();
        for place in report.places() {
            if place.cell() == moscow {
                assert!(
                    matches!(place.lookup(), Lookup::Failed(reason) if reason.contains("panicked"))
                );
            } else {
                assert!(matches!(place.lookup(), Lookup::Resolved(_)));
            }
        }
        reports.push(report);
    }
    assert_eq!(reports[0], reports[1]);
}

#[test]
fn test_geocoder_error_context_does_not_fake_timeout() {
    let geocoder = |_: Coordinate| -> std::result::Result<Vec<String>, Error> {
        Err(Error::lookup_failed("busy").with_context("timeout_ms", 5))
    };
    let config = PipelineConfig::builder()
        .capacity(10)
        .top_k(3)
        .build()
        .unwrap();
    let report = Pipeline::new(config, geocoder, ())
        .run(city_samples(13))
        .unwrap();

    assert_that!(report.failed_lookups(), eq(3));
    for place in report.places() {
        assert!(matches!(place.lookup(), Lookup::Failed(reason) if reason.contains("busy")));
    }
}

#[test]
fn test_sharded_skip_positions_count_per_shard() {
    let good = LocationSample::new(CITIES[0].0, CITIES[0].1);
    let bad = LocationSample::new(f64::NAN, 0.0);
    let shards = vec![
        vec![good.clone(), bad.clone(), good.clone()],
        vec![bad, good],
    ];

    let config = PipelineConfig::builder().capacity(4).build().unwrap();
    let pipeline = Pipeline::new(config, Offline, Recorder::default());
    let report = pipeline.run_sharded(shards).unwrap();

    assert_that!(report.summary().total_samples(), eq(5));
    assert_that!(report.summary().skipped_samples(), eq(2));
    let mut positions = pipeline.observer().skipped.lock().unwrap().clone();
    positions.sort_unstable();
    assert_eq!(positions, vec![1, 2]);
}

#[test]
fn test_pipeline_debug_shows_config() {
    let config = PipelineConfig::builder().capacity(12).build().unwrap();
    let pipeline = Pipeline::new(config, Offline, ());
    let debug = format!("{pipeline:?}");
    assert_that!(debug, starts_with("Pipeline"));
    assert_that!(debug, contains_substring("capacity: 12"));
}
