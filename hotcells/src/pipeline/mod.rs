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

//! Aggregation pipeline from location samples to a ranked list of places.
//!
//! # Overview
//!
//! A run moves strictly forward through three stages, each consumed by the
//! transition to the next:
//!
//! 1. [`Ingesting`] maps every sample to a [`SpatialCell`] and feeds it to a
//!    [`TopKSketch`] (and optionally an [`ExactTally`]). Samples with invalid
//!    coordinates are counted and skipped.
//! 2. [`Ranking`] holds the final sketch and selects the top `K` cells.
//! 3. [`Reporting`] reverse geocodes the ranked centroids on a bounded worker
//!    pool and produces the [`Report`]. A failed or timed out lookup leaves
//!    that place without an address.
//!
//! [`Pipeline`] drives all three stages and reports progress to a
//! [`RunObserver`].
//!
//! # Examples
//!
//! ```
//! # use hotcells::geocode::Offline;
//! # use hotcells::pipeline::Pipeline;
//! # use hotcells::pipeline::PipelineConfig;
//! # use hotcells::sample::LocationSample;
//! let config = PipelineConfig::builder().capacity(16).top_k(2).build().unwrap();
//! let pipeline = Pipeline::new(config, Offline, ());
//!
//! let mut samples = vec![LocationSample::new(52.37, 4.89); 3];
//! samples.push(LocationSample::new(40.71, -74.00));
//! samples.push(LocationSample::new(f64::NAN, 0.0));
//!
//! let report = pipeline.run(samples).unwrap();
//! assert_eq!(report.summary().skipped_samples(), 1);
//! assert_eq!(report.places()[0].estimate(), 3);
//! assert_eq!(report.places()[1].estimate(), 1);
//! ```

mod config;
mod lookup;
mod observer;
mod report;

pub use self::config::DEFAULT_CAPACITY;
pub use self::config::DEFAULT_LOOKUP_TIMEOUT;
pub use self::config::DEFAULT_LOOKUP_WORKERS;
pub use self::config::DEFAULT_RESOLUTION;
pub use self::config::DEFAULT_TOP_K;
pub use self::config::PipelineConfig;
pub use self::config::PipelineConfigBuilder;
pub use self::observer::RunObserver;
pub use self::observer::TracingObserver;
pub use self::report::Lookup;
pub use self::report::RankedPlace;
pub use self::report::Report;
pub use self::report::RunSummary;

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::Error;
use crate::geocode::ReverseGeocoder;
use crate::pipeline::lookup::LookupOutcome;
use crate::sample::LocationSample;
use crate::spatial::SpatialCell;
use crate::spatial::SpatialIndexer;
use crate::tally::ExactTally;
use crate::topk::Row;
use crate::topk::TopKSketch;

/// First stage: consuming the sample stream.
#[derive(Debug, Clone)]
pub struct Ingesting {
    indexer: SpatialIndexer,
    sketch: TopKSketch<SpatialCell>,
    tally: Option<ExactTally<SpatialCell>>,
    total_samples: u64,
    skipped_samples: u64,
}

impl Ingesting {
    /// Starts ingestion with an empty sketch sized by `config`.
    pub fn new(config: &PipelineConfig) -> Result<Self, Error> {
        Ok(Self {
            indexer: config.indexer(),
            sketch: TopKSketch::new(config.capacity())?,
            tally: config.exact_tally().then(ExactTally::new),
            total_samples: 0,
            skipped_samples: 0,
        })
    }

    /// Indexes `sample` and counts its cell.
    ///
    /// A sample with invalid coordinates is counted as skipped and its error
    /// returned; neither the sketch nor the tally sees it.
    pub fn ingest(&mut self, sample: &LocationSample) -> Result<SpatialCell, Error> {
        self.total_samples += 1;
        let cell = match self.indexer.index_sample(sample) {
            Ok(cell) => cell,
            Err(err) => {
                self.skipped_samples += 1;
                return Err(err);
            }
        };
        self.sketch.insert(cell);
        if let Some(tally) = &mut self.tally {
            tally.record(cell);
        }
        Ok(cell)
    }

    /// Returns the number of samples seen so far.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Returns the number of samples skipped so far.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped_samples
    }

    /// Returns the sketch as built so far.
    pub fn sketch(&self) -> &TopKSketch<SpatialCell> {
        &self.sketch
    }

    /// Returns the exact tally, if enabled.
    pub fn tally(&self) -> Option<&ExactTally<SpatialCell>> {
        self.tally.as_ref()
    }

    /// Returns the counters collected so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_samples: self.total_samples,
            skipped_samples: self.skipped_samples,
            distinct_cells: self.tally.as_ref().map(ExactTally::distinct),
            tracked_cells: self.sketch.size(),
            maximum_error: self.sketch.maximum_error(),
        }
    }

    /// Folds the state of another ingestion of the same run into this one.
    ///
    /// Used to combine shards ingested in parallel. The exact tally survives
    /// only if both sides kept one.
    pub fn absorb(&mut self, other: Ingesting) {
        self.sketch.merge(&other.sketch);
        self.tally = match (self.tally.take(), other.tally) {
            (Some(mut mine), Some(theirs)) => {
                mine.merge(theirs);
                Some(mine)
            }
            _ => None,
        };
        self.total_samples += other.total_samples;
        self.skipped_samples += other.skipped_samples;
    }

    /// Ends ingestion.
    pub fn finish(self) -> Ranking {
        Ranking {
            summary: self.summary(),
            sketch: self.sketch,
        }
    }
}

/// Second stage: the stream is exhausted and cells can be ranked.
#[derive(Debug, Clone)]
pub struct Ranking {
    summary: RunSummary,
    sketch: TopKSketch<SpatialCell>,
}

impl Ranking {
    /// Returns the ingestion summary.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Selects the `k` most visited cells.
    pub fn rank(self, k: usize) -> Reporting {
        Reporting {
            summary: self.summary,
            rows: self.sketch.query(k),
        }
    }
}

/// Third stage: ranked cells waiting for their addresses.
#[derive(Debug, Clone)]
pub struct Reporting {
    summary: RunSummary,
    rows: Vec<Row<SpatialCell>>,
}

impl Reporting {
    /// Returns the ingestion summary.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns the ranked cells, most visited first.
    pub fn rows(&self) -> &[Row<SpatialCell>] {
        &self.rows
    }

    /// Reverse geocodes every ranked centroid and assembles the report.
    ///
    /// At most `workers` calls are in flight at once, and a call taking longer
    /// than `timeout` is given up on.
    pub fn report<G, O>(
        self,
        geocoder: &Arc<G>,
        workers: usize,
        timeout: Option<Duration>,
        observer: &O,
    ) -> Report
    where
        G: ReverseGeocoder + ?Sized + 'static,
        O: RunObserver + ?Sized,
    {
        let centroids: Vec<_> = self.rows.iter().map(|row| row.item().centroid()).collect();
        let outcomes = lookup::resolve_all(geocoder, &centroids, workers, timeout);

        let places = self
            .rows
            .into_iter()
            .zip(centroids)
            .zip(outcomes)
            .enumerate()
            .map(|(position, ((row, centroid), outcome))| {
                let mut place = RankedPlace {
                    rank: position + 1,
                    cell: *row.item(),
                    centroid,
                    estimate: row.estimate(),
                    error: row.error(),
                    lookup: Lookup::NoMatch,
                };
                place.lookup = match outcome {
                    LookupOutcome::Answered(addresses) => match addresses.into_iter().next() {
                        Some(address) => Lookup::Resolved(address),
                        None => Lookup::NoMatch,
                    },
                    LookupOutcome::Failed(err) => {
                        observer.lookup_failed(&place, &err);
                        Lookup::Failed(err.to_string())
                    }
                    LookupOutcome::TimedOut(err) => {
                        observer.lookup_failed(&place, &err);
                        Lookup::TimedOut
                    }
                };
                observer.place_reported(&place);
                place
            })
            .collect();

        Report {
            summary: self.summary,
            places,
        }
    }
}

/// Runs samples through ingestion, ranking and reporting.
pub struct Pipeline<G: ?Sized, O = TracingObserver> {
    config: PipelineConfig,
    observer: O,
    geocoder: Arc<G>,
}

impl<G: ?Sized, O> fmt::Debug for Pipeline<G, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<G, O> Pipeline<G, O>
where
    G: ReverseGeocoder + 'static,
    O: RunObserver,
{
    /// Creates a pipeline.
    pub fn new(config: PipelineConfig, geocoder: G, observer: O) -> Self {
        Self::with_shared_geocoder(config, Arc::new(geocoder), observer)
    }
}

impl<G, O> Pipeline<G, O>
where
    G: ReverseGeocoder + ?Sized + 'static,
    O: RunObserver,
{
    /// Creates a pipeline around a geocoder shared with other owners.
    pub fn with_shared_geocoder(config: PipelineConfig, geocoder: Arc<G>, observer: O) -> Self {
        Self {
            config,
            observer,
            geocoder,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Processes a finite, single-pass stream of samples in order.
    ///
    /// # Errors
    ///
    /// Only configuration errors are returned. Invalid samples and failed
    /// lookups are recorded in the report instead.
    pub fn run<I>(&self, samples: I) -> Result<Report, Error>
    where
        I: IntoIterator<Item = LocationSample>,
    {
        let mut ingesting = Ingesting::new(&self.config)?;
        for sample in samples {
            self.ingest_one(&mut ingesting, &sample);
        }
        Ok(self.rank_and_report(ingesting))
    }

    /// Processes several streams in parallel, one thread and one sketch per
    /// shard, then merges the sketches before ranking.
    ///
    /// Estimates stay upper bounds of the true counts, but error bounds are
    /// looser than for a single sequential run over the same samples.
    ///
    /// Positions passed to [`RunObserver::sample_skipped`] count from the
    /// start of each shard.
    pub fn run_sharded<S, I>(&self, shards: S) -> Result<Report, Error>
    where
        S: IntoIterator<Item = I>,
        I: IntoIterator<Item = LocationSample> + Send,
        O: Sync,
    {
        let shards: Vec<I> = shards.into_iter().collect();
        let ingested: Vec<Result<Ingesting, Error>> = thread::scope(|scope| {
            let handles: Vec<_> = shards
                .into_iter()
                .map(|shard| {
                    scope.spawn(move || -> Result<Ingesting, Error> {
                        let mut ingesting = Ingesting::new(&self.config)?;
                        for sample in shard {
                            self.ingest_one(&mut ingesting, &sample);
                        }
                        Ok(ingesting)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        let mut merged = Ingesting::new(&self.config)?;
        for shard in ingested {
            merged.absorb(shard?);
        }
        Ok(self.rank_and_report(merged))
    }

    fn ingest_one(&self, ingesting: &mut Ingesting, sample: &LocationSample) {
        if let Err(err) = ingesting.ingest(sample) {
            self.observer.sample_skipped(ingesting.total_samples(), &err);
        }
    }

    fn rank_and_report(&self, ingesting: Ingesting) -> Report {
        let ranking = ingesting.finish();
        self.observer.ingestion_finished(ranking.summary());

        let reporting = ranking.rank(self.config.top_k());
        self.observer.ranked(reporting.rows());

        reporting.report(
            &self.geocoder,
            self.config.lookup_workers(),
            self.config.lookup_timeout(),
            &self.observer,
        )
    }
}
