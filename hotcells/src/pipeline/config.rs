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

use std::time::Duration;

use crate::error::Error;
use crate::spatial::Resolution;
use crate::spatial::SpatialIndexer;
use crate::spatial::resolution_from_u8;

/// Default grid resolution, cells of roughly 0.1 km².
pub const DEFAULT_RESOLUTION: u8 = 9;
/// Default number of counters kept by the sketch.
pub const DEFAULT_CAPACITY: usize = 50;
/// Default number of places reported.
pub const DEFAULT_TOP_K: usize = 50;
/// Default number of concurrent reverse geocoding calls.
pub const DEFAULT_LOOKUP_WORKERS: usize = 4;
/// Default time allowed for one reverse geocoding call.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated pipeline configuration.
///
/// ```
/// # use hotcells::pipeline::PipelineConfig;
/// let config = PipelineConfig::builder()
///     .resolution(10)
///     .capacity(200)
///     .top_k(20)
///     .build()
///     .unwrap();
/// assert_eq!(config.resolution(), 10);
/// assert_eq!(config.top_k(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    resolution: Resolution,
    capacity: usize,
    top_k: usize,
    exact_tally: bool,
    lookup_workers: usize,
    lookup_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Nine,
            capacity: DEFAULT_CAPACITY,
            top_k: DEFAULT_TOP_K,
            exact_tally: true,
            lookup_workers: DEFAULT_LOOKUP_WORKERS,
            lookup_timeout: Some(DEFAULT_LOOKUP_TIMEOUT),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for PipelineConfig.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Returns the grid resolution.
    pub fn resolution(&self) -> u8 {
        u8::from(self.resolution)
    }

    /// Returns an indexer for the configured resolution.
    pub fn indexer(&self) -> SpatialIndexer {
        SpatialIndexer::with_resolution(self.resolution)
    }

    /// Returns the sketch capacity `C`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of places to report `K`.
    ///
    /// Ranking never returns more than `capacity` places.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Returns whether exact per-cell counts are kept for the run summary.
    pub fn exact_tally(&self) -> bool {
        self.exact_tally
    }

    /// Returns the number of concurrent reverse geocoding calls.
    pub fn lookup_workers(&self) -> usize {
        self.lookup_workers
    }

    /// Returns the time allowed for one reverse geocoding call.
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    resolution: u8,
    capacity: usize,
    top_k: usize,
    exact_tally: bool,
    lookup_workers: usize,
    lookup_timeout: Option<Duration>,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            capacity: DEFAULT_CAPACITY,
            top_k: DEFAULT_TOP_K,
            exact_tally: true,
            lookup_workers: DEFAULT_LOOKUP_WORKERS,
            lookup_timeout: Some(DEFAULT_LOOKUP_TIMEOUT),
        }
    }
}

impl PipelineConfigBuilder {
    /// Set the grid resolution, `0..=15`.
    pub fn resolution(mut self, resolution: u8) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the sketch capacity `C`.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of places to report `K`.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Keep or skip exact per-cell counts.
    ///
    /// Exact counts grow with the number of distinct cells; turn them off for
    /// very large inputs.
    pub fn exact_tally(mut self, enabled: bool) -> Self {
        self.exact_tally = enabled;
        self
    }

    /// Set the number of concurrent reverse geocoding calls.
    pub fn lookup_workers(mut self, workers: usize) -> Self {
        self.lookup_workers = workers;
        self
    }

    /// Set the time allowed for one reverse geocoding call. `None` waits forever.
    pub fn lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::InvalidCapacity`](crate::error::ErrorKind) if `capacity` is zero.
    /// * [`ErrorKind::InvalidArgument`](crate::error::ErrorKind) if `resolution` is above 15,
    ///   or `top_k` or `lookup_workers` is zero.
    pub fn build(self) -> Result<PipelineConfig, Error> {
        let resolution = resolution_from_u8(self.resolution)?;
        if self.capacity == 0 {
            return Err(Error::invalid_capacity(self.capacity));
        }
        if self.top_k == 0 {
            return Err(Error::invalid_argument("top_k must be at least one"));
        }
        if self.lookup_workers == 0 {
            return Err(Error::invalid_argument(
                "lookup_workers must be at least one",
            ));
        }
        Ok(PipelineConfig {
            resolution,
            capacity: self.capacity,
            top_k: self.top_k,
            exact_tally: self.exact_tally,
            lookup_workers: self.lookup_workers,
            lookup_timeout: self.lookup_timeout,
        })
    }
}
