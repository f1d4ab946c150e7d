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

use std::fmt;

use crate::spatial::Coordinate;
use crate::spatial::SpatialCell;

/// Counters collected while ingesting a sample stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub(crate) total_samples: u64,
    pub(crate) skipped_samples: u64,
    pub(crate) distinct_cells: Option<usize>,
    pub(crate) tracked_cells: usize,
    pub(crate) maximum_error: u64,
}

impl RunSummary {
    /// Returns the number of samples read, including skipped ones.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Returns the number of samples skipped for invalid coordinates.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped_samples
    }

    /// Returns the number of samples that were mapped to a cell.
    pub fn indexed_samples(&self) -> u64 {
        self.total_samples - self.skipped_samples
    }

    /// Returns the exact number of distinct cells, if exact tallying was on.
    pub fn distinct_cells(&self) -> Option<usize> {
        self.distinct_cells
    }

    /// Returns the number of cells held by the sketch.
    pub fn tracked_cells(&self) -> usize {
        self.tracked_cells
    }

    /// Returns the sketch's bound on overestimation at the end of ingestion.
    pub fn maximum_error(&self) -> u64 {
        self.maximum_error
    }

    /// Returns `distinct cells / indexed samples`.
    ///
    /// `None` without exact tallying or when no sample was indexed.
    pub fn compression_ratio(&self) -> Option<f64> {
        let distinct = self.distinct_cells?;
        match self.indexed_samples() {
            0 => None,
            indexed => Some(distinct as f64 / indexed as f64),
        }
    }

    /// Returns the share of samples that collapsed into an already seen cell,
    /// in whole percent.
    pub fn compression_percent(&self) -> Option<u64> {
        let distinct = self.distinct_cells? as u64;
        match self.indexed_samples() {
            0 => None,
            indexed => Some(100 - distinct * 100 / indexed),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples: {} read, {} skipped",
            self.total_samples, self.skipped_samples
        )?;
        if let Some(distinct) = self.distinct_cells {
            write!(f, "; distinct cells: {distinct}")?;
        }
        if let Some(percent) = self.compression_percent() {
            write!(f, "; compression: {percent}%")?;
        }
        write!(
            f,
            "; tracked cells: {}, max error: {}",
            self.tracked_cells, self.maximum_error
        )
    }
}

/// Outcome of reverse geocoding one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The best candidate address.
    Resolved(String),
    /// The geocoder answered with no candidates.
    NoMatch,
    /// The geocoder failed.
    Failed(String),
    /// The geocoder did not answer in time.
    TimedOut,
}

impl Lookup {
    /// Returns true for [`Lookup::Failed`] and [`Lookup::TimedOut`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Lookup::Failed(_) | Lookup::TimedOut)
    }
}

/// One place of the final ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPlace {
    pub(crate) rank: usize,
    pub(crate) cell: SpatialCell,
    pub(crate) centroid: Coordinate,
    pub(crate) estimate: u64,
    pub(crate) error: u64,
    pub(crate) lookup: Lookup,
}

impl RankedPlace {
    /// Returns the 1-based rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the cell of this place.
    pub fn cell(&self) -> SpatialCell {
        self.cell
    }

    /// Returns the centroid of the cell.
    pub fn centroid(&self) -> Coordinate {
        self.centroid
    }

    /// Returns the estimated number of visits.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// Returns the maximum overestimation of [`RankedPlace::estimate`].
    pub fn error(&self) -> u64 {
        self.error
    }

    /// Returns the reverse geocoding outcome.
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Returns the resolved address, or an empty string.
    pub fn address(&self) -> &str {
        match &self.lookup {
            Lookup::Resolved(address) => address,
            _ => "",
        }
    }

    /// Returns true if reverse geocoding failed or timed out.
    pub fn lookup_failed(&self) -> bool {
        self.lookup.is_failure()
    }
}

impl fmt::Display for RankedPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} visits: {}",
            self.rank, self.cell, self.centroid, self.estimate
        )?;
        if self.error > 0 {
            write!(f, " (±{})", self.error)?;
        }
        match &self.lookup {
            Lookup::Resolved(address) => write!(f, " {address}"),
            Lookup::NoMatch => Ok(()),
            Lookup::Failed(_) => write!(f, " [lookup failed]"),
            Lookup::TimedOut => write!(f, " [lookup timed out]"),
        }
    }
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub(crate) summary: RunSummary,
    pub(crate) places: Vec<RankedPlace>,
}

impl Report {
    /// Returns the ingestion summary.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns the ranked places, most visited first.
    pub fn places(&self) -> &[RankedPlace] {
        &self.places
    }

    /// Returns the number of places whose lookup failed or timed out.
    pub fn failed_lookups(&self) -> usize {
        self.places.iter().filter(|p| p.lookup_failed()).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary)?;
        for place in &self.places {
            writeln!(f, "{place}")?;
        }
        Ok(())
    }
}
