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

use crate::error::Error;
use crate::pipeline::RankedPlace;
use crate::pipeline::RunSummary;
use crate::spatial::SpatialCell;
use crate::topk::Row;

/// Receives progress events from a pipeline run.
///
/// All hooks default to doing nothing. `()` is the silent observer and
/// [`TracingObserver`] forwards events to `tracing`.
pub trait RunObserver {
    /// A sample was skipped. `position` is its 1-based position in the stream,
    /// or in its shard for [`Pipeline::run_sharded`](crate::pipeline::Pipeline::run_sharded).
    fn sample_skipped(&self, _position: u64, _error: &Error) {}

    /// The stream is exhausted.
    fn ingestion_finished(&self, _summary: &RunSummary) {}

    /// Cells were ranked, most visited first.
    fn ranked(&self, _rows: &[Row<SpatialCell>]) {}

    /// Reverse geocoding of `place` failed; it is reported without address.
    fn lookup_failed(&self, _place: &RankedPlace, _error: &Error) {}

    /// `place` is final.
    fn place_reported(&self, _place: &RankedPlace) {}
}

impl RunObserver for () {}

/// Emits pipeline events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn sample_skipped(&self, position: u64, error: &Error) {
        tracing::warn!(position, %error, "skipping sample");
    }

    fn ingestion_finished(&self, summary: &RunSummary) {
        tracing::info!(
            total = summary.total_samples(),
            skipped = summary.skipped_samples(),
            "read locations"
        );
        match (summary.distinct_cells(), summary.compression_percent()) {
            (Some(distinct), Some(percent)) => {
                tracing::info!("total cells in map = {distinct}, compression {percent}%")
            }
            (Some(distinct), None) => tracing::info!("total cells in map = {distinct}"),
            _ => {}
        }
    }

    fn ranked(&self, rows: &[Row<SpatialCell>]) {
        for row in rows {
            tracing::debug!(
                cell = %row.item(),
                estimate = row.estimate(),
                error = row.error(),
                "ranked cell"
            );
        }
    }

    fn lookup_failed(&self, place: &RankedPlace, error: &Error) {
        tracing::error!(
            rank = place.rank(),
            cell = %place.cell(),
            %error,
            "reverse geocode failed"
        );
    }

    fn place_reported(&self, place: &RankedPlace) {
        tracing::info!(
            rank = place.rank(),
            cell = %place.cell(),
            centroid = %place.centroid(),
            visits = place.estimate(),
            error = place.error(),
            address = place.address(),
            "place"
        );
    }
}
