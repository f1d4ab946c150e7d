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

//! Exact per-item visit counts.
//!
//! Unlike [`TopKSketch`](crate::topk::TopKSketch), memory grows with the number
//! of distinct items. The pipeline only uses it for the distinct-cell count and
//! the compression ratio in the run summary, and it can be turned off.

use std::collections::HashMap;
use std::hash::Hash;

/// Exact counter from item to number of occurrences.
#[derive(Debug, Clone)]
pub struct ExactTally<T> {
    counts: HashMap<T, u64>,
    total: u64,
}

impl<T> Default for ExactTally<T> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            total: 0,
        }
    }
}

impl<T: Eq + Hash> ExactTally<T> {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `item`.
    pub fn record(&mut self, item: T) {
        self.record_with_weight(item, 1);
    }

    /// Records `weight` occurrences of `item`. A weight of zero is a no-op.
    pub fn record_with_weight(&mut self, item: T, weight: u64) {
        if weight == 0 {
            return;
        }
        *self.counts.entry(item).or_insert(0) += weight;
        self.total += weight;
    }

    /// Returns the exact count of `item`.
    pub fn count(&self, item: &T) -> u64 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Returns the number of distinct items recorded.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Returns the total recorded weight.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns `distinct / total`, or `None` for an empty tally.
    ///
    /// Small ratios mean many samples fell into few cells.
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.counts.len() as f64 / self.total as f64)
        }
    }

    /// Returns the item with the highest count.
    ///
    /// Ties go to the smallest item.
    pub fn most_frequent(&self) -> Option<(&T, u64)>
    where
        T: Ord,
    {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(item, count)| (item, *count))
    }

    /// Adds all counts of `other` into this tally.
    pub fn merge(&mut self, other: ExactTally<T>) {
        for (item, count) in other.counts {
            self.record_with_weight(item, count);
        }
    }

    /// Iterates over `(item, count)` in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u64)> {
        self.counts.iter().map(|(item, count)| (item, *count))
    }
}
