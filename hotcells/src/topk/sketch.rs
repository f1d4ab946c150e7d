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

//! Space-Saving top-k sketch.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Error;
use crate::topk::counter_index::CounterIndex;

/// Error guarantees for heavy hitter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Include items if the estimate exceeds the threshold (no false negatives).
    NoFalseNegatives,
    /// Include items if the lower bound exceeds the threshold (no false positives).
    NoFalsePositives,
}

/// Result row for top-k and heavy hitter queries.
///
/// The true frequency of `item` lies in `[lower_bound, upper_bound]`, where
/// `upper_bound` is the estimate and `lower_bound` is `estimate - error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<T> {
    item: T,
    estimate: u64,
    error: u64,
}

impl<T> Row<T> {
    /// Returns the item value.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consumes the row and returns the item value.
    pub fn into_item(self) -> T {
        self.item
    }

    /// Returns the estimated frequency.
    ///
    /// This never underestimates the true frequency.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// Returns the maximum overestimation of [`Row::estimate`].
    pub fn error(&self) -> u64 {
        self.error
    }

    /// Returns the upper bound for the frequency.
    pub fn upper_bound(&self) -> u64 {
        self.estimate
    }

    /// Returns the guaranteed lower bound for the frequency.
    pub fn lower_bound(&self) -> u64 {
        self.estimate - self.error
    }
}

/// Bounded-memory approximate top-k sketch.
///
/// See [`crate::topk`] for an overview and error guarantees.
#[derive(Debug, Clone)]
pub struct TopKSketch<T> {
    capacity: usize,
    total_weight: u64,
    // Upper bound on the frequency of untracked items while there is free
    // space. Zero unless another sketch has been merged in.
    offset: u64,
    counters: CounterIndex<T>,
}

impl<T: Eq + Hash + Clone> TopKSketch<T> {
    /// Creates a new sketch tracking at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidCapacity`](crate::error::ErrorKind) if
    /// `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::invalid_capacity(capacity));
        }
        Ok(Self {
            capacity,
            total_weight: 0,
            offset: 0,
            counters: CounterIndex::with_capacity(capacity),
        })
    }

    /// Returns the maximum number of tracked items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items currently tracked.
    ///
    /// This is never larger than [`TopKSketch::capacity`].
    pub fn size(&self) -> usize {
        self.counters.len()
    }

    /// Returns true if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.counters.len() == 0
    }

    /// Returns the total weight of the stream.
    ///
    /// This is the sum of all weights passed to `insert` and
    /// `insert_with_weight`.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns true if `item` is currently tracked.
    pub fn contains(&self, item: &T) -> bool {
        self.counters.get(item).is_some()
    }

    /// Returns the estimated frequency for an item, or zero if it is not tracked.
    pub fn estimate(&self, item: &T) -> u64 {
        self.counters.get(item).map_or(0, |counter| counter.count)
    }

    /// Returns the guaranteed lower bound frequency for an item.
    ///
    /// If the item is not tracked, the lower bound is zero.
    pub fn lower_bound(&self, item: &T) -> u64 {
        self.counters
            .get(item)
            .map_or(0, |counter| counter.count - counter.error)
    }

    /// Returns the guaranteed upper bound frequency for an item.
    ///
    /// An untracked item cannot be more frequent than the smallest tracked
    /// estimate, so that is its upper bound once the sketch is full.
    pub fn upper_bound(&self, item: &T) -> u64 {
        match self.counters.get(item) {
            Some(counter) => counter.count,
            None => self.maximum_error(),
        }
    }

    /// Returns an upper bound on the overestimation of any tracked item and
    /// on the frequency of any untracked item.
    ///
    /// This is the smallest tracked estimate once the sketch is full. Before
    /// that it is zero, unless a merge has carried in items that were dropped
    /// by the merged sketches.
    pub fn maximum_error(&self) -> u64 {
        if self.counters.len() < self.capacity {
            self.offset
        } else {
            self.counters.min_count().unwrap_or(self.offset)
        }
    }

    /// Returns the a priori error bound `total_weight / capacity`.
    ///
    /// Every item more frequent than this is guaranteed to be tracked.
    pub fn apriori_error(&self) -> u64 {
        self.total_weight / self.capacity as u64
    }

    /// Inserts one occurrence of `item`.
    pub fn insert(&mut self, item: T) {
        self.insert_with_weight(item, 1);
    }

    /// Inserts `weight` occurrences of `item`.
    ///
    /// A weight of zero is a no-op. When the sketch is full and `item` is not
    /// tracked, the counter with the smallest estimate (earliest inserted among
    /// ties) is replaced; `item` inherits that estimate as its error.
    pub fn insert_with_weight(&mut self, item: T, weight: u64) {
        if weight == 0 {
            return;
        }
        self.total_weight = self.total_weight.saturating_add(weight);

        if self.counters.increment(&item, weight) {
            return;
        }

        if self.counters.len() < self.capacity {
            self.counters
                .push(item, self.offset.saturating_add(weight), self.offset);
            return;
        }

        let (_, evicted) = self
            .counters
            .pop_min()
            .expect("full sketch has at least one counter");
        self.counters
            .push(item, evicted.count.saturating_add(weight), evicted.count);
    }

    /// Returns the `k` tracked items with the largest estimates.
    ///
    /// Rows are sorted by descending estimate; equal estimates are ordered by
    /// item. The result has `min(k, size())` rows. The sketch is not modified.
    ///
    /// ```
    /// # use hotcells::topk::TopKSketch;
    /// let mut sketch = TopKSketch::new(8).unwrap();
    /// sketch.insert_with_weight("home", 40);
    /// sketch.insert_with_weight("work", 25);
    /// sketch.insert("gym");
    ///
    /// let rows = sketch.query(2);
    /// assert_eq!(*rows[0].item(), "home");
    /// assert_eq!(rows[1].estimate(), 25);
    /// ```
    pub fn query(&self, k: usize) -> Vec<Row<T>>
    where
        T: Ord,
    {
        let mut rows = self.rows();
        sort_rows(&mut rows);
        rows.truncate(k);
        rows
    }

    /// Returns heavy hitters above `threshold`.
    ///
    /// If `threshold` is less than [`TopKSketch::maximum_error`], that is used
    /// instead, so [`ErrorType::NoFalseNegatives`] never misses an item whose
    /// true frequency exceeds the threshold.
    ///
    /// For [`ErrorType::NoFalseNegatives`], items are included when `estimate > threshold`.
    /// For [`ErrorType::NoFalsePositives`], items are included when `lower_bound > threshold`.
    pub fn heavy_hitters(&self, error_type: ErrorType, threshold: u64) -> Vec<Row<T>>
    where
        T: Ord,
    {
        let threshold = threshold.max(self.maximum_error());
        let mut rows: Vec<_> = self
            .rows()
            .into_iter()
            .filter(|row| match error_type {
                ErrorType::NoFalseNegatives => row.upper_bound() > threshold,
                ErrorType::NoFalsePositives => row.lower_bound() > threshold,
            })
            .collect();
        sort_rows(&mut rows);
        rows
    }

    /// Merges another sketch into this one.
    ///
    /// Estimates and errors of items tracked by both sketches are summed. An
    /// item tracked on only one side is charged the other side's
    /// [`TopKSketch::maximum_error`] as both estimate and error, which keeps
    /// every bound valid for the combined stream. The `capacity` largest
    /// merged estimates are retained.
    pub fn merge(&mut self, other: &Self)
    where
        T: Ord,
    {
        if other.is_empty() {
            return;
        }
        let self_floor = self.maximum_error();
        let other_floor = other.maximum_error();

        let mut merged: HashMap<T, (u64, u64)> = HashMap::with_capacity(self.size() + other.size());
        for (item, counter) in self.counters.iter() {
            let (count, error) = other
                .counters
                .get(item)
                .map_or((other_floor, other_floor), |c| (c.count, c.error));
            merged.insert(
                item.clone(),
                (counter.count.saturating_add(count), counter.error.saturating_add(error)),
            );
        }
        for (item, counter) in other.counters.iter() {
            merged.entry(item.clone()).or_insert((
                counter.count.saturating_add(self_floor),
                counter.error.saturating_add(self_floor),
            ));
        }

        let mut rows: Vec<_> = merged
            .into_iter()
            .map(|(item, (estimate, error))| Row {
                item,
                estimate,
                error,
            })
            .collect();
        sort_rows(&mut rows);
        rows.truncate(self.capacity);

        self.counters.clear();
        for row in rows {
            self.counters.push(row.item, row.estimate, row.error);
        }
        self.total_weight = self.total_weight.saturating_add(other.total_weight);
        self.offset = self_floor.saturating_add(other_floor);
    }

    /// Resets the sketch to an empty state.
    pub fn reset(&mut self) {
        self.counters.clear();
        self.total_weight = 0;
        self.offset = 0;
    }

    /// Iterates over `(item, estimate, error)` of tracked items in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u64, u64)> {
        self.counters
            .iter()
            .map(|(item, counter)| (item, counter.count, counter.error))
    }

    fn rows(&self) -> Vec<Row<T>> {
        self.counters
            .iter()
            .map(|(item, counter)| Row {
                item: item.clone(),
                estimate: counter.count,
                error: counter.error,
            })
            .collect()
    }
}

fn sort_rows<T: Ord>(rows: &mut [Row<T>]) {
    rows.sort_unstable_by(|a, b| {
        b.estimate
            .cmp(&a.estimate)
            .then_with(|| a.item.cmp(&b.item))
    });
}
