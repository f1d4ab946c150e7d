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

//! Counter storage for the top-k sketch.
//!
//! Counters live in a hash map keyed by item. A second, ordered index keyed by
//! `(count, epoch)` keeps the minimum counter at the front, where `epoch` is a
//! monotonically increasing insertion number. Increments and evictions both
//! cost `O(log C)`, and among equal counts the earliest inserted counter is
//! evicted first.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Counter {
    pub count: u64,
    pub error: u64,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub(super) struct CounterIndex<T> {
    counters: HashMap<T, Counter>,
    by_count: BTreeMap<(u64, u64), T>,
    next_epoch: u64,
}

impl<T: Eq + Hash + Clone> CounterIndex<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counters: HashMap::with_capacity(capacity),
            by_count: BTreeMap::new(),
            next_epoch: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn get(&self, item: &T) -> Option<&Counter> {
        self.counters.get(item)
    }

    /// Adds `amount` to the counter of `item`.
    ///
    /// Returns `false` without touching anything if `item` is not tracked.
    pub fn increment(&mut self, item: &T, amount: u64) -> bool {
        let Some(counter) = self.counters.get_mut(item) else {
            return false;
        };
        let tracked = self
            .by_count
            .remove(&(counter.count, counter.epoch))
            .expect("ordered index out of sync with counters");
        counter.count = counter.count.saturating_add(amount);
        self.by_count.insert((counter.count, counter.epoch), tracked);
        true
    }

    /// Starts tracking `item`, which must not already be tracked.
    pub fn push(&mut self, item: T, count: u64, error: u64) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.by_count.insert((count, epoch), item.clone());
        let previous = self.counters.insert(
            item,
            Counter {
                count,
                error,
                epoch,
            },
        );
        debug_assert!(previous.is_none(), "item pushed twice");
    }

    /// Returns the smallest tracked count.
    pub fn min_count(&self) -> Option<u64> {
        self.by_count.first_key_value().map(|(&(count, _), _)| count)
    }

    /// Removes and returns the counter with the smallest count.
    pub fn pop_min(&mut self) -> Option<(T, Counter)> {
        let (_, item) = self.by_count.pop_first()?;
        let counter = self
            .counters
            .remove(&item)
            .expect("ordered index out of sync with counters");
        Some((item, counter))
    }

    /// Iterates over tracked counters in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &Counter)> {
        self.counters.iter()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.by_count.clear();
        self.next_epoch = 0;
    }
}
