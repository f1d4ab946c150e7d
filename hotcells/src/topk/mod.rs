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

//! Top-k sketch for finding the most frequent items in data streams.
//!
//! # Overview
//!
//! This sketch implements the Space-Saving algorithm from ["Efficient Computation of Frequent and
//! Top-k Elements in Data Streams"](https://doi.org/10.1007/978-3-540-30570-5_27) by Ahmed
//! Metwally, Divyakant Agrawal and Amr El Abbadi.
//!
//! The sketch keeps at most `C` counters, each an `(item, estimate, error)` triple, regardless of
//! how long the stream is or how many distinct items it contains. An insert of a tracked item adds
//! to its estimate. An insert of an untracked item takes a free counter if there is one; otherwise
//! it replaces the counter with the smallest estimate and inherits that estimate as its error.
//!
//! # Accuracy
//!
//! Let `N` be the total inserted weight. For every tracked item the true frequency `f` satisfies
//! `estimate - error <= f <= estimate`, and `error <= N / C`. Every item with `f > N / C` is
//! guaranteed to be tracked. An untracked item has frequency at most
//! [`TopKSketch::maximum_error`].
//!
//! If at most `C` distinct items are inserted, all estimates are exact.
//!
//! # Ties
//!
//! Among counters with equal smallest estimates, the one inserted earliest is replaced first.
//! [`TopKSketch::query`] orders equal estimates by item so results are reproducible.
//!
//! # Examples
//!
//! ```
//! # use hotcells::topk::ErrorType;
//! # use hotcells::topk::TopKSketch;
//! let mut sketch = TopKSketch::<u64>::new(2).unwrap();
//! for item in [7, 7, 7, 8, 9] {
//!     sketch.insert(item);
//! }
//! assert_eq!(sketch.size(), 2);
//! assert_eq!(sketch.estimate(&7), 3);
//!
//! let rows = sketch.heavy_hitters(ErrorType::NoFalsePositives, 1);
//! assert_eq!(rows.len(), 1);
//! assert_eq!(*rows[0].item(), 7);
//! ```

mod counter_index;
mod sketch;

pub use self::sketch::ErrorType;
pub use self::sketch::Row;
pub use self::sketch::TopKSketch;
