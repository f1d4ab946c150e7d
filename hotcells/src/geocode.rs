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

//! Reverse geocoding collaborator.
//!
//! The pipeline hands each ranked cell's centroid to a [`ReverseGeocoder`] and
//! treats the answer as best effort: a failure only blanks the address of that
//! one place.

use crate::error::Error;
use crate::spatial::Coordinate;

/// Resolves a coordinate into candidate human-readable addresses.
///
/// Implementations may block; the pipeline calls them from worker threads and
/// enforces its own timeout. Failures should be reported with
/// [`Error::lookup_failed`].
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// # use hotcells::geocode::ReverseGeocoder;
/// # use hotcells::spatial::Coordinate;
/// let geocoder = |at: Coordinate| Ok(vec![format!("near {at}")]);
/// let addresses = geocoder.reverse_geocode(Coordinate::new(1.0, 2.0)).unwrap();
/// assert_eq!(addresses, vec!["near (1.000000, 2.000000)".to_string()]);
/// ```
pub trait ReverseGeocoder: Send + Sync {
    /// Returns candidate addresses for `at`, best match first.
    fn reverse_geocode(&self, at: Coordinate) -> Result<Vec<String>, Error>;
}

impl<F> ReverseGeocoder for F
where
    F: Fn(Coordinate) -> Result<Vec<String>, Error> + Send + Sync,
{
    fn reverse_geocode(&self, at: Coordinate) -> Result<Vec<String>, Error> {
        self(at)
    }
}

/// A geocoder that knows no addresses.
///
/// Places are reported with coordinates only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl ReverseGeocoder for Offline {
    fn reverse_geocode(&self, _at: Coordinate) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }
}
