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

//! Deterministic mapping from coordinates to hierarchical spatial cells.
//!
//! # Overview
//!
//! Location samples carry continuous coordinates with GPS noise. To compare
//! visits to "the same place", each coordinate is snapped to a cell of the
//! [H3](https://h3geo.org) hexagonal grid at a resolution fixed for the whole
//! run. Cells tile the sphere without gaps, so every finite coordinate maps to
//! exactly one cell, and the mapping is a pure function of
//! `(latitude, longitude, resolution)`.
//!
//! A [`SpatialCell`] converts back to a representative centroid and can be
//! coarsened to any parent resolution.
//!
//! Resolution 9 cells (the default used by the pipeline) have an average edge
//! of roughly 200 meters, which is about the size of a building block.
//!
//! # Examples
//!
//! ```
//! # use hotcells::spatial::SpatialIndexer;
//! let indexer = SpatialIndexer::new(9).unwrap();
//! let a = indexer.index(48.85837, 2.29448).unwrap();
//! let b = indexer.index(48.85837, 2.29448).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.resolution(), 9);
//!
//! let centroid = a.centroid();
//! assert_eq!(indexer.index(centroid.latitude, centroid.longitude).unwrap(), a);
//! ```

mod cell;

pub use self::cell::Coordinate;
pub use self::cell::SpatialCell;

use h3o::LatLng;
pub use h3o::Resolution;

use crate::error::Error;
use crate::sample::LocationSample;

/// Finest resolution supported by the grid.
pub const MAX_RESOLUTION: u8 = 15;

/// Maps `(latitude, longitude)` to the cell containing it at `resolution`.
///
/// Range is not validated: callers are expected to pass latitudes in
/// `[-90, 90]` and longitudes in `[-180, 180]`. Only non-finite input is
/// rejected, with [`ErrorKind::InvalidCoordinate`](crate::error::ErrorKind).
pub fn index(latitude: f64, longitude: f64, resolution: Resolution) -> Result<SpatialCell, Error> {
    let latlng = LatLng::new(latitude, longitude)
        .map_err(|_| Error::invalid_coordinate(latitude, longitude))?;
    Ok(SpatialCell::from(latlng.to_cell(resolution)))
}

/// Converts a numeric resolution into a grid resolution.
pub(crate) fn resolution_from_u8(resolution: u8) -> Result<Resolution, Error> {
    Resolution::try_from(resolution).map_err(|err| {
        Error::invalid_argument(format!(
            "resolution must be between 0 and {MAX_RESOLUTION}"
        ))
        .with_context("resolution", resolution)
        .set_source(err)
    })
}

/// A spatial indexer bound to one resolution.
///
/// Holding the resolution in the indexer keeps every cell produced during a
/// run comparable with every other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialIndexer {
    resolution: Resolution,
}

impl SpatialIndexer {
    /// Creates an indexer for `resolution` (`0..=15`).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind) if
    /// `resolution` is greater than [`MAX_RESOLUTION`].
    pub fn new(resolution: u8) -> Result<Self, Error> {
        Ok(Self {
            resolution: resolution_from_u8(resolution)?,
        })
    }

    /// Creates an indexer for an already validated resolution.
    pub fn with_resolution(resolution: Resolution) -> Self {
        Self { resolution }
    }

    /// Returns the resolution used by this indexer.
    pub fn resolution(&self) -> u8 {
        u8::from(self.resolution)
    }

    /// Maps a coordinate pair to its cell.
    pub fn index(&self, latitude: f64, longitude: f64) -> Result<SpatialCell, Error> {
        index(latitude, longitude, self.resolution)
    }

    /// Maps the coordinates of `sample` to its cell.
    pub fn index_sample(&self, sample: &LocationSample) -> Result<SpatialCell, Error> {
        self.index(sample.latitude, sample.longitude)
    }
}
