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

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use h3o::CellIndex;
use h3o::LatLng;

use crate::error::Error;
use crate::spatial::resolution_from_u8;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A discrete cell of the hexagonal grid.
///
/// The identifier encodes its own resolution, so two cells compare equal only
/// when they are the same region at the same resolution. Ordering follows the
/// numeric identifier and is used to break ties deterministically.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialCell(CellIndex);

impl SpatialCell {
    /// Returns the 64-bit cell identifier.
    pub fn id(&self) -> u64 {
        u64::from(self.0)
    }

    /// Returns the resolution of this cell.
    pub fn resolution(&self) -> u8 {
        u8::from(self.0.resolution())
    }

    /// Returns the centroid of this cell.
    pub fn centroid(&self) -> Coordinate {
        let latlng = LatLng::from(self.0);
        Coordinate::new(latlng.lat(), latlng.lng())
    }

    /// Returns the ancestor of this cell at the coarser `resolution`.
    ///
    /// Returns `None` if `resolution` is finer than this cell's resolution or
    /// is not a valid resolution.
    pub fn parent(&self, resolution: u8) -> Option<SpatialCell> {
        let resolution = resolution_from_u8(resolution).ok()?;
        self.0.parent(resolution).map(SpatialCell)
    }
}

impl PartialOrd for SpatialCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpatialCell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl From<CellIndex> for SpatialCell {
    fn from(index: CellIndex) -> Self {
        Self(index)
    }
}

impl From<SpatialCell> for CellIndex {
    fn from(cell: SpatialCell) -> Self {
        cell.0
    }
}

impl From<SpatialCell> for u64 {
    fn from(cell: SpatialCell) -> Self {
        cell.id()
    }
}

impl TryFrom<u64> for SpatialCell {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        CellIndex::try_from(id).map(SpatialCell).map_err(|err| {
            Error::invalid_data("not a valid cell identifier")
                .with_context("id", format!("{id:x}"))
                .set_source(err)
        })
    }
}

impl FromStr for SpatialCell {
    type Err = Error;

    /// Parses the lowercase or uppercase hexadecimal form produced by
    /// [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = u64::from_str_radix(s, 16).map_err(|err| {
            Error::invalid_data("cell identifier is not hexadecimal")
                .with_context("input", s)
                .set_source(err)
        })?;
        SpatialCell::try_from(id)
    }
}

impl fmt::Display for SpatialCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.id())
    }
}

impl fmt::Debug for SpatialCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpatialCell")
            .field(&format_args!("{:x}", self.id()))
            .finish()
    }
}
