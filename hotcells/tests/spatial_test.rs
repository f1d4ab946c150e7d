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

use googletest::prelude::*;
use hotcells::error::ErrorKind;
use hotcells::sample::LocationSample;
use hotcells::spatial::Resolution;
use hotcells::spatial::SpatialCell;
use hotcells::spatial::SpatialIndexer;
use hotcells::spatial::index;

const EIFFEL_TOWER: (f64, f64) = (48.858_37, 2.294_48);
const STATUE_OF_LIBERTY: (f64, f64) = (40.689_25, -74.044_5);

#[test]
fn test_index_is_deterministic() {
    let indexer = SpatialIndexer::new(9).unwrap();
    let first = indexer.index(EIFFEL_TOWER.0, EIFFEL_TOWER.1).unwrap();
    let second = indexer.index(EIFFEL_TOWER.0, EIFFEL_TOWER.1).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.id(), second.id());

    let free = index(EIFFEL_TOWER.0, EIFFEL_TOWER.1, Resolution::Nine).unwrap();
    assert_eq!(first, free);
}

#[test]
fn test_nearby_points_share_a_cell() {
    let indexer = SpatialIndexer::new(9).unwrap();
    let cell = indexer.index(EIFFEL_TOWER.0, EIFFEL_TOWER.1).unwrap();
    let centroid = cell.centroid();

    // A few centimeters of jitter around the centroid stays in the cell.
    for (dlat, dlon) in [(1e-7, 0.0), (0.0, -1e-7), (-1e-7, 1e-7)] {
        let jittered = indexer
            .index(centroid.latitude + dlat, centroid.longitude + dlon)
            .unwrap();
        assert_eq!(jittered, cell);
    }

    let far = indexer
        .index(STATUE_OF_LIBERTY.0, STATUE_OF_LIBERTY.1)
        .unwrap();
    assert_ne!(far, cell);
}

#[test]
fn test_centroid_maps_back_to_cell() {
    for resolution in [0u8, 5, 9, 12, 15] {
        let indexer = SpatialIndexer::new(resolution).unwrap();
        let cell = indexer
            .index(STATUE_OF_LIBERTY.0, STATUE_OF_LIBERTY.1)
            .unwrap();
        assert_that!(cell.resolution(), eq(resolution));

        let centroid = cell.centroid();
        assert_that!(centroid.latitude, ge(-90.0));
        assert_that!(centroid.latitude, le(90.0));
        assert_eq!(
            indexer.index(centroid.latitude, centroid.longitude).unwrap(),
            cell
        );
    }
}

#[test]
fn test_finer_resolution_has_smaller_cells() {
    let coarse = SpatialIndexer::new(3).unwrap();
    let fine = SpatialIndexer::new(12).unwrap();
    let (lat, lon) = EIFFEL_TOWER;

    // Two points ~100 m apart: one coarse cell, two fine cells.
    let a = (lat, lon);
    let b = (lat + 0.001, lon);
    assert_eq!(coarse.index(a.0, a.1).unwrap(), coarse.index(b.0, b.1).unwrap());
    assert_ne!(fine.index(a.0, a.1).unwrap(), fine.index(b.0, b.1).unwrap());
}

#[test]
fn test_parent_hierarchy() {
    let cell = SpatialIndexer::new(9)
        .unwrap()
        .index(EIFFEL_TOWER.0, EIFFEL_TOWER.1)
        .unwrap();

    let parent = cell.parent(7).unwrap();
    assert_that!(parent.resolution(), eq(7));
    assert_eq!(parent.parent(5), cell.parent(5));
    assert_eq!(cell.parent(9), Some(cell));
    assert_eq!(cell.parent(10), None);
    assert_eq!(cell.parent(42), None);
}

#[test]
fn test_invalid_coordinates() {
    let indexer = SpatialIndexer::new(9).unwrap();
    for (lat, lon) in [
        (f64::NAN, 0.0),
        (0.0, f64::NAN),
        (f64::INFINITY, 10.0),
        (10.0, f64::NEG_INFINITY),
    ] {
        let err = indexer.index(lat, lon).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoordinate);
    }
}

#[test]
fn test_invalid_resolution() {
    let err = SpatialIndexer::new(16).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.context("resolution"), Some("16"));
    assert!(SpatialIndexer::new(15).is_ok());
}

#[test]
fn test_index_sample_from_e7() {
    let indexer = SpatialIndexer::new(9).unwrap();
    let sample = LocationSample::from_e7(488_583_700, 22_944_800)
        .with_timestamp_ms(1_500_000_000_000)
        .with_accuracy(12)
        .with_activity("STILL", 100);
    assert_eq!(
        indexer.index_sample(&sample).unwrap(),
        indexer.index(EIFFEL_TOWER.0, EIFFEL_TOWER.1).unwrap()
    );
}

#[test]
fn test_textual_identifier_round_trip() {
    let cell = SpatialIndexer::new(9)
        .unwrap()
        .index(STATUE_OF_LIBERTY.0, STATUE_OF_LIBERTY.1)
        .unwrap();
    let text = cell.to_string();
    assert_that!(text.len(), eq(15));
    assert_eq!(text.parse::<SpatialCell>().unwrap(), cell);
    assert_eq!(text.to_uppercase().parse::<SpatialCell>().unwrap(), cell);
    assert_eq!(SpatialCell::try_from(cell.id()).unwrap(), cell);
}

#[test]
fn test_malformed_identifiers() {
    for text in ["", "not-a-cell", "0", "ffffffffffffffff"] {
        let err = text.parse::<SpatialCell>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData, "{text:?}");
    }
    assert_eq!(
        SpatialCell::try_from(0u64).unwrap_err().kind(),
        ErrorKind::InvalidData
    );
}
