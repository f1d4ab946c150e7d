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

//! Ranks the most visited places of a location history.
//!
//! The crate turns an unbounded stream of geolocation samples into a short,
//! ranked list of places, using bounded memory:
//!
//! - [`spatial`] snaps coordinates to cells of the H3 hexagonal grid, so
//!   nearby noisy fixes count as the same place.
//! - [`topk`] holds [`topk::TopKSketch`], a Space-Saving sketch that tracks the
//!   heaviest cells in `O(C)` memory with per-cell error bounds.
//! - [`tally`] holds [`tally::ExactTally`], exact counts used for the
//!   distinct-cell and compression figures of the run summary.
//! - [`pipeline`] wires sample ingestion, ranking and reverse geocoding
//!   together.
//! - [`geocode`] defines the reverse geocoding collaborator.
//!
//! Reading input files, talking to a concrete geocoding service and setting up
//! logging are left to the caller; the `hotcells` binary does all three.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod geocode;
pub mod pipeline;
pub mod sample;
pub mod spatial;
pub mod tally;
pub mod topk;
