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

//! Decoding of the location history JSON export.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use hotcells::sample::LocationSample;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LocationHistory {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    timestamp_ms: Option<String>,
    latitude_e7: i64,
    longitude_e7: i64,
    accuracy: Option<u32>,
    #[serde(default)]
    activity: Vec<ActivityAt>,
}

#[derive(Debug, Deserialize)]
struct ActivityAt {
    #[serde(default)]
    activity: Vec<Classification>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    #[serde(rename = "type")]
    kind: String,
    confidence: u8,
}

impl From<Location> for LocationSample {
    fn from(location: Location) -> Self {
        let mut sample = LocationSample::from_e7(location.latitude_e7, location.longitude_e7);
        // Timestamps are decimal strings; an unparsable one is dropped.
        if let Some(ts) = location.timestamp_ms.and_then(|ts| ts.parse().ok()) {
            sample = sample.with_timestamp_ms(ts);
        }
        if let Some(accuracy) = location.accuracy {
            sample = sample.with_accuracy(accuracy);
        }
        for classification in location.activity.into_iter().flat_map(|at| at.activity) {
            sample = sample.with_activity(classification.kind, classification.confidence);
        }
        sample
    }
}

/// Decodes every location of an export read from `reader`.
pub fn read_samples<R: Read>(reader: R) -> anyhow::Result<Vec<LocationSample>> {
    let history: LocationHistory =
        serde_json::from_reader(reader).context("failed to decode location history")?;
    Ok(history
        .locations
        .into_iter()
        .map(LocationSample::from)
        .collect())
}

/// Decodes the export stored at `path`.
pub fn load_samples(path: &Path) -> anyhow::Result<Vec<LocationSample>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_samples(BufReader::new(file)).with_context(|| format!("in {}", path.display()))
}
