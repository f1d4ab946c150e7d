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

//! Location samples consumed by the pipeline.

/// Scale of fixed-point coordinates expressed in 1e-7 degrees.
pub const E7_SCALE: f64 = 1e7;

/// An activity classification attached to a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Classifier label, for example `STILL` or `ON_FOOT`.
    pub kind: String,
    /// Classifier confidence, usually in `0..=100`.
    pub confidence: u8,
}

/// One geolocation fix.
///
/// Only `latitude` and `longitude` are interpreted by the pipeline; the
/// remaining fields are carried for callers and never inspected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSample {
    /// Capture time in milliseconds since the Unix epoch, if known.
    pub timestamp_ms: Option<i64>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Reported horizontal accuracy in meters.
    pub accuracy: Option<u32>,
    /// Activity classifications, most confident first.
    pub activities: Vec<Activity>,
}

impl LocationSample {
    /// Creates a sample from coordinates in degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    /// Creates a sample from fixed-point coordinates in 1e-7 degrees.
    ///
    /// ```
    /// # use hotcells::sample::LocationSample;
    /// let sample = LocationSample::from_e7(523_520_000, 131_940_000);
    /// assert!((sample.latitude - 52.352).abs() < 1e-9);
    /// ```
    pub fn from_e7(latitude_e7: i64, longitude_e7: i64) -> Self {
        Self::new(
            latitude_e7 as f64 / E7_SCALE,
            longitude_e7 as f64 / E7_SCALE,
        )
    }

    /// Sets the capture timestamp.
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Sets the horizontal accuracy.
    pub fn with_accuracy(mut self, accuracy: u32) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Appends an activity classification.
    pub fn with_activity(mut self, kind: impl Into<String>, confidence: u8) -> Self {
        self.activities.push(Activity {
            kind: kind.into(),
            confidence,
        });
        self
    }
}
