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

//! Reverse geocoding against a Nominatim server.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use hotcells::error::Error;
use hotcells::geocode::ReverseGeocoder;
use hotcells::spatial::Coordinate;
use serde::Deserialize;

/// The public OpenStreetMap instance.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// The public instance accepts at most one request per second.
pub const PUBLIC_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Spaces request starts at least `min_interval` apart, across threads.
#[derive(Debug)]
struct RequestGate {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RequestGate {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Blocks until the next request may start and records its start.
    fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        // Held while sleeping so waiting callers line up behind each other.
        let mut last_start = self.last_start.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last_start = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Resolves coordinates through the `/reverse` endpoint of a Nominatim server.
///
/// Requests to [`DEFAULT_ENDPOINT`] are spaced [`PUBLIC_MIN_INTERVAL`] apart
/// however many lookups run at once.
#[derive(Debug)]
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
    gate: RequestGate,
}

impl NominatimGeocoder {
    /// Creates a geocoder for `endpoint` whose requests give up after `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hotcells/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::lookup_failed("failed to build HTTP client").set_source(err))?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let min_interval = if endpoint == DEFAULT_ENDPOINT {
            PUBLIC_MIN_INTERVAL
        } else {
            Duration::ZERO
        };
        Ok(Self {
            client,
            endpoint,
            gate: RequestGate::new(min_interval),
        })
    }

    /// Sets the minimum time between the starts of two requests.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.gate = RequestGate::new(min_interval);
        self
    }

    /// Returns the minimum time between the starts of two requests.
    pub fn min_interval(&self) -> Duration {
        self.gate.min_interval
    }

    fn url(&self) -> String {
        format!("{}/reverse", self.endpoint)
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse_geocode(&self, at: Coordinate) -> Result<Vec<String>, Error> {
        let latitude = at.latitude.to_string();
        let longitude = at.longitude.to_string();
        self.gate.wait();
        let response = self
            .client
            .get(self.url())
            .query(&[
                ("format", "jsonv2"),
                ("lat", latitude.as_str()),
                ("lon", longitude.as_str()),
            ])
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| {
                Error::lookup_failed("reverse geocoding request failed")
                    .with_context("coordinate", at)
                    .set_source(err)
            })?;
        let body: ReverseResponse = response.json().map_err(|err| {
            Error::lookup_failed("malformed reverse geocoding response")
                .with_context("coordinate", at)
                .set_source(err)
        })?;

        // "Unable to geocode" comes back as a 200 without a display name.
        Ok(body.display_name.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[test]
    fn test_endpoint_is_normalized() {
        let geocoder =
            NominatimGeocoder::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_that!(geocoder.url(), eq("http://localhost:8080/reverse"));
    }

    #[test]
    fn test_public_endpoint_is_paced() {
        let public = NominatimGeocoder::new(format!("{DEFAULT_ENDPOINT}/"), Duration::from_secs(1))
            .unwrap();
        assert_that!(public.min_interval(), eq(PUBLIC_MIN_INTERVAL));

        let private =
            NominatimGeocoder::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert_that!(private.min_interval(), eq(Duration::ZERO));
        let private = private.with_min_interval(Duration::from_millis(250));
        assert_that!(private.min_interval(), eq(Duration::from_millis(250)));
    }

    #[test]
    fn test_gate_spaces_requests_across_threads() {
        let interval = Duration::from_millis(40);
        let gate = RequestGate::new(interval);
        let started = Instant::now();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| gate.wait());
            }
        });
        // The first caller passes at once, each later one waits a full interval.
        assert_that!(started.elapsed(), ge(interval * 3));
    }

    #[test]
    fn test_gate_without_interval_never_records() {
        let gate = RequestGate::new(Duration::ZERO);
        gate.wait();
        gate.wait();
        assert!(gate.last_start.lock().unwrap().is_none());
    }

    #[test]
    fn test_unreachable_server_fails_lookup() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let geocoder =
            NominatimGeocoder::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = geocoder
            .reverse_geocode(Coordinate::new(52.372, 4.895))
            .unwrap_err();
        assert_eq!(err.kind(), hotcells::error::ErrorKind::ExternalLookupFailure);
        assert!(err.context("coordinate").is_some());
    }
}
