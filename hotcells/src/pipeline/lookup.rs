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

//! Bounded, timed fan-out of reverse geocoding calls.
//!
//! A fixed pool of workers pulls centroids from a shared queue. With a
//! timeout, each call runs on its own short-lived thread so the worker can
//! stop waiting; a call that overruns is abandoned and its answer dropped.
//!
//! Every running call holds one of `workers` permits until it returns, so an
//! abandoned call still counts against the limit. A job that cannot get a
//! permit within the timeout is reported as timed out without being made.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvTimeoutError;
use crossbeam_channel::Sender;

use crate::error::Error;
use crate::geocode::ReverseGeocoder;
use crate::spatial::Coordinate;

/// How a single lookup ended.
#[derive(Debug)]
pub(crate) enum LookupOutcome {
    Answered(Vec<String>),
    Failed(Error),
    TimedOut(Error),
}

impl From<Result<Vec<String>, Error>> for LookupOutcome {
    fn from(result: Result<Vec<String>, Error>) -> Self {
        match result {
            Ok(addresses) => LookupOutcome::Answered(addresses),
            Err(err) => LookupOutcome::Failed(err),
        }
    }
}

/// A slot in the concurrency limit, handed back when dropped.
struct Permit(Sender<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        // The pool is gone once every job has an outcome.
        let _ = self.0.send(());
    }
}

struct Permits {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Permits {
    fn new(count: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(count);
        for _ in 0..count {
            tx.send(()).expect("permit pool has room for every permit");
        }
        Self { tx, rx }
    }

    fn acquire(&self, timeout: Duration) -> Option<Permit> {
        self.rx
            .recv_timeout(timeout)
            .ok()
            .map(|()| Permit(self.tx.clone()))
    }
}

/// Resolves every centroid, returning outcomes in input order.
pub(crate) fn resolve_all<G>(
    geocoder: &Arc<G>,
    centroids: &[Coordinate],
    workers: usize,
    timeout: Option<Duration>,
) -> Vec<LookupOutcome>
where
    G: ReverseGeocoder + ?Sized + 'static,
{
    if centroids.is_empty() {
        return Vec::new();
    }

    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    for job in centroids.iter().copied().enumerate() {
        job_tx.send(job).expect("job queue receiver is alive");
    }
    drop(job_tx);

    let workers = workers.clamp(1, centroids.len());
    let permits = Permits::new(workers);
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let permits = &permits;
            scope.spawn(move || {
                for (position, at) in job_rx.iter() {
                    let outcome = match timeout {
                        Some(timeout) => resolve_timed(geocoder, at, timeout, permits),
                        None => resolve_inline(geocoder.as_ref(), at),
                    };
                    if result_tx.send((position, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut outcomes: Vec<Option<LookupOutcome>> = centroids.iter().map(|_| None).collect();
    for (position, outcome) in result_rx.iter() {
        outcomes[position] = Some(outcome);
    }
    outcomes
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|| {
                LookupOutcome::Failed(Error::lookup_failed("lookup worker exited early"))
            })
        })
        .collect()
}

fn panicked() -> Error {
    Error::lookup_failed("reverse geocoder panicked")
}

fn resolve_inline<G>(geocoder: &G, at: Coordinate) -> LookupOutcome
where
    G: ReverseGeocoder + ?Sized,
{
    std::panic::catch_unwind(AssertUnwindSafe(|| geocoder.reverse_geocode(at)))
        .unwrap_or_else(|_| Err(panicked()))
        .into()
}

fn resolve_timed<G>(
    geocoder: &Arc<G>,
    at: Coordinate,
    timeout: Duration,
    permits: &Permits,
) -> LookupOutcome
where
    G: ReverseGeocoder + ?Sized + 'static,
{
    let Some(permit) = permits.acquire(timeout) else {
        return LookupOutcome::TimedOut(Error::lookup_timed_out(timeout));
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    let geocoder = Arc::clone(geocoder);
    let spawned = thread::Builder::new()
        .name("hotcells-lookup".to_string())
        .spawn(move || {
            let _permit = permit;
            // The receiver is gone if the call timed out.
            let _ = tx.send(geocoder.reverse_geocode(at));
        });
    if let Err(err) = spawned {
        return LookupOutcome::Failed(
            Error::lookup_failed("cannot spawn lookup thread").set_source(err),
        );
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result.into(),
        Err(RecvTimeoutError::Timeout) => LookupOutcome::TimedOut(Error::lookup_timed_out(timeout)),
        Err(RecvTimeoutError::Disconnected) => LookupOutcome::Failed(panicked()),
    }
}
