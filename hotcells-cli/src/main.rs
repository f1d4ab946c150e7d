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

//! Ranks the most visited places of a location history export.

mod nominatim;
mod takeout;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hotcells::geocode::Offline;
use hotcells::geocode::ReverseGeocoder;
use hotcells::pipeline::Pipeline;
use hotcells::pipeline::PipelineConfig;
use hotcells::pipeline::TracingObserver;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::nominatim::NominatimGeocoder;

#[derive(Parser, Debug)]
#[command(name = "hotcells")]
#[command(about = "Ranks the most visited places of a location history export")]
struct Args {
    /// Location history export to read
    #[arg(default_value = "locations.json")]
    input: PathBuf,

    /// Hexagonal grid resolution, 0 (coarsest) to 15
    #[arg(short, long, default_value_t = hotcells::pipeline::DEFAULT_RESOLUTION)]
    resolution: u8,

    /// Number of cells tracked by the sketch
    #[arg(short, long, default_value_t = hotcells::pipeline::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Number of places to report
    #[arg(short = 'k', long = "top", default_value_t = hotcells::pipeline::DEFAULT_TOP_K)]
    top: usize,

    /// Concurrent reverse geocoding lookups
    #[arg(short, long, default_value_t = hotcells::pipeline::DEFAULT_LOOKUP_WORKERS)]
    workers: usize,

    /// Seconds before a lookup is given up on, 0 to wait forever
    #[arg(long, default_value_t = hotcells::pipeline::DEFAULT_LOOKUP_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Skip reverse geocoding
    #[arg(long)]
    offline: bool,

    /// Do not count distinct cells exactly
    #[arg(long)]
    no_exact_tally: bool,

    /// Nominatim server used for reverse geocoding
    #[arg(long, default_value = nominatim::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Milliseconds between geocoding requests [default: 1000 for the public
    /// server, 0 otherwise]
    #[arg(long)]
    min_interval_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let timeout = (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs));
    let config = PipelineConfig::builder()
        .resolution(args.resolution)
        .capacity(args.capacity)
        .top_k(args.top)
        .exact_tally(!args.no_exact_tally)
        .lookup_workers(args.workers)
        .lookup_timeout(timeout)
        .build()
        .context("invalid configuration")?;

    let geocoder: Arc<dyn ReverseGeocoder> = if args.offline {
        Arc::new(Offline)
    } else {
        // The client gives up slightly after the pipeline does.
        let request_timeout = timeout.unwrap_or(Duration::from_secs(60)) + Duration::from_secs(1);
        let mut nominatim = NominatimGeocoder::new(args.endpoint.as_str(), request_timeout)?;
        if let Some(ms) = args.min_interval_ms {
            nominatim = nominatim.with_min_interval(Duration::from_millis(ms));
        }
        tracing::info!(
            endpoint = %args.endpoint,
            min_interval = ?nominatim.min_interval(),
            "reverse geocoding through nominatim"
        );
        Arc::new(nominatim)
    };

    let samples = takeout::load_samples(&args.input)?;
    tracing::info!(input = %args.input.display(), samples = samples.len(), "loaded export");

    let pipeline = Pipeline::with_shared_geocoder(config, geocoder, TracingObserver);
    let report = pipeline.run(samples)?;
    println!("{report}");
    Ok(())
}
