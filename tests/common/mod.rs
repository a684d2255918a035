#![allow(dead_code)]

use vlbi::nodes::NodeCollection;
use vlbi::stream::{Location, SampleStream};
use vlbi::time::epoch_from_j2000_seconds;

/// Route `tracing` output of the library through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A constant recording of `samples` values taken at `sample_rate`, starting at J2000.
pub fn station_stream(lat: f64, lon: f64, samples: usize, sample_rate: f64) -> SampleStream {
    SampleStream::from_samples(vec![1.0; samples])
        .with_start(epoch_from_j2000_seconds(0.0))
        .with_sample_rate(sample_rate)
        .with_location(Location::geographic(lat, lon, 0.0).unwrap())
}

/// `n` stations on a small ring around (45°N, 7°E), named `s0`, `s1`, …
pub fn ring(n: usize, samples: usize) -> NodeCollection {
    let mut nodes = NodeCollection::new();
    for i in 0..n {
        let angle = i as f64 / n as f64 * std::f64::consts::TAU;
        let stream = station_stream(
            45.0 + 0.01 * angle.sin(),
            7.0 + 0.01 * angle.cos(),
            samples,
            1.0,
        );
        nodes.add(&format!("s{i}"), stream).unwrap();
    }
    nodes
}

/// Little-endian `f64` buffer, the `-64` bits-per-sample layout.
pub fn f64_bytes(samples: &[f64]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
