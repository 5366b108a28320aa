//! # Communication Budget Guard Benchmark

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use comms_if::{
    net::{Transport, TransportError},
    proto::{PheromoneSector, RobotPose, VictimReport},
};
use robot_lib::{comms::CommsGuard, data_store::DataStore};
use std::time::Duration;

/// Transport which accepts everything and never receives.
struct NullTransport;

impl Transport for NullTransport {
    fn broadcast(&mut self, _datagram: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }
}

fn comms_guard_benchmark(c: &mut Criterion) {
    // ---- Build a saturated data store ----

    let make_ds = || {
        let mut ds = DataStore::default();
        for i in 0..10 {
            ds.outbound.push_pose(RobotPose {
                x_mm: i,
                y_mm: i,
                heading_rad: 0.0,
            });
            ds.outbound.push_victim(VictimReport {
                x_mm: i,
                y_mm: i,
                tag_id: format!("02005{:05X}", i),
            }, Duration::from_millis(i as u64));
            ds.outbound.push_pheromone(PheromoneSector {
                sector_id: i as u32,
                intensities: vec![128; 64],
            });
        }
        ds
    };

    let mut guard = CommsGuard::new(1, 0, 8, 1024).unwrap();
    let mut transport = NullTransport;

    c.bench_function("CommsGuard::exchange", |b| {
        b.iter_batched(
            make_ds,
            |mut ds| guard.exchange(&mut ds, &mut transport),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, comms_guard_benchmark);
criterion_main!(benches);
