use criterion::{Criterion, black_box, criterion_group, criterion_main};
use gomotion_common::shm::p2p::{ModuleAbbrev, TypedP2pReader, TypedP2pWriter};

#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
struct BenchPayload {
    serial_number: u64,
    joints: [f64; 7],
}

fn bench_write_read(c: &mut Criterion) {
    let name = "bench_p2p_roundtrip";
    let mut writer = TypedP2pWriter::<BenchPayload>::create(name, ModuleAbbrev::Traj, ModuleAbbrev::Servo)
        .expect("create segment");
    let mut reader = TypedP2pReader::<BenchPayload>::attach(name, 10_000).expect("attach segment");

    c.bench_function("p2p_write", |b| {
        let mut serial = 0u64;
        b.iter(|| {
            serial += 1;
            writer.write(black_box(BenchPayload { serial_number: serial, joints: [0.0; 7] }));
        })
    });

    c.bench_function("p2p_read", |b| {
        b.iter(|| black_box(reader.read().unwrap()));
    });

    let _ = std::fs::remove_file("/dev/shm/gomotion_bench_p2p_roundtrip");
}

criterion_group!(benches, bench_write_read);
criterion_main!(benches);
