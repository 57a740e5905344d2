//! Performance benchmarks for per-entry hot paths.
//!
//! These benchmarks measure work done once per listed entry:
//! - Magic-byte image detection
//! - Path parsing and navigation for both strategies

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use engine::filetype::{sniff, HEADER_LEN};
use engine::fs::MemoryFileSystem;
use engine::platform::{PathStrategy, UnixPathStrategy, WindowsPathStrategy};

fn header(prefix: &[u8]) -> Vec<u8> {
    let mut buf = prefix.to_vec();
    buf.resize(HEADER_LEN, 0);
    buf
}

/// Benchmark signature matching, best and worst case.
fn bench_sniff(c: &mut Criterion) {
    let mut group = c.benchmark_group("sniff");
    group.throughput(Throughput::Bytes(HEADER_LEN as u64));

    // First table entry
    let png = header(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    group.bench_function("png", |b| b.iter(|| sniff(black_box(&png))));

    // Container brand lookup
    let avif = header(b"\x00\x00\x00\x1cftypavif");
    group.bench_function("avif", |b| b.iter(|| sniff(black_box(&avif))));

    // Text scan behind an XML declaration
    let svg = header(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\">");
    group.bench_function("svg", |b| b.iter(|| sniff(black_box(&svg))));

    // Falls through every check
    let text = header(b"The quick brown fox jumps over the lazy dog");
    group.bench_function("unknown", |b| b.iter(|| sniff(black_box(&text))));

    group.finish();
}

/// Benchmark path parsing on both platforms.
fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("paths");
    let fs = Arc::new(MemoryFileSystem::new());
    let unix = UnixPathStrategy::new(fs.clone());
    let windows = WindowsPathStrategy::new(fs);

    let deep_unix = "/home/user/projects/engine/crates/engine/src/providers/directory.rs";
    group.bench_function("unix_parse", |b| {
        b.iter(|| unix.parse_path(black_box(deep_unix)))
    });
    group.bench_function("unix_go_up", |b| {
        b.iter(|| unix.go_up_one_level(black_box(deep_unix)))
    });

    let deep_windows = r"c:/Users/user/Documents/Projects/engine/src/providers/file.rs";
    group.bench_function("windows_parse", |b| {
        b.iter(|| windows.parse_path(black_box(deep_windows)))
    });
    group.bench_function("windows_validate", |b| {
        b.iter(|| windows.is_valid_path(black_box(deep_windows)))
    });

    group.finish();
}

criterion_group!(benches, bench_sniff, bench_paths);

criterion_main!(benches);
