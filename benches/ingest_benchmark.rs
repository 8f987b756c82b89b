//! Performance benchmarks for MediaIngest
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

/// Create a JPEG-looking test file of the specified size
fn create_media_file(dir: &std::path::Path, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();

    // JPEG magic so the classifier accepts the file
    file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46])
        .unwrap();

    let chunk_size = 64 * 1024;
    let chunk: Vec<u8> = (0..chunk_size).map(|i| (i % 256) as u8).collect();
    let mut remaining = size.saturating_sub(10);

    while remaining > 0 {
        let to_write = remaining.min(chunk_size);
        file.write_all(&chunk[..to_write]).unwrap();
        remaining -= to_write;
    }

    path
}

fn bench_import_small_files(c: &mut Criterion) {
    let src_dir = TempDir::new().unwrap();

    // 100 small photos, each with distinct content
    for i in 0..100 {
        let path = create_media_file(src_dir.path(), &format!("photo_{}.jpg", i), 4096);
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(format!("#{}", i).as_bytes()).unwrap();
    }

    c.bench_function("import_100_small_photos", |b| {
        b.iter(|| {
            let dst_dir = TempDir::new().unwrap();
            let job = mediaingest::config::ImportJob {
                source: src_dir.path().to_path_buf(),
                originals: dst_dir.path().to_path_buf(),
                workers: 4,
                ..Default::default()
            };

            let importer = mediaingest::core::Importer::new(job);
            let _ = black_box(importer.start());
        });
    });
}

fn bench_fingerprint_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint_algorithms");

    let data_size = 10 * 1024 * 1024; // 10 MB
    let data: Vec<u8> = (0..data_size).map(|i| (i % 256) as u8).collect();

    group.throughput(Throughput::Bytes(data_size as u64));

    for algo in [
        mediaingest::config::FingerprintAlgorithm::XXHash3,
        mediaingest::config::FingerprintAlgorithm::Blake3,
        mediaingest::config::FingerprintAlgorithm::Sha256,
    ] {
        group.bench_with_input(BenchmarkId::new("fingerprint", algo.name()), &data, |b, data| {
            b.iter(|| black_box(mediaingest::hash::fingerprint_bytes(data, algo)));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let photo = create_media_file(dir.path(), "sample.jpg", 512 * 1024);

    let classifier = mediaingest::classify::Classifier::new();

    c.bench_function("classify_photo", |b| {
        b.iter(|| black_box(classifier.classify(&photo).unwrap()));
    });
}

fn bench_directory_scan(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();

    // Create test structure
    for i in 0..10 {
        let subdir = dir.path().join(format!("card_{}", i));
        std::fs::create_dir_all(&subdir).unwrap();

        for j in 0..100 {
            create_media_file(&subdir, &format!("photo_{}.jpg", j), 1024);
        }
    }

    c.bench_function("scan_1000_files", |b| {
        b.iter(|| {
            let policy = mediaingest::fs::ScanPolicy::default();
            let scanner = mediaingest::fs::Scanner::new(policy).unwrap();
            black_box(scanner.scan(dir.path()).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_import_small_files,
    bench_fingerprint_algorithms,
    bench_classify,
    bench_directory_scan
);

criterion_main!(benches);
