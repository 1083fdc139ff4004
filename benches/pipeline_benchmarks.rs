use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dupefind::duplicates::{verify_group, DuplicateFinder, FinderConfig};
use dupefind::scanner::{ContentHasher, Walker, WalkerConfig};
use dupefind::signal::CancelToken;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Binary tree of directories, `files_per_dir` files in each, every other
/// file a copy of the previous one.
fn setup_tree(depth: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fill_dir(temp_dir.path(), depth, files_per_dir);
    temp_dir
}

fn fill_dir(path: &Path, depth: usize, files_per_dir: usize) {
    fs::create_dir_all(path).expect("Failed to create dir");
    for i in 0..files_per_dir {
        let content = format!("content of pair {} in {}", i / 2, path.display());
        fs::write(path.join(format!("file_{i}.txt")), content).expect("Failed to write file");
    }
    if depth > 1 {
        for i in 0..2 {
            fill_dir(&path.join(format!("dir_{i}")), depth - 1, files_per_dir);
        }
    }
}

fn write_copies(dir: &Path, count: usize, size: usize) -> Vec<PathBuf> {
    let data = vec![b'a'; size];
    (0..count)
        .map(|i| {
            let path = dir.join(format!("copy_{i}.dat"));
            fs::write(&path, &data).expect("Failed to write bench file");
            path
        })
        .collect()
}

fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_tree(5, 10);

    let mut group = c.benchmark_group("walker");
    for page_size in [8, 128] {
        let config = WalkerConfig::default().with_page_size(page_size);
        group.bench_with_input(BenchmarkId::new("page_size", page_size), &config, |b, config| {
            b.iter(|| {
                let files: Vec<_> = Walker::new(temp_dir.path(), config.clone()).walk().collect();
                black_box(files);
            })
        });
    }
    group.finish();
}

fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancelToken::new();

    for size_kb in [1, 1024, 10240] {
        let path = write_copies(temp_dir.path(), 1, size_kb * 1024).remove(0);
        let hasher = ContentHasher::new(104_856);

        group.bench_with_input(BenchmarkId::new("stream", format!("{size_kb}KB")), &path, |b, path| {
            b.iter(|| black_box(hasher.hash_file(path, &cancel).unwrap()));
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");
    let cancel = CancelToken::new();

    for (count, size_kb) in [(2, 1024), (8, 1024), (2, 10240)] {
        let temp_dir = TempDir::new().unwrap();
        let paths = write_copies(temp_dir.path(), count, size_kb * 1024);

        group.bench_with_input(
            BenchmarkId::new(format!("{count}_copies"), format!("{size_kb}KB")),
            &paths,
            |b, paths| b.iter(|| black_box(verify_group(paths, 104_856, &cancel))),
        );
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let temp_dir = setup_tree(5, 10);
    let finder = DuplicateFinder::new(FinderConfig::default());

    c.bench_function("pipeline_310_files", |b| {
        b.iter(|| black_box(finder.collect_duplicates(temp_dir.path()).unwrap()))
    });
}

criterion_group!(benches, bench_walker, bench_hasher, bench_verify, bench_pipeline);
criterion_main!(benches);
