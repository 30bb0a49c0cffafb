//! Performance benchmarks for appscout.
//!
//! Run with: cargo bench
//!
//! Target performance:
//! - Search over 2000 entries: < 1ms
//! - Walk of a small tree: < 10ms

use std::fs;
use std::path::Path;

use appscout::config::DiscoveryConfig;
use appscout::core::{ArtifactKind, ArtifactRecord, Deduplicator, DiscoverySource};
use appscout::services::walker::DirectoryWalker;
use appscout::RankedSearchEngine;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const WORDS: [&str; 8] = [
    "code", "studio", "terminal", "mail", "player", "editor", "notes", "preview",
];

/// Synthetic catalog shaped like a real install: bundles with identities
/// plus loose executables.
fn synthetic_catalog(size: usize) -> appscout::Catalog {
    let records = (0..size).map(|i| {
        let a = WORDS[i % WORDS.len()];
        let b = WORDS[(i / WORDS.len()) % WORDS.len()];
        if i % 3 == 0 {
            ArtifactRecord::new(
                format!("{}{}{}", a, b, i),
                format!("/usr/bin/{}{}{}", a, b, i),
                ArtifactKind::Executable,
                DiscoverySource::Walker,
            )
        } else {
            ArtifactRecord::new(
                format!("{} {} {}", a, b, i),
                format!("/Applications/{} {} {}.app", a, b, i),
                ArtifactKind::Bundle,
                DiscoverySource::Walker,
            )
            .with_identity(Some(format!("com.bench.{}.{}.{}", a, b, i)))
        }
    });
    Deduplicator::merge(records, Vec::new()).0
}

fn bench_search(c: &mut Criterion) {
    let engine = RankedSearchEngine;
    let catalog = synthetic_catalog(2000);

    let queries = [
        ("exact", "code studio 9"),
        ("prefix", "term"),
        ("contains", "player"),
        ("identity", "com.bench"),
        ("fuzzy", "cdst"),
        ("miss", "zzzz"),
    ];

    let mut group = c.benchmark_group("search");
    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, query| {
            b.iter(|| black_box(engine.search(&catalog, black_box(query))))
        });
    }
    group.finish();
}

fn build_tree(root: &Path) {
    for i in 0..20 {
        let dir = root.join(format!("pkg{}", i)).join("bin");
        fs::create_dir_all(&dir).unwrap();
        for j in 0..10 {
            let tool = dir.join(format!("tool{}", j));
            fs::write(&tool, "#!/bin/sh\n").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        let bundle = root.join(format!("App{}.app", i)).join("Contents");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("Info.plist"), "<plist></plist>").unwrap();
    }
}

fn bench_walk(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    build_tree(tmp.path());
    let walker = DirectoryWalker::new(&DiscoveryConfig::default());

    c.bench_function("walk_tree", |b| {
        b.iter(|| black_box(walker.walk(tmp.path()).count()))
    });
}

criterion_group!(benches, bench_search, bench_walk);

criterion_main!(benches);
