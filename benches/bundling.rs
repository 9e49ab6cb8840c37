//! Benchmarks for bundling operations.
//!
//! These benchmarks measure the performance of bundling generated spec trees
//! of various sizes, from a handful of schema files to several hundred.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oapi_bundler::bundle::{render, Bundler};
use oapi_bundler::config::BundleOptions;
use oapi_bundler::merge::parse_fragment;
use oapi_bundler::path::normalize;
use std::fmt::Write;
use std::path::Path;

/// Write a spec tree with `schemas` schema files, each referencing the next
/// one, and one path per schema.
fn generate_tree(dir: &Path, schemas: usize) -> String {
    std::fs::create_dir_all(dir.join("schemas")).unwrap();

    let mut entry = String::from("openapi: 3.1.0\ninfo:\n  title: Bench\n  version: 1.0.0\npaths:\n");
    for i in 0..schemas {
        writeln!(
            entry,
            "  /items{i}:\n    get:\n      responses:\n        '200':\n          description: ok\n          content:\n            application/json:\n              schema:\n                $ref: schemas/item{i}.yaml#/Item{i}"
        )
        .unwrap();

        let next = (i + 1) % schemas;
        let schema = format!(
            "Item{i}:\n  type: object\n  properties:\n    id:\n      type: integer\n    next:\n      $ref: item{next}.yaml#/Item{next}\n"
        );
        std::fs::write(dir.join(format!("schemas/item{i}.yaml")), schema).unwrap();
    }

    let path = dir.join("openapi.yaml");
    std::fs::write(&path, entry).unwrap();
    path.to_string_lossy().to_string()
}

fn bench_bundle(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle");
    let bundler = Bundler::new(BundleOptions::default()).unwrap();

    for schemas in [10, 50, 200] {
        let dir = tempfile::tempdir().unwrap();
        let entry = generate_tree(dir.path(), schemas);
        group.bench_with_input(BenchmarkId::new("schemas", schemas), &entry, |b, entry| {
            b.iter(|| bundler.bundle(black_box(entry)).unwrap())
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let entry = generate_tree(dir.path(), 100);
    let document = Bundler::new(BundleOptions::default())
        .unwrap()
        .bundle(&entry)
        .unwrap();

    c.bench_function("render_yaml", |b| b.iter(|| render(black_box(&document))));
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("paths");
    group.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box("specs/./v1/../v2/schemas/../schemas/user.yaml")))
    });
    group.bench_function("parse_fragment", |b| {
        b.iter(|| parse_fragment(black_box("/paths/~1pets~1{id}/get/responses/200")))
    });
    group.finish();
}

criterion_group!(benches, bench_bundle, bench_render, bench_paths);
criterion_main!(benches);
