use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use solr_connector::cache::{CacheKey, MemoryStore, MetadataStore};
use solr_connector::query::{encoded_len, SelectQuery, UpdateQuery};
use solr_connector::stats::{phps, StatsSummary};
use solr_connector::version::{branch, lucene_match_version, normalize_version, schema_version_from_name};
use tokio::runtime::Runtime;

/// Serialized mbeans listing with `beans` query handler entries
fn mbeans_payload(beans: usize) -> String {
    let mut handlers = String::new();
    for i in 0..beans {
        let name = format!("/handler{}", i);
        handlers.push_str(&format!(
            "s:{}:\"{}\";a:1:{{s:5:\"stats\";a:2:{{s:8:\"requests\";i:{};s:6:\"errors\";i:0;}}}}",
            name.len(),
            name,
            i
        ));
    }

    format!(
        concat!(
            "a:1:{{s:11:\"solr-mbeans\";a:4:{{",
            "i:0;s:12:\"QUERYHANDLER\";i:1;a:{}:{{{}}}",
            "i:2;s:6:\"UPDATE\";i:3;a:1:{{s:13:\"updateHandler\";a:1:{{s:5:\"stats\";",
            "a:1:{{s:11:\"docsPending\";i:7;}}}}}}}}}}"
        ),
        beans, handlers
    )
}

/// Stats decoding benchmarks
fn bench_stats_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_decoding");

    for beans in [10, 100, 1000].iter() {
        let payload = mbeans_payload(*beans);

        group.bench_with_input(BenchmarkId::new("phps_decode", beans), &payload, |b, payload| {
            b.iter(|| black_box(phps::decode(payload.as_bytes())));
        });

        let decoded = phps::decode(payload.as_bytes()).unwrap();
        group.bench_with_input(BenchmarkId::new("summary", beans), &decoded, |b, decoded| {
            b.iter(|| black_box(StatsSummary::from_mbeans(decoded, "drupal-4.2".to_string())));
        });
    }

    group.finish();
}

/// Version string helpers
fn bench_version_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_helpers");

    group.bench_function("negotiate_components", |b| {
        b.iter(|| {
            let version = normalize_version(black_box("8.11"));
            black_box((branch(&version), lucene_match_version(&version)));
        });
    });

    group.bench_function("schema_version", |b| {
        b.iter(|| black_box(schema_version_from_name(black_box("drupal-4.2-solr-8.x"))));
    });

    group.finish();
}

/// Request builder benchmarks
fn bench_request_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_builders");

    for docs in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("update_to_json", docs), docs, |b, &docs| {
            let update = UpdateQuery::new()
                .add_documents((0..docs).map(|i| json!({"id": format!("node-{}", i), "title": "benchmark"})))
                .commit(false);
            b.iter(|| black_box(update.to_json()));
        });
    }

    group.bench_function("select_encoded_len", |b| {
        let query = SelectQuery::new("title:rust AND body:\"async runtime\"")
            .filter("type:article")
            .fields(["id", "score"])
            .sort("score desc");
        b.iter(|| black_box(encoded_len(&query.to_params())));
    });

    group.finish();
}

/// Durable metadata store benchmarks
fn bench_metadata_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("metadata_store");

    for entries in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("memory_set_get", entries), entries, |b, &entries| {
            b.to_async(&rt).iter(|| async move {
                let store = MemoryStore::new();
                for i in 0..entries {
                    let key = CacheKey::new(format!("http://solr{}:8983/solr/", i % 4), format!("admin/h{}", i));
                    store.set(&key, json!({"i": i})).await.unwrap();
                }

                let key = CacheKey::new("http://solr0:8983/solr/", "admin/h0");
                black_box(store.get(&key).await.unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_stats_decoding,
    bench_version_helpers,
    bench_request_builders,
    bench_metadata_store
);

criterion_main!(benches);
