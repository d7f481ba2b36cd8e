use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::Path;

fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let bytes = std::fs::read(path).unwrap();
    quotechain::parser::header::decode_raw_bytes(&bytes)
}

fn bench_decode_mime(c: &mut Criterion) {
    let nested = load_fixture("nested_mixed.eml");
    let japanese = load_fixture("japanese_thread_qp.eml");

    c.bench_function("decode_nested_mixed", |b| {
        b.iter(|| quotechain::decode_mime_body(black_box(&nested)))
    });
    c.bench_function("decode_japanese_qp", |b| {
        b.iter(|| quotechain::decode_mime_body(black_box(&japanese)))
    });
}

fn bench_quote_chain(c: &mut Criterion) {
    let mut body = String::from("Latest reply\n\n");
    for depth in 0..20 {
        let prefix = ">".repeat(depth);
        let sep = if depth == 0 { "" } else { " " };
        body.push_str(&format!(
            "{prefix}{sep}2026年2月{}日(木) 10:{:02} User{depth} <user{depth}@example.com>:\n",
            depth % 28 + 1,
            depth
        ));
        let quoted = ">".repeat(depth + 1);
        for line in 0..5 {
            body.push_str(&format!("{quoted} message {depth} line {line}\n"));
        }
        body.push_str(&format!("{quoted}\n"));
    }

    c.bench_function("parse_quote_chain_depth_20", |b| {
        b.iter(|| quotechain::parse_quote_chain(black_box(&body)))
    });
}

fn bench_assemble_thread(c: &mut Criterion) {
    let raw = load_fixture("japanese_thread_qp.eml");
    let config = quotechain::config::Config::default();

    c.bench_function("assemble_thread_japanese", |b| {
        b.iter(|| quotechain::thread::assemble_thread(black_box(&raw), &config))
    });
}

criterion_group!(
    benches,
    bench_decode_mime,
    bench_quote_chain,
    bench_assemble_thread
);
criterion_main!(benches);
