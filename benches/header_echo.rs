use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use headerecho::echo::HttpCodec;
use headerecho::{EchoedHeaders, USER_AGENTS};
use tokio_util::codec::Decoder;

fn request_with_headers(count: usize) -> String {
    let mut request = format!(
        "GET / HTTP/1.1\r\nHost: 127.0.0.1:5000\r\nUser-Agent: {}\r\n",
        USER_AGENTS[0]
    );
    for i in 0..count {
        request.push_str(&format!("X-Bench-{i}: value-{i}\r\n"));
    }
    request.push_str("\r\n");
    request
}

fn bench_decode_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_and_render");

    for count in [4, 16, 48] {
        let raw = request_with_headers(count);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::new("headers", count), &raw, |b, raw| {
            b.iter(|| {
                let mut codec = HttpCodec::new(64 * 1024, 64);
                let mut buf = BytesMut::from(raw.as_str());
                let head = codec.decode(black_box(&mut buf)).unwrap().unwrap();
                EchoedHeaders::from_head(&head).to_json().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_fold_duplicates(c: &mut Criterion) {
    let pairs: Vec<(String, String)> = (0..32)
        .map(|i| (format!("X-Dup-{}", i % 4), format!("v{i}")))
        .collect();

    c.bench_function("fold_duplicate_headers", |b| {
        b.iter(|| EchoedHeaders::from_pairs(black_box(&pairs).iter().map(|(n, v)| (n, v))))
    });
}

criterion_group!(benches, bench_decode_and_render, bench_fold_duplicates);
criterion_main!(benches);
