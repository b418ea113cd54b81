use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use trustchain_web::{fingerprint, liability::LiabilityScores, verification};

fn bench_fingerprint(c: &mut Criterion) {
    // 1 MiB 的伪造媒体内容
    let payload = vec![0x5au8; 1024 * 1024];

    c.bench_function("sha256_1mib", |b| {
        b.iter(|| fingerprint::sha256_hex(black_box(&payload)))
    });
}

fn bench_liability(c: &mut Criterion) {
    let scores: LiabilityScores = serde_json::from_value(json!({
        "user": { "percentage": 42.5, "raw_score": 0.61, "factors": {
            "disclosure_stripped": { "points": 0.2, "max": 0.2, "legal_basis": "IT Rules 2021, Rule 3(1)(b)" },
            "prior_offences": 0.05
        }},
        "platform": { "percentage": 35.0, "raw_score": 0.5, "factors": { "response_delay": { "score": 0.3 } } },
        "architect": { "percentage": 22.5, "raw_score": 0.32, "factors": {} },
        "explanation": "User bears the largest share."
    }))
    .unwrap();

    c.bench_function("liability_breakdown", |b| {
        b.iter(|| black_box(&scores).breakdown())
    });
}

fn bench_verification(c: &mut Criterion) {
    let canonical = json!({
        "registered_on_chain": true,
        "blockchain_timestamp": 1709287200,
        "case_id": "0f2c9a1e",
        "file_hash": "ab12"
    });
    let record = json!({
        "id": "0f2c9a1e",
        "detection": { "confidence": 0.91 },
        "blockchain": { "tx_id": "0xfeed", "timestamp": "2024-03-01T10:00:00+00:00" }
    });

    c.bench_function("resolve_canonical", |b| {
        b.iter(|| verification::resolve(black_box(&canonical)))
    });
    c.bench_function("resolve_evidence_record", |b| {
        b.iter(|| verification::resolve(black_box(&record)))
    });
}

criterion_group!(benches, bench_fingerprint, bench_liability, bench_verification);
criterion_main!(benches);
