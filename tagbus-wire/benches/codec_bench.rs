#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use tagbus_core::{Protocol, Record, RecordType, Value};
use tagbus_wire::EventCodec;

// The twelve atomic arguments of the classic interoperability event.
fn atomic_args() -> Vec<Value> {
    vec![
        Value::Int(-10),
        Value::Count(2),
        Value::time(1_700_000_000.25),
        Value::interval(120.0),
        Value::Bool(false),
        Value::Double(1.5),
        Value::from("Servus"),
        Value::port(5555, Protocol::Tcp),
        Value::Addr("6.7.6.5".parse().unwrap()),
        Value::Subnet("192.168.0.0/16".parse().unwrap()),
        Value::Addr("2001:db8:85a3::8a2e:370:7334".parse().unwrap()),
        Value::Subnet("2001:db8:85a3::/48".parse().unwrap()),
    ]
}

fn sparse_record_args() -> Vec<Value> {
    let rt = RecordType::create(["one", "a", "b", "c", "d"]).unwrap();
    let rec = Record::new(&rt)
        .with("a", 13i64)
        .unwrap()
        .with("c", "helloworld")
        .unwrap();
    vec![Value::Record(rec)]
}

fn benchmark_atomic_encode(c: &mut Criterion) {
    let codec = EventCodec::new();
    let args = atomic_args();

    c.bench_function("atomic_encode", |b| {
        b.iter(|| {
            black_box(codec.encode("test1", &args)).unwrap();
        })
    });
}

fn benchmark_atomic_decode(c: &mut Criterion) {
    let codec = EventCodec::new();
    let bytes = codec.encode("test1", &atomic_args()).unwrap();

    c.bench_function("atomic_decode", |b| {
        b.iter(|| {
            black_box(codec.decode(bytes.clone())).unwrap();
        })
    });
}

fn benchmark_record_roundtrip(c: &mut Criterion) {
    let codec = EventCodec::new();
    let args = sparse_record_args();

    c.bench_function("sparse_record_roundtrip", |b| {
        b.iter(|| {
            let bytes = codec.encode("test5", &args).unwrap();
            black_box(codec.decode(bytes)).unwrap();
        })
    });
}

criterion_group!(
    benches,
    benchmark_atomic_encode,
    benchmark_atomic_decode,
    benchmark_record_roundtrip
);
criterion_main!(benches);
