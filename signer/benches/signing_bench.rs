// Signing & codec benchmarks for rippled-sign.
//
// Covers seed derivation for both key families, raw signing, binary
// encoding of a payment, and the full offline pipeline at various
// multisig widths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};

use rippled_sign::codec;
use rippled_sign::crypto::{encode_seed, KeyAlgorithm, Keypair};
use rippled_sign::identity::Participant;
use rippled_sign::{pipeline, KeyInput, TransactionInput};

const SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
const ACCOUNT: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

fn payment() -> Map<String, Value> {
    match json!({
        "TransactionType": "Payment",
        "Account": ACCOUNT,
        "Destination": "rrrrrrrrrrrrrrrrrrrrrhoLvTp",
        "Amount": "1000000",
        "Fee": "12",
        "Sequence": 42,
        "Flags": 2_147_483_648u64,
        "LastLedgerSequence": 1005,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn bench_seed_derivation(c: &mut Criterion) {
    let ed_seed = encode_seed(&[7u8; 16], KeyAlgorithm::Ed25519);

    c.bench_function("keys/derive_secp256k1", |b| {
        b.iter(|| Keypair::from_seed(SEED).unwrap());
    });
    c.bench_function("keys/derive_ed25519", |b| {
        b.iter(|| Keypair::from_seed(&ed_seed).unwrap());
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let secp = Keypair::from_seed(SEED).unwrap();
    let ed = Keypair::from_entropy(&[7u8; 16], KeyAlgorithm::Ed25519).unwrap();
    let message = codec::encode_for_signing(&payment()).unwrap();

    c.bench_function("keys/sign_secp256k1", |b| {
        b.iter(|| secp.sign(&message));
    });
    c.bench_function("keys/sign_ed25519", |b| {
        b.iter(|| ed.sign(&message));
    });
}

fn bench_encode(c: &mut Criterion) {
    let tx = payment();
    let blob = codec::encode(&tx).unwrap();

    c.bench_function("codec/encode_payment", |b| {
        b.iter(|| codec::encode(&tx).unwrap());
    });
    c.bench_function("codec/decode_payment", |b| {
        b.iter(|| codec::decode(&blob).unwrap());
    });
}

fn bench_sign_offline(c: &mut Criterion) {
    let input = TransactionInput::from(Value::Object(payment()));
    let keys = KeyInput::from(SEED);

    c.bench_function("pipeline/sign_offline", |b| {
        b.iter(|| pipeline::sign_offline(&input, &keys).unwrap());
    });
}

fn bench_multisign(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/multisign");
    let mut tx = payment();
    tx.insert("SigningPubKey".into(), Value::String(String::new()));
    let input = TransactionInput::from(Value::Object(tx));

    for width in [1usize, 4, 8] {
        let participants: Vec<Participant> = (0..width)
            .map(|i| Participant::Seed(encode_seed(&[i as u8 + 1; 16], KeyAlgorithm::Secp256k1)))
            .collect();
        let keys = KeyInput::Multisig(participants);

        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &keys, |b, keys| {
            b.iter(|| pipeline::sign_offline(&input, keys).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_seed_derivation,
    bench_sign_message,
    bench_encode,
    bench_sign_offline,
    bench_multisign,
);
criterion_main!(benches);
