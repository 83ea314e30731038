use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn ed25519_sign_bench(c: &mut Criterion) {
    let kp = veil_crypto::keypair_from_seed(&[7u8; 32]);
    let msg = [42u8; 128];

    c.bench_function("ed25519_sign_128B", |b| {
        b.iter(|| veil_crypto::sign_message(black_box(&msg), &kp.private))
    });
}

fn ed25519_verify_bench(c: &mut Criterion) {
    let kp = veil_crypto::keypair_from_seed(&[7u8; 32]);
    let msg = [42u8; 128];
    let sig = veil_crypto::sign_message(&msg, &kp.private);

    c.bench_function("ed25519_verify_128B", |b| {
        b.iter(|| veil_crypto::verify_signature(black_box(&msg), &sig, &kp.public))
    });
}

fn blake2b_multi_bench(c: &mut Criterion) {
    let parts: Vec<&[u8]> = vec![&[1u8; 32], &[2u8; 64], &[3u8; 128]];

    c.bench_function("blake2b_256_multi_3parts", |b| {
        b.iter(|| veil_crypto::blake2b_256_multi(black_box(&parts)))
    });
}

fn pre_key_generation_bench(c: &mut Criterion) {
    c.bench_function("x25519_pre_key_generate", |b| {
        b.iter(|| veil_crypto::generate_pre_key_pair(&veil_crypto::OsEntropy))
    });
}

criterion_group!(
    benches,
    ed25519_sign_bench,
    ed25519_verify_bench,
    blake2b_multi_bench,
    pre_key_generation_bench
);
criterion_main!(benches);
