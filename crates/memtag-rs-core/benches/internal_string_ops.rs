//! Benchmarks for the internal byte-wise primitives and the tagger's
//! allocate/release cycle. On a bench host the transport probes out to the
//! inert backend, so these numbers measure this runtime's own overhead,
//! not the enforcement engine's.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use memtag_rs_core::alloc::tagger;
use memtag_rs_core::string::{mem, str as cstr};

fn bench_memcpy(c: &mut Criterion) {
    let src = vec![0xA5u8; 4096];
    let mut dst = vec![0u8; 4096];
    c.bench_function("internal_memcpy_4k", |b| {
        b.iter(|| unsafe {
            mem::memcpy(black_box(dst.as_mut_ptr()), black_box(src.as_ptr()), 4096);
        });
    });
}

fn bench_strlen(c: &mut Criterion) {
    let mut s = vec![b'x'; 1024];
    s.push(0);
    c.bench_function("internal_strlen_1k", |b| {
        b.iter(|| unsafe { black_box(cstr::strlen(black_box(s.as_ptr().cast()))) });
    });
}

fn bench_strstr(c: &mut Criterion) {
    let mut hay = vec![b'a'; 512];
    hay.extend_from_slice(b"needle\0");
    c.bench_function("internal_strstr_late_match", |b| {
        b.iter(|| unsafe {
            black_box(cstr::strstr(
                black_box(hay.as_ptr().cast()),
                black_box(b"needle\0".as_ptr().cast()),
            ))
        });
    });
}

fn bench_tagger_cycle(c: &mut Criterion) {
    c.bench_function("tagger_malloc_free_89", |b| {
        b.iter(|| unsafe {
            let p = tagger::malloc(black_box(89));
            tagger::free(p);
        });
    });
}

criterion_group!(
    benches,
    bench_memcpy,
    bench_strlen,
    bench_strstr,
    bench_tagger_cycle
);
criterion_main!(benches);
