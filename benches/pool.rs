//! Micro-benchmarks for the allocation path spec.md §4.A claims is O(1):
//! header-pool alloc/free and a full `BufPools::get`/`release` round trip
//! through a typed data-area pool.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use netcore::buf::header::{BufFlags, BufType};
use netcore::buf::pool::{DataPoolConfig, Pool};
use netcore::buf::BufPools;
use netcore::iface::IfNbr;

fn bench_header_pool_roundtrip(c: &mut Criterion) {
    let mut pool: Pool<u32> = Pool::with_capacity(256);
    c.bench_function("header_pool_alloc_free", |b| {
        b.iter(|| {
            let idx = pool.alloc(black_box(42)).expect("pool exhausted");
            black_box(pool.get(idx));
            pool.free(idx);
        });
    });
}

fn bench_bufpools_get_release(c: &mut Criterion) {
    let mut pools = BufPools::new(64);
    pools.register_interface(
        IfNbr(1),
        Some(DataPoolConfig {
            kind: BufType::RxLarge,
            capacity: 64,
            stride: 1536,
            align: 1,
            ix_offset_cfg: 0,
        }),
        None,
        None,
    );

    c.bench_function("bufpools_get_release_rx_large", |b| {
        b.iter(|| {
            let (h, _ix) = pools
                .get(IfNbr(1), BufType::RxLarge, 64, 0, BufFlags::empty())
                .expect("pool exhausted");
            black_box(h);
            pools.release(h).expect("release failed");
        });
    });
}

criterion_group!(benches, bench_header_pool_roundtrip, bench_bufpools_get_release);
criterion_main!(benches);
