use std::sync::Arc;
use std::thread;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use botloop::{FieldValue, KeyedStore, Record};

#[derive(Debug, Clone, Default)]
struct Session {
    chat_id: i64,
    username: String,
}

impl Record for Session {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "chat_id" => Some(self.chat_id.into()),
            "username" => Some(self.username.as_str().into()),
            _ => None,
        }
    }
}

fn seeded(n: i64) -> KeyedStore<Session> {
    let store = KeyedStore::new();
    for chat_id in 0..n {
        store.set(
            chat_id,
            Session {
                chat_id,
                username: format!("user{chat_id}"),
            },
        );
    }
    store
}

fn bench_add_auto(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/add_auto");
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_thread", |b| {
        b.iter_batched(
            KeyedStore::<u64>::new,
            |store| {
                for i in 0..1024 {
                    store.add_auto(i);
                }
                store
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("four_threads", |b| {
        b.iter_custom(|iters| {
            let store = Arc::new(KeyedStore::<u64>::new());
            let start = Instant::now();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..iters {
                            store.add_auto(i);
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            start.elapsed()
        });
    });
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = seeded(1024);
    c.bench_function("store/get_hit", |b| {
        b.iter(|| store.get(512));
    });
}

fn bench_find_key_by_field(c: &mut Criterion) {
    let store = seeded(1024);
    let mut group = c.benchmark_group("store/find_key_by_field");
    group.throughput(Throughput::Elements(1024));
    group.bench_function("miss_1024", |b| {
        b.iter(|| store.find_key_by_field("username", "nobody").is_err());
    });
    group.bench_function("hit_1024", |b| {
        b.iter(|| store.find_key_by_field("chat_id", 777_i64).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_add_auto, bench_get, bench_find_key_by_field);
criterion_main!(benches);
