use std::time::Duration;

use cookiejar::jar::{Cookie, Jar};
use criterion::*;
use rand::seq::SliceRandom;

#[derive(Clone, Copy)]
struct Payload([f64; 4]);

type PayloadJar = Jar<Payload>;

fn filled(count: u64) -> (PayloadJar, Vec<Cookie<u32>>) {
    let mut jar = PayloadJar::new();
    let cookies = (0..count)
        .map(|i| jar.insert(Payload([i as f64; 4])).expect("jar capacity"))
        .collect();
    (jar, cookies)
}

fn jar_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("jar insert");
    group.measurement_time(Duration::from_secs(5));

    for log_count in (8..=16).step_by(4) {
        let count = 1 << log_count;
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new("fresh", format!("{count} values")),
            &count,
            |b, &count| {
                b.iter_batched(
                    PayloadJar::new,
                    |mut jar| {
                        for i in 0..count {
                            jar.insert(Payload([i as f64; 4])).expect("jar capacity");
                        }
                        jar
                    },
                    BatchSize::LargeInput,
                )
            },
        );
        group.bench_with_input(
            BenchmarkId::new("recycled", format!("{count} values")),
            &count,
            |b, &count| {
                b.iter_batched(
                    || {
                        let (mut jar, cookies) = filled(count);
                        for cookie in cookies {
                            jar.remove(cookie).expect("cookie is live");
                        }
                        jar
                    },
                    |mut jar| {
                        for i in 0..count {
                            jar.insert(Payload([i as f64; 4])).expect("jar capacity");
                        }
                        jar
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }
}

fn jar_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("jar remove");
    group.measurement_time(Duration::from_secs(5));

    for log_count in (8..=16).step_by(4) {
        let count = 1 << log_count;
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new("shuffled", format!("{count} values")),
            &count,
            |b, &count| {
                b.iter_batched(
                    || {
                        let (jar, mut cookies) = filled(count);
                        cookies.shuffle(&mut rand::thread_rng());
                        (jar, cookies)
                    },
                    |(mut jar, cookies)| {
                        for cookie in cookies {
                            jar.remove(cookie).expect("cookie is live");
                        }
                        jar
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }
}

fn jar_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("jar iterate");

    for log_count in (8..=16).step_by(4) {
        let count = 1 << log_count;
        group.throughput(Throughput::Elements(count));

        let (mut jar, mut cookies) = filled(count * 2);
        cookies.shuffle(&mut rand::thread_rng());
        for &cookie in &cookies[..count as usize] {
            jar.remove(cookie).expect("cookie is live");
        }

        group.bench_function(BenchmarkId::new("values", format!("{count} values")), |b| {
            b.iter(|| jar.values().iter().map(|payload| payload.0[0]).sum::<f64>())
        });
        group.bench_function(BenchmarkId::new("lookup", format!("{count} values")), |b| {
            let live = &cookies[count as usize..];
            b.iter(|| live.iter().filter_map(|&cookie| jar.get(cookie)).count())
        });
        group.bench_function(BenchmarkId::new("iter_mut", format!("{count} values")), |b| {
            b.iter(|| {
                for (_, payload) in jar.iter_mut() {
                    payload.0[1] += payload.0[0];
                }
            })
        });
    }
}

criterion_group!(benches, jar_insert, jar_remove, jar_iterate);
criterion_main!(benches);
