// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the settlement engine.
//!
//! Run with: cargo bench
//!
//! Covers single-threaded credits and transfers, the approval path,
//! offline reconciliation, and transfers under thread contention.

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use settle_rs::{
    AccountId, AccountProfile, EntryId, Engine, NoRewards, RecipientLookup, Submission,
    SubmissionKind, TransactionStatus,
};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

/// Engine with `accounts` funded accounts; mobiles are `m<index>`.
fn funded_engine(accounts: u32, funds: i64) -> Engine {
    let engine = Engine::builder().reward_policy(NoRewards).build();
    for i in 0..accounts {
        let id = engine
            .open_account(AccountProfile::new(
                format!("User {i}"),
                format!("m{i}"),
                format!("ACC{i}"),
            ))
            .unwrap();
        if funds > 0 {
            engine
                .credit(id, Decimal::new(funds, 2), "Bank transfer", TransactionStatus::Success, None)
                .unwrap();
        }
    }
    engine
}

fn mobile(index: u32) -> RecipientLookup {
    RecipientLookup::Mobile(format!("m{index}"))
}

fn sent(amount: i64) -> Submission {
    Submission {
        id: EntryId::generate(),
        kind: SubmissionKind::Sent,
        amount: Decimal::new(amount, 2),
        counterparty: "Chai stall".into(),
        created_at: Utc::now(),
    }
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_credit(c: &mut Criterion) {
    let engine = funded_engine(1, 0);
    c.bench_function("single_credit", |b| {
        b.iter(|| {
            engine
                .credit(
                    AccountId(1),
                    black_box(Decimal::new(1000, 2)),
                    "Bank transfer",
                    TransactionStatus::Success,
                    None,
                )
                .unwrap();
        })
    });
}

fn bench_single_transfer(c: &mut Criterion) {
    let engine = funded_engine(2, i64::MAX / 1000);
    let to = mobile(1);
    c.bench_function("single_transfer", |b| {
        b.iter(|| {
            engine
                .transfer(AccountId(1), black_box(&to), Decimal::new(1, 2), None)
                .unwrap();
        })
    });
}

fn bench_transfer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = funded_engine(2, 1_000_000);
                let to = mobile(1);
                for _ in 0..count {
                    let _ = engine.transfer(AccountId(1), &to, Decimal::new(50, 2), None);
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Approval and Reconciliation
// =============================================================================

fn bench_approval(c: &mut Criterion) {
    c.bench_function("pending_credit_then_approve", |b| {
        let engine = funded_engine(1, 0);
        b.iter(|| {
            let pending = engine
                .credit(
                    AccountId(1),
                    Decimal::new(50000, 2),
                    "HDFC NEFT",
                    TransactionStatus::Pending,
                    None,
                )
                .unwrap();
            engine
                .approve(
                    black_box(pending.transaction.id),
                    TransactionStatus::Success,
                    None,
                )
                .unwrap();
        })
    });
}

fn bench_reconcile_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_batch");

    for size in [10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    let batch: Vec<Submission> = (0..size).map(|_| sent(1500)).collect();
                    (funded_engine(1, 0), batch)
                },
                |(engine, batch)| {
                    // second pass replays stored outcomes
                    engine.reconcile(AccountId(1), batch.clone()).unwrap();
                    engine.reconcile(AccountId(1), black_box(batch)).unwrap();
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_ring_transfers(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_ring_transfers");

    for accounts in [2u32, 16, 256].iter() {
        let total_ops = 10_000u32;
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(accounts),
            accounts,
            |b, &accounts| {
                b.iter(|| {
                    let engine = Arc::new(funded_engine(accounts, 10_000_000));

                    // Fewer accounts means more threads locking the same pair
                    (0..total_ops).into_par_iter().for_each(|i| {
                        let from = i % accounts;
                        let to = mobile((from + 1) % accounts);
                        let _ = engine.transfer(AccountId(from + 1), &to, Decimal::ONE, None);
                    });

                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total_credits = 100_000u32;

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_credits as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    let engine = Arc::new(funded_engine(1_000, 0));

                    pool.install(|| {
                        (0..total_credits).into_par_iter().for_each(|i| {
                            let account = AccountId(i % 1_000 + 1);
                            engine
                                .credit(
                                    account,
                                    Decimal::new(100, 2),
                                    "Bank transfer",
                                    TransactionStatus::Success,
                                    None,
                                )
                                .unwrap();
                        });
                    });

                    black_box(&engine);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    single_threaded,
    bench_single_credit,
    bench_single_transfer,
    bench_transfer_throughput,
);

criterion_group!(lifecycle, bench_approval, bench_reconcile_batch);

criterion_group!(
    multi_threaded,
    bench_parallel_ring_transfers,
    bench_thread_scaling,
);

criterion_main!(single_threaded, lifecycle, multi_threaded);
