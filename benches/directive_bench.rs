// ABOUTME: Criterion benchmarks for reply scanning and token estimation on the chat hot path
// ABOUTME: Measures directive extraction, bracket matching, and script-aware token counting by reply size
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Criterion benchmarks for the per-turn text processing.
//!
//! Every chat turn scans the model reply for directives and estimates the
//! token cost of each history entry, so both scale with reply length.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use aidiet_server::chat::{find_payload_end, scan_reply, window_history};
use aidiet_server::constants::directives::REGENERATE_PLAN_SENTINEL;
use aidiet_server::intelligence::estimate_tokens;
use aidiet_server::models::ExchangeTurn;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Reply lengths in sentences
const REPLY_SIZES: [usize; 3] = [5, 50, 500];

const SENTENCE: &str = "Препоръчвам повече зеленчуци и по-малко захар през деня. ";

fn reply_without_directive(sentences: usize) -> String {
    SENTENCE.repeat(sentences)
}

fn reply_with_directive(sentences: usize) -> String {
    format!(
        "{}{REGENERATE_PLAN_SENTINEL}{{\"modifications\":[\"exclude_food:мед\",\"low_carb\",\"note with ] bracket\"]}}]",
        SENTENCE.repeat(sentences)
    )
}

fn bench_scan_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_reply");

    for sentences in REPLY_SIZES {
        let plain = reply_without_directive(sentences);
        let directive = reply_with_directive(sentences);
        group.throughput(Throughput::Bytes(directive.len() as u64));

        group.bench_with_input(BenchmarkId::new("absent", sentences), &plain, |b, reply| {
            b.iter(|| scan_reply(black_box(reply)));
        });
        group.bench_with_input(
            BenchmarkId::new("extracted", sentences),
            &directive,
            |b, reply| {
                b.iter(|| scan_reply(black_box(reply)));
            },
        );
    }

    group.finish();
}

fn bench_find_payload_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_payload_end");

    for sentences in REPLY_SIZES {
        let reply = reply_with_directive(sentences);
        let start = reply.find(REGENERATE_PLAN_SENTINEL).unwrap() + REGENERATE_PLAN_SENTINEL.len();
        group.bench_with_input(BenchmarkId::from_parameter(sentences), &reply, |b, reply| {
            b.iter(|| find_payload_end(black_box(reply), black_box(start)));
        });
    }

    group.finish();
}

fn bench_token_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_tokens");

    for sentences in REPLY_SIZES {
        let text = reply_without_directive(sentences);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sentences), &text, |b, text| {
            b.iter(|| estimate_tokens(black_box(text)));
        });
    }

    group.finish();
}

fn bench_history_window(c: &mut Criterion) {
    let log: Vec<ExchangeTurn> = (0..200)
        .map(|index| {
            if index % 2 == 0 {
                ExchangeTurn::user(SENTENCE)
            } else {
                ExchangeTurn::assistant(SENTENCE.repeat(4))
            }
        })
        .collect();

    c.bench_function("window_history_200_turns", |b| {
        b.iter(|| window_history(black_box(&log), black_box(2000)));
    });
}

criterion_group!(
    benches,
    bench_scan_reply,
    bench_find_payload_end,
    bench_token_estimation,
    bench_history_window,
);
criterion_main!(benches);
