//! Benchmarks for tracking and triggering
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflex_core::{computed, effect, reactive, Object, Ref, Value};
use serde_json::json;

// =============================================================================
// VIEW BENCHMARKS
// =============================================================================

fn bench_reactive_cached(c: &mut Criterion) {
    let raw = Value::from(json!({ "a": 1 }));
    let _view = reactive(raw.clone());
    c.bench_function("reactive_cached", |b| b.iter(|| black_box(reactive(raw.clone()))));
}

fn bench_get_untracked(c: &mut Criterion) {
    let state = reactive(json!({ "a": 1 }));
    c.bench_function("get_untracked", |b| b.iter(|| black_box(state.get("a"))));
}

fn bench_nested_get(c: &mut Criterion) {
    let state = reactive(json!({ "a": { "b": { "c": 1 } } }));
    c.bench_function("nested_get", |b| {
        b.iter(|| black_box(state.get("a").get("b").get("c")))
    });
}

// =============================================================================
// TRIGGER BENCHMARKS
// =============================================================================

fn bench_set_with_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_with_subscribers");
    for count in [1usize, 10, 100] {
        let state = reactive(json!({ "n": 0 }));
        let effects: Vec<_> = (0..count)
            .map(|_| {
                let reader = state.clone();
                effect(move || reader.get("n"))
            })
            .collect();
        let mut next = 0.0;
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                next += 1.0;
                state.set("n", black_box(next))
            })
        });
        drop(effects);
    }
    group.finish();
}

fn bench_set_same_value(c: &mut Criterion) {
    let state = reactive(json!({ "n": 1 }));
    let reader = state.clone();
    let _e = effect(move || reader.get("n"));
    c.bench_function("set_same_value", |b| b.iter(|| state.set("n", black_box(1))));
}

fn bench_map_set_entry(c: &mut Criterion) {
    let map = reactive(Object::map());
    let reader = map.clone();
    let _e = effect(move || reader.size());
    let mut next = 0.0;
    c.bench_function("map_set_entry", |b| {
        b.iter(|| {
            next += 1.0;
            black_box(map.set_entry("k", next))
        })
    });
}

// =============================================================================
// COMPUTED AND REF BENCHMARKS
// =============================================================================

fn bench_computed_chain(c: &mut Criterion) {
    let source = Ref::new(0);
    let reader = source.clone();
    let first = computed(move || reader.value().as_number().unwrap_or_default() + 1.0);
    let inner = first.clone();
    let second = computed(move || inner.value().as_number().unwrap_or_default() * 2.0);
    let mut next = 0.0;
    c.bench_function("computed_chain_set_then_read", |b| {
        b.iter(|| {
            next += 1.0;
            source.set_value(next);
            black_box(second.value())
        })
    });
}

fn bench_effect_rerun(c: &mut Criterion) {
    let cell = Ref::new(0);
    let state = reactive(json!({ "a": 1, "b": 2, "c": 3 }));
    let (reader, view) = (cell.clone(), state.clone());
    let _e = effect(move || {
        reader.value();
        view.get("a");
        view.get("b");
        view.get("c");
    });
    let mut next = 0.0;
    c.bench_function("effect_rerun_four_deps", |b| {
        b.iter(|| {
            next += 1.0;
            cell.set_value(black_box(next))
        })
    });
}

criterion_group!(
    view_benches,
    bench_reactive_cached,
    bench_get_untracked,
    bench_nested_get,
);

criterion_group!(
    trigger_benches,
    bench_set_with_subscribers,
    bench_set_same_value,
    bench_map_set_entry,
);

criterion_group!(derived_benches, bench_computed_chain, bench_effect_rerun);

criterion_main!(view_benches, trigger_benches, derived_benches);
