//! Benchmarks for join and blocking operators.
//!
//! Input tables are built in the `iter_batched` setup so only stream
//! construction and draining are measured. Rows are shuffled so sort and
//! merge paths do not see presorted input.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use quarry_core::schema::{Field, Header, HeaderRef};
use quarry_core::{DataType, Row, Value};
use quarry_query::ast::{Filter, Op, SortOrder};
use quarry_query::context::RequestContext;
use quarry_query::executor::join::{
    HashJoinStream, JoinCondition, JoinKind, NestedLoopJoinStream, SortedMergeJoinStream,
};
use quarry_query::executor::StreamExecutor;
use quarry_query::planner::{PhysicalPlan, UnaryOperator};
use quarry_query::stream::{collect_rows, BoxedStream, Table};

/// Reproducible LCG shuffle.
fn shuffle_indices(count: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut s = seed;
    for i in (1..count).rev() {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (s as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}

fn join_header(prefix: &str) -> HeaderRef {
    Header::with_key(vec![
        Field::new(format!("{prefix}.a"), DataType::Int64),
        Field::new(format!("{prefix}.v"), DataType::Binary),
    ])
    .into_ref()
}

/// Keyed rows whose join column spans `key_range` values.
fn join_rows(header: &HeaderRef, count: usize, key_range: usize, seed: u64) -> Vec<Row> {
    shuffle_indices(count, seed)
        .into_iter()
        .map(|i| {
            Row::with_key(
                header.clone(),
                i as i64,
                vec![
                    Value::Int64((i % key_range) as i64),
                    Value::from(format!("value_{i}")),
                ],
            )
        })
        .collect()
}

struct Inputs {
    left: (HeaderRef, Vec<Row>),
    right: (HeaderRef, Vec<Row>),
}

impl Inputs {
    fn new(size: usize) -> Self {
        // 10% selectivity
        let key_range = (size / 10).max(1);
        let left = join_header("l");
        let right = join_header("r");
        Self {
            left: (left.clone(), join_rows(&left, size, key_range, 12345)),
            right: (right.clone(), join_rows(&right, size, key_range, 67890)),
        }
    }

    fn streams(&self) -> (BoxedStream, BoxedStream) {
        (
            Box::new(Table::new(self.left.0.clone(), self.left.1.clone())),
            Box::new(Table::new(self.right.0.clone(), self.right.1.clone())),
        )
    }
}

fn on_a() -> JoinCondition {
    JoinCondition::new().prefixes("l", "r").on(&["a"])
}

fn bench_hash_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_join");

    for size in [100, 1000, 10000].iter() {
        let inputs = Inputs::new(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || inputs.streams(),
                |(left, right)| {
                    let join = HashJoinStream::new(left, right, on_a(), JoinKind::Inner);
                    black_box(collect_rows(Box::new(join)).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_nested_loop_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_loop_join");

    // Smaller sizes for O(n*m) algorithm
    for size in [100, 500, 1000].iter() {
        let inputs = Inputs::new(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || inputs.streams(),
                |(left, right)| {
                    let join = NestedLoopJoinStream::new(left, right, on_a(), JoinKind::Inner);
                    black_box(collect_rows(Box::new(join)).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_sorted_merge_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_merge_join");

    for size in [100, 1000, 10000].iter() {
        let inputs = Inputs::new(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || inputs.streams(),
                |(left, right)| {
                    let join =
                        SortedMergeJoinStream::new(left, right, on_a(), JoinKind::Inner).unwrap();
                    black_box(collect_rows(Box::new(join)).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Select, sort and limit built through the executor.
fn bench_select_sort_limit(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_sort_limit");
    let executor = StreamExecutor::default();

    for size in [1000, 10000, 100000].iter() {
        let inputs = Inputs::new(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter_batched(
                || inputs.streams().0,
                |input| {
                    let plan = PhysicalPlan::source(input)
                        .then(UnaryOperator::Select {
                            filter: Filter::value("l.a", Op::Lt, (*size / 20) as i64),
                        })
                        .then(UnaryOperator::Sort {
                            sort_by: vec![("l.a".into(), SortOrder::Desc)],
                        })
                        .then(UnaryOperator::Limit {
                            limit: 100,
                            offset: 10,
                        });
                    let stream = executor.build(plan, &RequestContext::new()).unwrap();
                    black_box(collect_rows(stream).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_join,
    bench_nested_loop_join,
    bench_sorted_merge_join,
    bench_select_sort_limit,
);

criterion_main!(benches);
