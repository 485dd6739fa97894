use std::hint::black_box;

use bencher::{StackCase, StackShape};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use waylay_client::{Client, transport_fn};
use waylay_pipeline::{BoxError, FnInterceptor, Request, Response, Sequential};

fn create_stack_cases() -> Vec<StackCase> {
    vec![
        StackCase::direct("bare", 0),
        StackCase::direct("stack_4", 4),
        StackCase::direct("stack_16", 16),
    ]
}

fn passthrough() -> FnInterceptor {
    FnInterceptor::new()
        .request(|request, handle| async move { handle.proceed(request) })
        .response(|response, handle| async move { handle.proceed(response) })
}

fn echo_client(case: &StackCase) -> Client {
    let transport =
        transport_fn(|request: Request| async move { Ok::<_, BoxError>(Response::new(request.into_body())) });

    let mut builder = Client::builder().transport(transport);
    for _ in 0..case.depth() {
        builder = match case.shape() {
            StackShape::Direct => builder.interceptor(passthrough()),
            StackShape::Queued => builder.interceptor(Sequential::new(passthrough())),
        };
    }
    builder.build().expect("transport is set")
}

fn benchmark_pipeline_send(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("failed to build tokio runtime");
    let mut group = criterion.benchmark_group("pipeline_send");

    for case in create_stack_cases() {
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let client = echo_client(case);
            b.to_async(&runtime).iter(|| async {
                let response =
                    client.post("http://bench.local/echo", "ping").await.expect("echo transport never fails");
                black_box(response);
            });
        });
    }

    group.finish();
}

fn benchmark_sequential_overhead(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("failed to build tokio runtime");
    let mut group = criterion.benchmark_group("sequential_overhead");

    for case in [StackCase::direct("direct_4", 4), StackCase::queued("queued_4", 4)] {
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            let client = echo_client(case);
            b.to_async(&runtime).iter(|| async {
                let response = client.get("http://bench.local/echo").await.expect("echo transport never fails");
                black_box(response);
            });
        });
    }

    group.finish();
}

criterion_group!(pipeline, benchmark_pipeline_send, benchmark_sequential_overhead);
criterion_main!(pipeline);
