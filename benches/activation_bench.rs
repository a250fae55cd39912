//! 编排内核性能基准测试
//!
//! 使用 Criterion 框架进行性能测试，包括：
//! - 依赖链激活基准
//! - 宽依赖（共享依赖）激活基准
//! - 完整生命周期执行基准

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chips_orc::{Module, ModuleBundle, ModuleContext, ModuleRef, Registry};
use std::sync::Arc;

// ============================================================================
// 测试辅助结构
// ============================================================================

/// 基准测试用的模块：声明给定依赖并登记全部阶段的空钩子
struct BenchModule {
    deps: Vec<ModuleRef>,
}

impl Module for BenchModule {
    fn on_register(&self, hooks: &mut ModuleContext) {
        let deps = self.deps.clone();
        hooks.on_use(move |ctx| ctx.declare_all(&deps));
        hooks.on_validate(|| Ok(()));
        hooks.on_setup(|| Ok(()));
        hooks.on_teardown(|| Ok(()));
        hooks.on_start(|| Ok(()));
        hooks.on_stop(|| Ok(()));
    }
}

/// 长度为 `len` 的依赖链，返回链尾
fn chain(len: usize) -> ModuleRef {
    let mut tail: ModuleRef = Arc::new(BenchModule { deps: Vec::new() });
    for _ in 1..len {
        tail = Arc::new(BenchModule { deps: vec![tail] });
    }
    tail
}

/// `width` 个模块共享同一个依赖
fn fan_in(width: usize) -> ModuleRef {
    let shared: ModuleRef = Arc::new(BenchModule { deps: Vec::new() });
    let members = (0..width).map(|_| -> ModuleRef {
        Arc::new(BenchModule {
            deps: vec![Arc::clone(&shared)],
        })
    });
    ModuleBundle::new(members).into_ref()
}

// ============================================================================
// 激活基准
// ============================================================================

fn chain_activation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_activation");

    for len in [1usize, 10, 100].iter() {
        let registry = Arc::new(Registry::new());
        let root = chain(*len);
        // 预热注册
        let _ = registry.use_module(&root, Vec::new());

        group.throughput(Throughput::Elements(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, _| {
            b.iter(|| {
                let run = registry.use_module(black_box(&root), Vec::new());
                black_box(run)
            })
        });
    }

    group.finish();
}

fn fan_in_activation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in_activation");

    for width in [10usize, 100].iter() {
        let registry = Arc::new(Registry::new());
        let root = fan_in(*width);
        let _ = registry.use_module(&root, Vec::new());

        group.throughput(Throughput::Elements(*width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, _| {
            b.iter(|| {
                let run = registry.use_module(black_box(&root), Vec::new());
                black_box(run)
            })
        });
    }

    group.finish();
}

// ============================================================================
// 生命周期基准
// ============================================================================

fn lifecycle_run_benchmark(c: &mut Criterion) {
    let registry = Arc::new(Registry::new());
    let root = chain(50);

    c.bench_function("lifecycle_run_chain_50", |b| {
        b.iter(|| {
            let result = registry
                .use_module(&root, Vec::new())
                .and_then(|run| run.run(|| Ok(black_box(1))));
            black_box(result)
        })
    });
}

criterion_group!(
    benches,
    chain_activation_benchmark,
    fan_in_activation_benchmark,
    lifecycle_run_benchmark,
);

criterion_main!(benches);
