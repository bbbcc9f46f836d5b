use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use egui_dotview::{DotLayout, LayoutEngine};
use std::fmt::Write;
use std::hint::black_box;
use std::time::Duration;

/// Module-like graph: one cluster per function, a chain of statements inside each,
/// calls between functions.
fn make_description(functions: usize, statements: usize) -> String {
    let mut dot = String::from(
        "digraph G {\n  rankdir=TB; ranksep=0.4; nodesep=0.3;\n  node [shape=box, style=filled, fillcolor=lightyellow];\n  Module [label=<Module<BR/>body>];\n",
    );
    for f in 0..functions {
        let _ = writeln!(
            dot,
            "  subgraph cluster_f{f} {{ label=\"FunctionDef f{f}\"; style=\"filled,dashed\"; fillcolor=lightpink;"
        );
        for s in 0..statements {
            let _ = writeln!(dot, "    f{f}_s{s} [label=<Stmt {s}<BR/>line: {}>];", s + 1);
        }
        let _ = writeln!(dot, "  }}");
        let _ = writeln!(dot, "  Module -> f{f}_s0;");
        for s in 1..statements {
            let _ = writeln!(dot, "  f{f}_s{} -> f{f}_s{s};", s - 1);
        }
        if f > 0 {
            let _ = writeln!(dot, "  f{}_s0 -> f{f}_s0 [style=dashed, label=\"calls\"];", f - 1);
        }
    }
    dot.push_str("}\n");
    dot
}

fn bench_dot_layout(c: &mut Criterion) {
    let engine = DotLayout::default();
    let mut group = c.benchmark_group("dot_layout");
    group.sample_size(10);
    group.measurement_time(Duration::from_millis(600));
    group.warm_up_time(Duration::from_millis(200));

    group.bench_function("f10_s10", |b| {
        b.iter_batched(
            || make_description(10, 10),
            |dot| {
                black_box(engine.layout(&dot).ok());
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("f100_s40", |b| {
        b.iter_batched(
            || make_description(100, 40),
            |dot| {
                black_box(engine.layout(&dot).ok());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().configure_from_args();
    targets = bench_dot_layout
}
criterion_main!(benches);
