use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inkexpr::script::{compile, execute, FunctionTable, Interpreter};
use inkexpr::var::{VarStore, VariableStore};

const ARITH: &str = "1 + (2 - 3) * 4 / 5 + 6 * (7 - 8) % 9";
const SCRIPT: &str = "\
#define LIMIT 100
speed = 3.5;
dist = speed * time;
label = \"d=\" + dist;
return dist < LIMIT && Min(dist, LIMIT) > 0;";

fn make_chain(terms: usize) -> String {
    (0..terms)
        .map(|n| format!("v{} * {}", n % 8, n))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn seeded_vars() -> VarStore {
    let mut vars = VarStore::new();
    vars.set_float("time", 12.0);
    for n in 0..8 {
        vars.set_int(&format!("v{n}"), n);
    }
    vars
}

fn bench_compile(c: &mut Criterion) {
    let chain_small = make_chain(10);
    let chain_large = make_chain(500);

    let mut g = c.benchmark_group("compile");
    g.bench_function("arith", |b| b.iter(|| compile(black_box(ARITH))));
    g.bench_function("script", |b| b.iter(|| compile(black_box(SCRIPT))));
    g.bench_function("chain_10", |b| b.iter(|| compile(black_box(&chain_small))));
    g.bench_function("chain_500", |b| b.iter(|| compile(black_box(&chain_large))));
    g.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut interp = Interpreter::with_builtins();
    let arith = interp.compile(ARITH).unwrap();
    let script = interp.compile(SCRIPT).unwrap();
    let chain = compile(&make_chain(500)).unwrap();
    let empty = FunctionTable::new();

    let mut g = c.benchmark_group("execute");
    g.bench_function("arith", |b| {
        let mut vars = VarStore::new();
        b.iter(|| execute(black_box(&arith), &mut vars, &empty))
    });
    g.bench_function("script", |b| {
        let mut vars = seeded_vars();
        b.iter(|| interp.execute_in(black_box(&script), &mut vars, None))
    });
    g.bench_function("chain_500", |b| {
        let mut vars = seeded_vars();
        b.iter(|| execute(black_box(&chain), &mut vars, &empty))
    });
    g.finish();

    c.bench_function("eval_roundtrip", |b| {
        b.iter(|| interp.eval(black_box(ARITH)).unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
