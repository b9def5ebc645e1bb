use criterion::{black_box, criterion_group, criterion_main, Criterion};
use icvm::api::Runtime;
use icvm::runtime::rule::op2;
use icvm::{batch_op, parallel_batch_op, Config};

fn bench_cfg() -> Config {
  let mut cfg = Config::default();
  cfg.heap_size = 64 * icvm::CELLS_PER_MB;
  cfg
}

fn sum_tree(c: &mut Criterion) {
  let code = "@sum = \\d.(?d #1 \\p.(+ (@sum p) (@sum p)))";
  c.bench_function("sum_tree_12", |b| {
    b.iter(|| {
      let mut runtime = Runtime::from_code_with(bench_cfg(), code).unwrap();
      black_box(runtime.eval("(@sum #12)").unwrap())
    })
  });
}

fn dup_sup_commute(c: &mut Criterion) {
  c.bench_function("dup_sup_commute", |b| {
    b.iter(|| {
      let mut runtime = Runtime::new(bench_cfg());
      black_box(runtime.eval("!&0{a,b}=&1{#1,#2}; (+ a b)").unwrap())
    })
  });
}

fn batch_add(c: &mut Criterion) {
  let n = 1 << 20;
  let a: Vec<u32> = (0..n as u32).collect();
  let b: Vec<u32> = (0..n as u32).map(|x| x.wrapping_mul(3)).collect();
  let mut out = vec![0u32; n];
  c.bench_function("batch_add_1m, serial", |bch| {
    bch.iter(|| batch_op(op2::ADD, black_box(&a), black_box(&b), &mut out).unwrap())
  });
  c.bench_function("batch_add_1m, parallel", |bch| {
    bch.iter(|| {
      parallel_batch_op(op2::ADD, black_box(&a), black_box(&b), &mut out, 4).unwrap()
    })
  });
}

criterion_group!(benches, sum_tree, dup_sup_commute, batch_add);
criterion_main!(benches);
