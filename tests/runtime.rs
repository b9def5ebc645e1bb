use icvm::api::{eval_code, Runtime};
use icvm::runtime::rule::op2;
use icvm::runtime::{self as rt};
use icvm::{batch_op, Config, RuntimeError, State};
use proptest::prelude::*;

fn small_cfg() -> Config {
  let mut cfg = Config::default();
  cfg.heap_size = 1 << 20;
  cfg
}

fn eval(expr: &str) -> String {
  eval_code("", expr, small_cfg()).unwrap().0
}

// Concrete scenarios
// ------------------

#[test]
fn adds_immediates() {
  assert_eq!(eval("(+ #21 #21)"), "#42");
}

#[test]
fn nested_arithmetic() {
  assert_eq!(eval("(* (+ #2 #3) (- #10 #4))"), "#30");
}

#[test]
fn beta_reduces() {
  assert_eq!(eval("((\\x.x) #7)"), "#7");
}

#[test]
fn dup_sup_same_label_annihilates() {
  assert_eq!(eval("!&0{a,b}=&0{#1,#2}; (+ a b)"), "#3");
}

#[test]
fn dup_sup_distinct_labels_commute() {
  assert_eq!(eval("!&0{a,b}=&1{#1,#2}; (+ a b)"), "&1{#2,#4}");
}

#[test]
fn structural_equality_on_numbers() {
  assert_eq!(eval("(=== #42 #42)"), "#1");
  assert_eq!(eval("(=== #42 #7)"), "#0");
}

#[test]
fn collapse_enumerates_breadth_first() {
  let mut runtime = Runtime::new(small_cfg());
  let got = runtime.collapse("&0{&0{#1,#2},&0{#3,#4}}", 8).unwrap();
  assert_eq!(got, ["#1", "#2", "#3", "#4"]);
}

// Interactions
// ------------

#[test]
fn annihilation_does_not_commute() {
  let (_, stats) = eval_code("", "!&7{a,b}=&7{#1,#2}; (+ a b)", small_cfg()).unwrap();
  assert_eq!(stats.commutations, 0);
}

#[test]
fn commutation_is_counted_and_flagged() {
  let mut cfg = small_cfg();
  cfg.commutation_limit = 0;
  let (_, stats) = eval_code("", "!&0{a,b}=&1{#1,#2}; (+ a b)", cfg).unwrap();
  assert!(stats.commutations > 0);
  assert!(stats.commutation_flagged);
}

#[test]
fn lambda_duplication_shares_the_body() {
  assert_eq!(eval("!&0{f,g}=\\y.(+ y #1); (f (g #0))"), "#2");
}

#[test]
fn application_of_erasure_erases() {
  assert_eq!(eval("((\\x.(x #1)) *)"), "*");
}

#[test]
fn switch_selects_zero_and_successor() {
  assert_eq!(eval("(?#0 #10 \\p.p)"), "#10");
  assert_eq!(eval("(?#3 #10 \\p.p)"), "#2");
}

#[test]
fn switch_distributes_over_superpositions() {
  assert_eq!(eval("(?&0{#0,#2} #10 \\p.p)"), "&0{#10,#1}");
}

#[test]
fn match_binds_constructor_fields() {
  assert_eq!(eval("~$0{#7 #8}{\\a.\\b.(+ a b)}"), "#15");
  assert_eq!(eval("~$1{}{#10 #20}"), "#20");
}

#[test]
fn match_distributes_over_superpositions() {
  assert_eq!(eval("~&0{$0{},$1{}}{#10 #20}"), "&0{#10,#20}");
}

#[test]
fn strict_sequencing_forces_then_continues() {
  assert_eq!(eval("(seq #1 #42)"), "#42");
  assert_eq!(eval("(seq ((\\x.x) #9) #42)"), "#42");
}

#[test]
fn strict_sequencing_lifts_superpositions() {
  assert_eq!(eval("(seq &0{#1,#2} #5)"), "&0{#5,#5}");
}

#[test]
fn numeric_operands_superpose() {
  assert_eq!(eval("(+ &0{#1,#2} #10)"), "&0{#11,#12}");
  assert_eq!(eval("(+ #10 &0{#1,#2})"), "&0{#11,#12}");
}

#[test]
fn unary_not_inverts_bits() {
  assert_eq!(eval("(! #0)"), format!("#{}", u32::MAX));
}

#[test]
fn division_by_zero_yields_zero() {
  assert_eq!(eval("(/ #42 #0)"), "#0");
  assert_eq!(eval("(% #42 #0)"), "#0");
}

// Structural equality
// -------------------

#[test]
fn equality_walks_constructors() {
  assert_eq!(eval("(=== $1{#1 #2} $1{#1 #2})"), "#1");
  assert_eq!(eval("(=== $1{#1 #2} $1{#1 #3})"), "#0");
  assert_eq!(eval("(=== $1{#1} $2{#1})"), "#0");
}

#[test]
fn lambdas_are_never_equal() {
  assert_eq!(eval("(=== \\x.x \\y.y)"), "#0");
}

#[test]
fn equality_distributes_over_superpositions() {
  assert_eq!(eval("(=== &0{#1,#2} #2)"), "&0{#0,#1}");
}

#[test]
fn equality_absorbs_erasure() {
  assert_eq!(eval("(=== * #1)"), "*");
}

#[test]
fn annotations_compare_by_identity_by_default() {
  assert_eq!(eval("(=== {#1 : *} {#1 : *})"), "#0");
  let mut cfg = small_cfg();
  cfg.eql_through_ann = true;
  assert_eq!(eval_code("", "(=== {#1 : *} {#1 : *})", cfg).unwrap().0, "#1");
}

#[test]
fn annotations_are_dropped_by_evaluation() {
  assert_eq!(eval("{#1 : *}"), "#1");
  assert_eq!(eval("(+ {#1 : *} #2)"), "#3");
}

// References and recursion
// ------------------------

#[test]
fn references_expand_at_the_call_site() {
  let code = "@id = \\x.x";
  assert_eq!(eval_code(code, "(@id #3)", small_cfg()).unwrap().0, "#3");
}

#[test]
fn recursive_references_terminate_on_base_cases() {
  let code = "@sum = \\d.(?d #1 \\p.(+ (@sum p) (@sum p)))";
  assert_eq!(eval_code(code, "(@sum #8)", small_cfg()).unwrap().0, "#256");
}

#[test]
fn church_composition_through_auto_dup() {
  let code = "@two = \\f.\\x.(f (f x))";
  assert_eq!(eval_code(code, "((@two \\y.(+ y #1)) #0)", small_cfg()).unwrap().0, "#2");
}

#[test]
fn parallel_normalization_agrees_with_serial() {
  let code = "@sum = \\d.(?d #1 \\p.(+ (@sum p) (@sum p)))";
  let mut cfg = small_cfg();
  cfg.num_workers = 4;
  assert_eq!(eval_code(code, "(@sum #8)", cfg).unwrap().0, "#256");
}

// Collapse
// --------

#[test]
fn collapse_lifts_superpositions_out_of_constructors() {
  let mut runtime = Runtime::new(small_cfg());
  let got = runtime.collapse("$1{&0{#1,#2}}", 4).unwrap();
  assert_eq!(got, ["$1{#1}", "$1{#2}"]);
}

#[test]
fn collapse_enumerates_infinite_streams_lazily() {
  let mut cfg = small_cfg();
  cfg.heap_size = 1 << 22;
  let mut runtime = Runtime::from_code_with(cfg, "@nats = &0{$0{}, $1{@nats}}").unwrap();
  let got = runtime.collapse("@nats", 3).unwrap();
  assert_eq!(got, ["$0{}", "$1{$0{}}", "$1{$1{$0{}}}"]);
}

#[test]
fn collapse_of_a_plain_value_yields_it_once() {
  let mut runtime = Runtime::new(small_cfg());
  let got = runtime.collapse("(+ #1 #2)", 4).unwrap();
  assert_eq!(got, ["#3"]);
}

// Quantified invariants
// ---------------------

#[test]
fn normalization_is_idempotent() {
  let mut runtime = Runtime::new(small_cfg());
  let first = runtime.eval("(* (+ #2 #3) (- #10 #4))").unwrap();
  let second = runtime.eval("(* (+ #2 #3) (- #10 #4))").unwrap();
  assert_eq!(first, second);
}

#[test]
fn whnf_spine_carries_no_substitutions() {
  let state = State::new(small_cfg());
  let loc = state.heap.alloc(2).unwrap();
  state.heap.link(loc, rt::Num(1));
  state.heap.link(loc + 1, rt::Num(2));
  let out = state.reduce(rt::Op2(op2::ADD, loc)).unwrap();
  assert!(!rt::is_sub(out));
  assert_eq!(state.heap.deref(out), out);
}

#[test]
fn errors_leave_the_heap_consistent() {
  let mut cfg = small_cfg();
  cfg.heap_size = 8;
  let state = State::new(cfg);
  let loc = state.heap.alloc(2).unwrap();
  state.heap.link(loc, rt::Num(1));
  state.heap.link(loc + 1, rt::Num(2));
  // a rule that must allocate will exhaust this tiny heap
  let sup = state.heap.alloc(2).unwrap();
  state.heap.link(sup, rt::Num(3));
  state.heap.link(sup + 1, rt::Num(4));
  let app = state.heap.alloc(2).unwrap();
  state.heap.link(app, rt::Sup(0, sup));
  state.heap.link(app + 1, rt::Num(5));
  let got = state.reduce(rt::App(app));
  assert_eq!(got, Err(RuntimeError::HeapExhausted));
  // prior cells are untouched
  assert_eq!(state.heap.load(loc), rt::Num(1));
}

#[test]
fn deep_spines_overflow_the_frame_stack() {
  let mut cfg = small_cfg();
  cfg.stack_size = 8;
  let mut expr = String::from("#1");
  for _ in 0..32 {
    expr = format!("(+ #1 {})", expr);
  }
  let err = eval_code("", &expr, cfg).unwrap_err();
  assert!(err.contains("stack overflow"), "got: {}", err);
}

#[test]
fn reset_recycles_the_arena() {
  let mut runtime = Runtime::new(small_cfg());
  assert_eq!(runtime.eval("(+ #1 #2)").unwrap(), "#3");
  assert!(runtime.stats().cells_used > 0);
  runtime.reset();
  assert_eq!(runtime.stats().cells_used, 0);
  assert_eq!(runtime.eval("(+ #2 #3)").unwrap(), "#5");
}

#[test]
fn refcount_telemetry_does_not_change_results() {
  let mut cfg = small_cfg();
  cfg.enable_refcount = true;
  assert_eq!(eval_code("", "(* (+ #2 #3) (- #10 #4))", cfg).unwrap().0, "#30");
}

#[test]
fn label_recycling_does_not_change_results() {
  let mut cfg = small_cfg();
  cfg.enable_label_recycling = true;
  assert_eq!(eval_code("", "!&0{a,b}=&0{#1,#2}; (+ a b)", cfg).unwrap().0, "#3");
}

// Properties
// ----------

proptest! {
  #[test]
  fn primitives_match_their_model(opr in 0u64..op2::OP_COUNT, a: u32, b: u32) {
    let state = State::new(small_cfg());
    let loc = state.heap.alloc(2).unwrap();
    state.heap.link(loc, rt::Num(a));
    state.heap.link(loc + 1, rt::Num(b));
    let got = state.reduce(rt::Op2(opr, loc)).unwrap();
    prop_assert_eq!(got, rt::Num(op2::op(opr, a, b).unwrap()));
  }

  #[test]
  fn batch_is_bit_identical_to_the_reducer(
    opr in 0u64..op2::OP_COUNT,
    pairs in proptest::collection::vec((any::<u32>(), any::<u32>()), 1..64),
  ) {
    let a: Vec<u32> = pairs.iter().map(|p| p.0).collect();
    let b: Vec<u32> = pairs.iter().map(|p| p.1).collect();
    let mut out = vec![0u32; pairs.len()];
    batch_op(opr, &a, &b, &mut out).unwrap();

    let state = State::new(small_cfg());
    for i in 0..pairs.len() {
      let loc = state.heap.alloc(2).unwrap();
      state.heap.link(loc, rt::Num(a[i]));
      state.heap.link(loc + 1, rt::Num(b[i]));
      let got = state.reduce(rt::Op2(opr, loc)).unwrap();
      prop_assert_eq!(got, rt::Num(out[i]));
    }
  }

  #[test]
  fn addition_of_literals_normalizes(a: u32, b: u32) {
    let expr = format!("(+ #{} #{})", a, b);
    let got = eval_code("", &expr, small_cfg()).unwrap().0;
    prop_assert_eq!(got, format!("#{}", a.wrapping_add(b)));
  }
}
