use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};
use crate::runtime::rule::op2;

// (=== {a b} x)
// ------------------------- EQL-SUP (either side)
// dup x0 x1 = x
// {(=== a x0) (=== b x1)}
#[inline]
pub fn apply_sup(state: &State, loc: u64, which: u64, sup: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;
  state.inc_itrs();
  let lab = get_ext(sup);
  let sup_loc = get_val(sup);
  let other = 1 - which;
  let shr = heap.alloc(1)?;
  let eq1 = heap.alloc(2)?;
  heap.link(shr, heap.load(loc + other));
  heap.link(loc + which, heap.load(sup_loc + 0));
  heap.link(loc + other, Co0(lab, shr));
  heap.link(eq1 + which, heap.load(sup_loc + 1));
  heap.link(eq1 + other, Co1(lab, shr));
  heap.link(sup_loc + 0, Eql(loc));
  heap.link(sup_loc + 1, Eql(eq1));
  Ok(Flow::Value(Sup(lab, sup_loc)))
}

// Decides equality of two weak head normal forms. Both sides are already in
// whnf; the lhs has been stored back into the node.
#[inline]
pub fn apply(state: &State, loc: u64, a: Term, b: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // (=== * x)  or  (=== x *)
  // ------------------------ EQL-ERA
  // *
  if get_tag(a) == ERA || get_tag(b) == ERA {
    state.inc_itrs();
    return Ok(Flow::Value(Era()));
  }

  // (=== #a #b)
  // ----------- EQL-NUM
  // #(a == b)
  if get_tag(a) == NUM && get_tag(b) == NUM {
    state.inc_itrs();
    return Ok(Flow::Value(Num(u32::from(get_num(a) == get_num(b)))));
  }

  // (=== (K a ...) (K b ...))
  // ------------------------------- EQL-CTR
  // (& (=== a b) (& ...))
  let a_ctr = (C00..=C15).contains(&get_tag(a));
  let b_ctr = (C00..=C15).contains(&get_tag(b));
  if a_ctr && b_ctr {
    state.inc_itrs();
    if get_ext(a) != get_ext(b) || ctr_ari(a) != ctr_ari(b) {
      return Ok(Flow::Value(Num(0)));
    }
    let ari = ctr_ari(a);
    if ari == 0 {
      return Ok(Flow::Value(Num(1)));
    }
    let a_loc = get_val(a);
    let b_loc = get_val(b);
    let mut cur = {
      let eq = heap.alloc(2)?;
      heap.link(eq + 0, heap.load(a_loc + 0));
      heap.link(eq + 1, heap.load(b_loc + 0));
      Eql(eq)
    };
    for i in 1..ari {
      let eq = heap.alloc(2)?;
      heap.link(eq + 0, heap.load(a_loc + i));
      heap.link(eq + 1, heap.load(b_loc + i));
      let and = heap.alloc(2)?;
      heap.link(and + 0, cur);
      heap.link(and + 1, Eql(eq));
      cur = Op2(op2::AND, and);
    }
    return Ok(Flow::Enter(cur));
  }

  // Annotations and type-level terms compare by identity.
  let a_opq = matches!(get_tag(a), ANN | TYP | ALL | SIG | SLF | BRI);
  let b_opq = matches!(get_tag(b), ANN | TYP | ALL | SIG | SLF | BRI);
  if a_opq || b_opq {
    state.inc_itrs();
    return Ok(Flow::Value(Num(u32::from(a == b))));
  }

  // Lambdas are never structurally equal, and mismatched value kinds are
  // plainly distinct.
  let a_val = is_whnf(get_tag(a));
  let b_val = is_whnf(get_tag(b));
  if a_val && b_val {
    state.inc_itrs();
    return Ok(Flow::Value(Num(0)));
  }

  // One side is stuck: store both and pass the comparison upward.
  heap.link(loc + 0, a);
  heap.link(loc + 1, b);
  Ok(Flow::Value(Eql(loc)))
}
