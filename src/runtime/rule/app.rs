use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};

// Applies the function value at the head of an application node.
#[inline]
pub fn apply(state: &State, loc: u64, fun: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // (λx(body) a)
  // ------------ APP-LAM
  // x <- a
  // body
  if get_tag(fun) == LAM {
    state.inc_itrs();
    let lam_loc = get_val(fun);
    let arg = heap.load(loc + 1);
    let bod = heap.load(lam_loc);
    heap.subst(lam_loc, arg);
    return Ok(Flow::Enter(bod));
  }

  // ({a b} c)
  // --------------- APP-SUP
  // dup x0 x1 = c
  // {(a x0) (b x1)}
  if get_tag(fun) == SUP {
    state.inc_itrs();
    let lab = get_ext(fun);
    let sup_loc = get_val(fun);
    let slot = heap.alloc(1)?;
    let app1 = heap.alloc(2)?;
    heap.link(slot, heap.load(loc + 1));
    heap.link(app1 + 0, heap.load(sup_loc + 1));
    heap.link(app1 + 1, Co1(lab, slot));
    heap.link(loc + 0, heap.load(sup_loc + 0));
    heap.link(loc + 1, Co0(lab, slot));
    heap.link(sup_loc + 0, App(loc));
    heap.link(sup_loc + 1, App(app1));
    return Ok(Flow::Value(Sup(lab, sup_loc)));
  }

  // (* a)
  // ----- APP-ERA
  // *
  if get_tag(fun) == ERA {
    state.inc_itrs();
    return Ok(Flow::Value(Era()));
  }

  // Head is stuck: store it back and pass the application upward.
  heap.link(loc + 0, fun);
  Ok(Flow::Value(App(loc)))
}
