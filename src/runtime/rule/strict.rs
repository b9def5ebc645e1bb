use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};

// Resolves a strict sequencing against its forced value.
#[inline]
pub fn apply(state: &State, loc: u64, val: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // (seq {a b} k)
  // --------------------- USE-SUP
  // dup k0 k1 = k
  // {(seq a k0) (seq b k1)}
  if get_tag(val) == SUP {
    state.inc_itrs();
    let lab = get_ext(val);
    let sup_loc = get_val(val);
    let shr = heap.alloc(1)?;
    let use1 = heap.alloc(2)?;
    heap.link(shr, heap.load(loc + 1));
    heap.link(loc + 0, heap.load(sup_loc + 0));
    heap.link(loc + 1, Co0(lab, shr));
    heap.link(use1 + 0, heap.load(sup_loc + 1));
    heap.link(use1 + 1, Co1(lab, shr));
    heap.link(sup_loc + 0, Use(loc));
    heap.link(sup_loc + 1, Use(use1));
    return Ok(Flow::Value(Sup(lab, sup_loc)));
  }

  // (seq v k), v in whnf
  // -------------------- USE-VAL
  // k
  if is_whnf(get_tag(val)) {
    state.inc_itrs();
    return Ok(Flow::Enter(heap.load(loc + 1)));
  }

  // The forced term is stuck: store it back and pass the node upward.
  heap.link(loc + 0, val);
  Ok(Flow::Value(Use(loc)))
}
