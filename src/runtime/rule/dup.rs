use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};

// Resolves a duplication projection against the value of its shared slot.
// `side` is 0 for CO0, 1 for CO1. One projection receives its half directly;
// the sibling's half is published into the slot.
#[inline]
pub fn apply(state: &State, lab: u64, slot: u64, side: u64, val: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // dup r s = λx(f)
  // --------------- DUP-LAM
  // dup f0 f1 = f
  // r <- λx0(f0)
  // s <- λx1(f1)
  // x <- {x0 x1}
  if get_tag(val) == LAM {
    state.inc_itrs();
    state.inc_comm();
    let lam_loc = get_val(val);
    let shr = heap.alloc(1)?;
    let lam0 = heap.alloc(1)?;
    let lam1 = heap.alloc(1)?;
    let par = heap.alloc(2)?;
    heap.link(shr, heap.load(lam_loc));
    heap.link(lam0, Co0(lab, shr));
    heap.link(lam1, Co1(lab, shr));
    heap.link(par + 0, Var(lam0));
    heap.link(par + 1, Var(lam1));
    heap.subst(lam_loc, Sup(lab, par));
    let (mine, sibling) = if side == 0 { (lam0, lam1) } else { (lam1, lam0) };
    heap.subst(slot, Lam(sibling));
    return Ok(Flow::Value(Lam(mine)));
  }

  if get_tag(val) == SUP {
    let sup_lab = get_ext(val);
    let sup_loc = get_val(val);

    // dup x y = {a b}
    // --------------- DUP-SUP (labels match)
    // x <- a
    // y <- b
    if sup_lab == lab {
      state.inc_itrs();
      let fst = heap.load(sup_loc + 0);
      let snd = heap.load(sup_loc + 1);
      state.recycle_label(lab);
      if side == 0 {
        heap.subst(slot, snd);
        return Ok(Flow::Enter(fst));
      } else {
        heap.subst(slot, fst);
        return Ok(Flow::Enter(snd));
      }
    }

    // dup x y = {a b}
    // --------------- DUP-SUP (labels differ)
    // x <- {xA xB}
    // y <- {yA yB}
    // dup xA yA = a
    // dup xB yB = b
    state.inc_itrs();
    state.inc_comm();
    let sh0 = heap.alloc(1)?;
    let sh1 = heap.alloc(1)?;
    let par = heap.alloc(2)?;
    heap.link(sh0, heap.load(sup_loc + 0));
    heap.link(sh1, heap.load(sup_loc + 1));
    heap.link(par + 0, Co(side, lab, sh0));
    heap.link(par + 1, Co(side, lab, sh1));
    heap.link(sup_loc + 0, Co(1 - side, lab, sh0));
    heap.link(sup_loc + 1, Co(1 - side, lab, sh1));
    heap.subst(slot, Sup(sup_lab, sup_loc));
    return Ok(Flow::Value(Sup(sup_lab, par)));
  }

  // dup x y = N
  // ----------- DUP-NUM
  // x <- N
  // y <- N
  if get_tag(val) == NUM {
    state.inc_itrs();
    heap.subst(slot, val);
    return Ok(Flow::Value(val));
  }

  // dup x y = (K a b ...)
  // --------------------- DUP-CTR
  // dup a0 a1 = a
  // dup b0 b1 = b
  // ...
  // x <- (K a0 b0 ...)
  // y <- (K a1 b1 ...)
  if (C00..=C15).contains(&get_tag(val)) {
    state.inc_itrs();
    state.inc_comm();
    let ari = ctr_ari(val);
    let cid = get_ext(val);
    if ari == 0 {
      heap.subst(slot, val);
      return Ok(Flow::Value(val));
    }
    let ctr_loc = get_val(val);
    let ctr1 = heap.alloc(ari)?;
    for i in 0..ari {
      let shr = heap.alloc(1)?;
      heap.link(shr, heap.load(ctr_loc + i));
      heap.link(ctr_loc + i, Co(side, lab, shr));
      heap.link(ctr1 + i, Co(1 - side, lab, shr));
    }
    heap.subst(slot, Ctr(ari, cid, ctr1));
    return Ok(Flow::Value(Ctr(ari, cid, ctr_loc)));
  }

  // dup x y = *
  // ----------- DUP-ERA
  // x <- *
  // y <- *
  if get_tag(val) == ERA {
    state.inc_itrs();
    heap.subst(slot, Era());
    return Ok(Flow::Value(Era()));
  }

  // Type-level terms are inert: both projections share the same one.
  if matches!(get_tag(val), TYP | ALL | SIG | SLF | BRI) {
    state.inc_itrs();
    heap.subst(slot, val);
    return Ok(Flow::Value(val));
  }

  // The shared value is stuck: store its whnf back and stay a projection.
  heap.link(slot, val);
  Ok(Flow::Value(Co(side, lab, slot)))
}
