use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};

// Resolves a constructor match against its scrutinee value.
#[inline]
pub fn apply_mat(state: &State, nbr: u64, loc: u64, scrut: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // match (K a b ...) { b0 ... bn }
  // ------------------------------- MAT-CTR
  // (bK a b ...)
  if (C00..=C15).contains(&get_tag(scrut)) {
    let cid = get_ext(scrut);
    if cid >= nbr {
      return Err(RuntimeError::UnknownTag(get_tag(scrut)));
    }
    state.inc_itrs();
    let ari = ctr_ari(scrut);
    let ctr_loc = get_val(scrut);
    let mut cur = heap.load(loc + 1 + cid);
    for i in 0..ari {
      let app = heap.alloc(2)?;
      heap.link(app + 0, cur);
      heap.link(app + 1, heap.load(ctr_loc + i));
      cur = App(app);
    }
    return Ok(Flow::Enter(cur));
  }

  // match {a b} { b0 ... bn }
  // ----------------------------------------- MAT-SUP
  // dup b0' b0'' = b0 ... dup bn' bn'' = bn
  // {match a {b0' ...} match b {b0'' ...}}
  if get_tag(scrut) == SUP {
    state.inc_itrs();
    let lab = get_ext(scrut);
    let sup_loc = get_val(scrut);
    let mat1 = heap.alloc(1 + nbr)?;
    for i in 0..nbr {
      let shr = heap.alloc(1)?;
      heap.link(shr, heap.load(loc + 1 + i));
      heap.link(loc + 1 + i, Co0(lab, shr));
      heap.link(mat1 + 1 + i, Co1(lab, shr));
    }
    heap.link(loc + 0, heap.load(sup_loc + 0));
    heap.link(mat1 + 0, heap.load(sup_loc + 1));
    heap.link(sup_loc + 0, Mat(nbr, loc));
    heap.link(sup_loc + 1, Mat(nbr, mat1));
    return Ok(Flow::Value(Sup(lab, sup_loc)));
  }

  // match * { ... }
  // --------------- MAT-ERA
  // *
  if get_tag(scrut) == ERA {
    state.inc_itrs();
    return Ok(Flow::Value(Era()));
  }

  if get_tag(scrut) == NUM {
    return Err(RuntimeError::UnknownTag(NUM));
  }

  heap.link(loc + 0, scrut);
  Ok(Flow::Value(Mat(nbr, loc)))
}

// Resolves a numeric switch against its scrutinee value.
#[inline]
pub fn apply_swi(state: &State, loc: u64, scrut: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;

  // ?0 z s
  // ------ SWI-ZERO
  // z
  //
  // ?n z s
  // --------- SWI-SUCC
  // (s n-1)
  if get_tag(scrut) == NUM {
    state.inc_itrs();
    let n = get_num(scrut);
    if n == 0 {
      return Ok(Flow::Enter(heap.load(loc + 1)));
    }
    let app = heap.alloc(2)?;
    heap.link(app + 0, heap.load(loc + 2));
    heap.link(app + 1, Num(n - 1));
    return Ok(Flow::Enter(App(app)));
  }

  // ?{a b} z s
  // --------------------- SWI-SUP
  // dup z0 z1 = z
  // dup s0 s1 = s
  // {?a z0 s0 ?b z1 s1}
  if get_tag(scrut) == SUP {
    state.inc_itrs();
    let lab = get_ext(scrut);
    let sup_loc = get_val(scrut);
    let swi1 = heap.alloc(3)?;
    for i in 1..3 {
      let shr = heap.alloc(1)?;
      heap.link(shr, heap.load(loc + i));
      heap.link(loc + i, Co0(lab, shr));
      heap.link(swi1 + i, Co1(lab, shr));
    }
    heap.link(loc + 0, heap.load(sup_loc + 0));
    heap.link(swi1 + 0, heap.load(sup_loc + 1));
    heap.link(sup_loc + 0, Swi(loc));
    heap.link(sup_loc + 1, Swi(swi1));
    return Ok(Flow::Value(Sup(lab, sup_loc)));
  }

  // ?* z s
  // ------ SWI-ERA
  // *
  if get_tag(scrut) == ERA {
    state.inc_itrs();
    return Ok(Flow::Value(Era()));
  }

  heap.link(loc + 0, scrut);
  Ok(Flow::Value(Swi(loc)))
}
