// The reducer is a stack machine with 2 phases:
// - enter: descends to the head of the term, pushing a frame for every
//   consumer it passes through, until a whnf (or stuck head) is reached.
// - apply: pops the top frame and combines it with the current value via the
//   interaction rules; the result either re-enters or keeps applying.
// There is no host recursion: all continuation state lives in frames. Rules
// that must force a sub-term mid-rewrite re-enter the machine with the stack
// watermark set to the current height, leaving outer frames untouched.

use crate::runtime::base::debug;
use crate::runtime::base::memory::*;
use crate::runtime::base::program::instantiate;
use crate::runtime::base::state::{RuntimeError, State};
use crate::runtime::data::frames::Frames;
use crate::runtime::rule::{app, dup, eql, mat, op2, strict};
use std::collections::HashSet;

// The outcome of one interaction: a term that must be entered again, or a
// value to combine with the next frame.
pub enum Flow {
  Enter(Term),
  Value(Term),
}

pub fn reduce(state: &State, term: Term) -> Result<Term, RuntimeError> {
  let mut frames = Frames::new(state.cfg.stack_size);
  reduce_with(state, &mut frames, term, 0, false)
}

pub fn reduce_debug(state: &State, term: Term) -> Result<Term, RuntimeError> {
  let mut frames = Frames::new(state.cfg.stack_size);
  reduce_with(state, &mut frames, term, 0, true)
}

pub fn reduce_with(
  state: &State,
  frames: &mut Frames,
  term: Term,
  base: usize,
  dbg: bool,
) -> Result<Term, RuntimeError> {
  let heap = &state.heap;
  let mut next = term;

  'main: loop {
    let mut term = next;

    // Enter phase: walk to the head, pushing frames along the spine.
    'enter: loop {
      if dbg {
        eprintln!("[enter {:>4}] {}", frames.len(), debug::show_term(state, term, 8));
      }
      if is_sub(term) {
        term = clr_sub(term);
        continue 'enter;
      }
      match get_tag(term) {
        VAR => {
          let cell = heap.get(get_val(term));
          if is_sub(cell) {
            term = clr_sub(cell);
            continue 'enter;
          }
          // Unapplied binder: the head is stuck.
          break 'enter;
        }
        CO0 | CO1 => {
          let slot = get_val(term);
          let cell = heap.get(slot);
          if is_sub(cell) {
            term = clr_sub(cell);
            continue 'enter;
          }
          let tag = if get_tag(term) == CO0 { F_CO0 } else { F_CO1 };
          frames.push(term_new(tag, get_ext(term), slot))?;
          term = cell;
          continue 'enter;
        }
        APP => {
          let loc = get_val(term);
          frames.push(term_new(F_APP, 0, loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        MAT => {
          let loc = get_val(term);
          frames.push(term_new(F_MAT, get_ext(term), loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        SWI => {
          let loc = get_val(term);
          frames.push(term_new(F_SWI, 0, loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        tag if tag > P00 && tag <= P15 => {
          let loc = get_val(term);
          let opr = get_ext(term);
          let phase = match tag {
            P01 => 2,
            P02 => 0,
            _ => return Err(RuntimeError::UnknownPrimitive(opr)),
          };
          frames.push(term_new(F_OP2, (phase << 5) | opr, loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        USE => {
          let loc = get_val(term);
          frames.push(term_new(F_USE, 0, loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        EQL => {
          let loc = get_val(term);
          frames.push(term_new(F_EQ0, 0, loc))?;
          term = heap.load(loc);
          continue 'enter;
        }
        DUP => {
          // The duplication node floats; evaluation proceeds on its body.
          term = heap.load(get_val(term));
          continue 'enter;
        }
        RED => {
          let loc = get_val(term);
          let cell = heap.get(loc);
          if is_sub(cell) {
            term = clr_sub(cell);
            continue 'enter;
          }
          frames.push(term_new(F_RED, 0, loc))?;
          term = cell;
          continue 'enter;
        }
        REF | ALO => {
          term = instantiate(state, get_val(term))?;
          continue 'enter;
        }
        ANN => {
          // Annotations are dropped by evaluation. Under an equality frame
          // they are kept opaque unless configured otherwise.
          if !state.cfg.eql_through_ann {
            if let Some(top) = frames.peek() {
              if matches!(get_tag(top), F_EQ0 | F_EQ1) {
                break 'enter;
              }
            }
          }
          term = heap.load(get_val(term));
          continue 'enter;
        }
        LAM | SUP | ERA | NUM | TYP | ALL | SIG | SLF | BRI => break 'enter,
        tag if (C00..=C15).contains(&tag) => break 'enter,
        tag => return Err(RuntimeError::UnknownTag(tag)),
      }
    }

    // Apply phase: combine the value with pending frames.
    'apply: loop {
      if frames.len() == base {
        return Ok(term);
      }
      if dbg {
        eprintln!("[apply {:>4}] {}", frames.len(), debug::show_term(state, term, 8));
      }
      let frame = frames.pop().unwrap();
      let loc = get_val(frame);
      let flow = match get_tag(frame) {
        F_APP => app::apply(state, loc, term)?,
        F_MAT => mat::apply_mat(state, get_ext(frame), loc, term)?,
        F_SWI => mat::apply_swi(state, loc, term)?,
        F_CO0 => dup::apply(state, get_ext(frame), loc, 0, term)?,
        F_CO1 => dup::apply(state, get_ext(frame), loc, 1, term)?,
        F_USE => strict::apply(state, loc, term)?,
        F_RED => {
          heap.subst(loc, term);
          Flow::Value(term)
        }
        F_EQ0 => match get_tag(term) {
          SUP => eql::apply_sup(state, loc, 0, term)?,
          ERA => {
            state.inc_itrs();
            Flow::Value(Era())
          }
          _ => {
            heap.link(loc, term);
            frames.push(term_new(F_EQ1, 0, loc))?;
            Flow::Enter(heap.load(loc + 1))
          }
        },
        F_EQ1 => match get_tag(term) {
          SUP => eql::apply_sup(state, loc, 1, term)?,
          _ => eql::apply(state, loc, heap.load(loc), term)?,
        },
        F_OP2 => {
          let opr = get_ext(frame) & 0x1F;
          let phase = get_ext(frame) >> 5;
          match phase {
            0 => match get_tag(term) {
              NUM => {
                heap.set(loc, term);
                frames.push(term_new(F_OP2, (1 << 5) | opr, loc))?;
                Flow::Enter(heap.load(loc + 1))
              }
              SUP => op2::apply_sup(state, opr, loc, 0, term)?,
              ERA => {
                state.inc_itrs();
                Flow::Value(Era())
              }
              _ => {
                heap.link(loc, term);
                Flow::Value(Op2(opr, loc))
              }
            },
            1 => {
              let fst = heap.load(loc);
              match get_tag(term) {
                NUM if get_tag(fst) == NUM => {
                  op2::apply_num(state, opr, get_num(fst), get_num(term))?
                }
                SUP => op2::apply_sup(state, opr, loc, 1, term)?,
                ERA => {
                  state.inc_itrs();
                  Flow::Value(Era())
                }
                _ => {
                  heap.link(loc + 1, term);
                  Flow::Value(Op2(opr, loc))
                }
              }
            }
            _ => match get_tag(term) {
              NUM => {
                state.inc_itrs();
                Flow::Value(Num(op2::op(opr, get_num(term), 0)?))
              }
              SUP => op2::apply_sup_unary(state, opr, term)?,
              ERA => {
                state.inc_itrs();
                Flow::Value(Era())
              }
              _ => {
                heap.link(loc, term);
                Flow::Value(Op1(opr, loc))
              }
            },
          }
        }
        tag => return Err(RuntimeError::UnknownTag(tag)),
      };
      match flow {
        Flow::Enter(t) => {
          next = t;
          continue 'main;
        }
        Flow::Value(v) => {
          term = v;
          continue 'apply;
        }
      }
    }
  }
}

// Full normalization
// ------------------

// Reduces the term at `host` to whnf, then recursively normalizes every
// child location, skipping locations already visited (shared spines).
pub fn normal(
  state: &State,
  tids: &[usize],
  host: u64,
  seen: &mut HashSet<u64>,
) -> Result<Term, RuntimeError> {
  let heap = &state.heap;
  if seen.contains(&host) {
    return Ok(heap.load(host));
  }
  seen.insert(host);
  let term = reduce(state, heap.load(host))?;
  heap.link(host, term);
  let mut rec_locs = Vec::new();
  let loc = get_val(term);
  match get_tag(term) {
    LAM => rec_locs.push(loc),
    APP | SUP | USE | EQL | ANN | ALL | SIG => {
      rec_locs.push(loc);
      rec_locs.push(loc + 1);
    }
    SLF | BRI | RED => rec_locs.push(loc),
    SWI => rec_locs.extend([loc, loc + 1, loc + 2]),
    MAT => {
      for i in 0..=get_ext(term) {
        rec_locs.push(loc + i);
      }
    }
    CO0 | CO1 => {
      if !is_sub(heap.get(loc)) {
        rec_locs.push(loc);
      }
    }
    tag if tag > C00 && tag <= C15 => {
      for i in 0..ctr_ari(term) {
        rec_locs.push(loc + i);
      }
    }
    tag if tag > P00 && tag <= P15 => {
      for i in 0..pri_ari(term) {
        rec_locs.push(loc + i);
      }
    }
    _ => {}
  }
  if tids.len() >= 2 && rec_locs.len() >= 2 {
    // Splits the child locations across the available workers.
    let thd_len = tids.len();
    let rec_len = rec_locs.len();
    let rec_locs = &rec_locs;
    std::thread::scope(|s| {
      let mut handles = Vec::new();
      for (thd_num, tid) in tids.iter().enumerate() {
        let min_idx = thd_num * rec_len / thd_len;
        let max_idx = (thd_num + 1) * rec_len / thd_len;
        let mut seen = seen.clone();
        let tid = std::slice::from_ref(tid);
        handles.push(s.spawn(move || -> Result<(), RuntimeError> {
          for idx in min_idx..max_idx {
            normal(state, tid, rec_locs[idx], &mut seen)?;
          }
          Ok(())
        }));
      }
      for handle in handles {
        handle.join().expect("worker panicked")?;
      }
      Ok::<(), RuntimeError>(())
    })?;
  } else {
    for loc in rec_locs {
      normal(state, tids, loc, seen)?;
    }
  }
  Ok(term)
}

// Drives the term at `host` to full normal form, re-running until the
// interaction count stops moving.
pub fn normalize(state: &State, host: u64) -> Result<Term, RuntimeError> {
  let tids: Vec<usize> = (0..state.cfg.num_workers.max(1)).collect();
  let mut cost = state.itrs();
  loop {
    normal(state, &tids, host, &mut HashSet::new())?;
    let new_cost = state.itrs();
    if new_cost == cost {
      break;
    }
    cost = new_cost;
  }
  Ok(state.heap.load(host))
}
