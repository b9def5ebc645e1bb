// Parallel Sweep
// --------------
// An optional work-stealing pass over shared numeric redexes. A prepass
// scans the used heap for duplication projections whose shared slot holds a
// binary primitive over two numbers: such a slot can be resolved to a NUM
// for both projections at once. Each worker scans its own heap span into its
// own queue, drains it, then steals from victims. A site is claimed and
// completed by a single compare-and-swap that flips the slot from the
// pending term to the substituted result, so double-reduction is impossible
// and readers always observe a fully-published forwarding term.

use crate::runtime::base::memory::*;
use crate::runtime::base::state::{RuntimeError, State};
use crate::runtime::data::redex_queue::RedexQueue;
use crate::runtime::rule::op2;
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicU64, Ordering};

// Attempts to fold the primitive pending in `slot`. Returns true when the
// slot was claimed and resolved by this call.
fn claim(state: &State, slot: u64) -> Result<bool, RuntimeError> {
  let heap = &state.heap;
  let cell = heap.get(slot);
  if is_sub(cell) || get_tag(cell) != P02 {
    return Ok(false);
  }
  let loc = get_val(cell);
  let fst = heap.deref(heap.load(loc));
  let snd = heap.deref(heap.load(loc + 1));
  if get_tag(fst) != NUM || get_tag(snd) != NUM {
    return Ok(false);
  }
  let res = op2::op(get_ext(cell), get_num(fst), get_num(snd))?;
  if heap.try_subst(slot, cell, Num(res)) {
    state.inc_itrs();
    Ok(true)
  } else {
    Ok(false)
  }
}

// One bounded sweep. Returns the number of redexes resolved.
pub fn parallel_sweep(state: &State) -> Result<u64, RuntimeError> {
  let used = state.heap.used();
  let tids = state.cfg.num_workers.max(1);
  let queues: Vec<RedexQueue> = (0..tids).map(|_| RedexQueue::new()).collect();
  let rewrites = AtomicU64::new(0);
  let queues = &queues;
  let rewrites = &rewrites;

  std::thread::scope(|s| {
    let mut handles = Vec::new();
    for tid in 0..tids {
      handles.push(s.spawn(move || -> Result<(), RuntimeError> {
        let heap = &state.heap;
        let min = (used as usize * tid / tids) as u64;
        let max = (used as usize * (tid + 1) / tids) as u64;

        // Prepass: collect candidate shared slots from this worker's span.
        for loc in min..max {
          let term = heap.get(loc);
          if !is_sub(term) && matches!(get_tag(term), CO0 | CO1) {
            queues[tid].push(get_val(term));
          }
        }

        // Drain own queue, then steal from victims until everyone is dry.
        let bkoff = Backoff::new();
        let mut done = 0u64;
        loop {
          if let Some(slot) = queues[tid].pop() {
            if claim(state, slot)? {
              done += 1;
            }
            bkoff.reset();
            continue;
          }
          let mut stolen = false;
          for victim in 0..tids {
            if victim != tid {
              if let Some(slot) = queues[victim].steal() {
                if claim(state, slot)? {
                  done += 1;
                }
                stolen = true;
                break;
              }
            }
          }
          if !stolen {
            if bkoff.is_completed() {
              break;
            }
            bkoff.snooze();
          }
        }
        rewrites.fetch_add(done, Ordering::Relaxed);
        Ok(())
      }));
    }
    for handle in handles {
      handle.join().expect("worker panicked")?;
    }
    Ok(())
  })?;

  Ok(rewrites.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::base::state::Config;

  // Builds `!&0{x,y} = (+ #a #b); (+ x y)` by hand and checks the sweep
  // resolves the shared slot before the reducer ever runs.
  #[test]
  fn sweep_folds_shared_numeric_redexes() {
    let mut cfg = Config::default();
    cfg.heap_size = 1 << 10;
    cfg.num_workers = 2;
    let state = State::new(cfg);
    let heap = &state.heap;
    let dup = heap.alloc(2).unwrap();
    let ops = heap.alloc(2).unwrap();
    let add = heap.alloc(2).unwrap();
    heap.link(add + 0, Num(21));
    heap.link(add + 1, Num(21));
    heap.link(dup + 0, Op2(op2::ADD, ops));
    heap.link(dup + 1, Op2(op2::ADD, add));
    heap.link(ops + 0, Co0(0, dup + 1));
    heap.link(ops + 1, Co1(0, dup + 1));

    let resolved = parallel_sweep(&state).unwrap();
    assert_eq!(resolved, 1);
    assert!(is_sub(heap.get(dup + 1)));

    let out = state.reduce(Dup(0, dup)).unwrap();
    assert_eq!(out, Num(84));
  }
}
