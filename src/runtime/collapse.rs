// Lazy Collapse
// -------------
// Breadth-first enumeration of the superposed results of a term. The queue
// holds pending obligations; each step pops one, reduces it, and either
// lifts a superposition outward (enqueueing both branches at the back) or
// emits a fully-lifted value. Superpositions are lifted out of constructor
// fields by commuting, with sibling fields shared through fresh slots; they
// are not lifted through lambdas. Branches of a root superposition are
// enqueued as RED obligations over the node's own cells, so residual work
// shared between branches reduces exactly once.
//
// Mid-lift forcing re-enters the reducer above the current stack watermark,
// so an in-progress enumeration never disturbs outer frames.

use crate::runtime::base::memory::*;
use crate::runtime::base::state::{RuntimeError, State};
use crate::runtime::base::reducer::reduce_with;
use crate::runtime::data::frames::Frames;
use std::collections::VecDeque;

enum Lift {
  Split(u64, Term, Term),
  Whole(Term),
}

pub struct Collapse<'a> {
  state: &'a State,
  frames: Frames,
  queue: VecDeque<Term>,
  failed: bool,
}

impl<'a> Collapse<'a> {
  pub fn new(state: &'a State, term: Term) -> Self {
    let mut queue = VecDeque::new();
    queue.push_back(term);
    Collapse { state, frames: Frames::new(state.cfg.stack_size), queue, failed: false }
  }

  // Number of pending obligations in the residual.
  pub fn pending(&self) -> usize {
    self.queue.len()
  }

  fn force(&mut self, term: Term) -> Result<Term, RuntimeError> {
    let base = self.frames.len();
    reduce_with(self.state, &mut self.frames, term, base, false)
  }

  // Advances the residual by one obligation. Returns the next concrete
  // result when one surfaced, or None when only the residual advanced (or
  // nothing is left).
  pub fn step(&mut self) -> Result<Option<Term>, RuntimeError> {
    let Some(term) = self.queue.pop_front() else {
      return Ok(None);
    };
    let val = self.force(term)?;
    if get_tag(val) == SUP {
      let loc = get_val(val);
      self.queue.push_back(Red(loc));
      self.queue.push_back(Red(loc + 1));
      return Ok(None);
    }
    match self.lift(val)? {
      Lift::Split(_, fst, snd) => {
        self.queue.push_back(fst);
        self.queue.push_back(snd);
        Ok(None)
      }
      Lift::Whole(val) => Ok(Some(val)),
    }
  }

  // Searches a whnf for the outermost superposition under constructors and
  // commutes it to the root.
  fn lift(&mut self, val: Term) -> Result<Lift, RuntimeError> {
    if get_tag(val) == SUP {
      let loc = get_val(val);
      let fst = self.state.heap.load(loc);
      let snd = self.state.heap.load(loc + 1);
      return Ok(Lift::Split(get_ext(val), fst, snd));
    }
    let tag = get_tag(val);
    if tag > C00 && tag <= C15 {
      let ari = ctr_ari(val);
      let cid = get_ext(val);
      let loc = get_val(val);
      for i in 0..ari {
        let field = self.state.heap.load(loc + i);
        let field = self.force(field)?;
        match self.lift(field)? {
          Lift::Split(lab, fst, snd) => {
            let heap = &self.state.heap;
            let ctr1 = heap.alloc(ari)?;
            for j in 0..ari {
              if j == i {
                continue;
              }
              let shr = heap.alloc(1)?;
              heap.link(shr, heap.load(loc + j));
              heap.link(loc + j, Co0(lab, shr));
              heap.link(ctr1 + j, Co1(lab, shr));
            }
            heap.link(loc + i, fst);
            heap.link(ctr1 + i, snd);
            return Ok(Lift::Split(lab, Ctr(ari, cid, loc), Ctr(ari, cid, ctr1)));
          }
          Lift::Whole(field) => {
            self.state.heap.link(loc + i, field);
          }
        }
      }
    }
    Ok(Lift::Whole(val))
  }
}

impl Iterator for Collapse<'_> {
  type Item = Result<Term, RuntimeError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }
    while !self.queue.is_empty() {
      match self.step() {
        Ok(Some(val)) => return Some(Ok(val)),
        Ok(None) => continue,
        Err(err) => {
          self.failed = true;
          return Some(Err(err));
        }
      }
    }
    None
  }
}
