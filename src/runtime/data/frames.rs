// Frame Stack
// -----------
// The reducer's continuation state. Frames are ordinary terms (F_* tags);
// they live here and never touch the heap.

use crate::runtime::base::memory::Term;
use crate::runtime::base::state::RuntimeError;

pub struct Frames {
  data: Vec<Term>,
  cap: usize,
}

impl Frames {
  pub fn new(cap: usize) -> Self {
    Frames { data: Vec::with_capacity(cap.min(1 << 12)), cap }
  }

  #[inline(always)]
  pub fn push(&mut self, frame: Term) -> Result<(), RuntimeError> {
    if self.data.len() >= self.cap {
      return Err(RuntimeError::StackOverflow);
    }
    self.data.push(frame);
    Ok(())
  }

  #[inline(always)]
  pub fn pop(&mut self) -> Option<Term> {
    self.data.pop()
  }

  #[inline(always)]
  pub fn peek(&self) -> Option<Term> {
    self.data.last().copied()
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::base::memory::{term_new, F_APP};

  #[test]
  fn overflow_is_reported() {
    let mut frames = Frames::new(2);
    frames.push(term_new(F_APP, 0, 1)).unwrap();
    frames.push(term_new(F_APP, 0, 2)).unwrap();
    assert!(matches!(frames.push(term_new(F_APP, 0, 3)), Err(RuntimeError::StackOverflow)));
    assert_eq!(frames.pop(), Some(term_new(F_APP, 0, 2)));
  }
}
