// Redex Queue
// -----------
// A concurrent task-stealing queue of heap locations, featuring push, pop
// and steal. Used by the parallel sweep: each worker drains its own queue
// from the back and steals from victims at the front.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::runtime::base::memory::new_atomic_u64_array;

pub const REDEX_QUEUE_SIZE: usize = 1 << 16;

pub struct RedexQueue {
  pub init: CachePadded<AtomicUsize>,
  pub last: CachePadded<AtomicUsize>,
  pub data: Box<[AtomicU64]>,
}

impl RedexQueue {
  pub fn new() -> RedexQueue {
    RedexQueue {
      init: CachePadded::new(AtomicUsize::new(0)),
      last: CachePadded::new(AtomicUsize::new(0)),
      data: new_atomic_u64_array(REDEX_QUEUE_SIZE),
    }
  }

  // Entries are stored as loc+1 so that 0 can mean "taken".
  pub fn push(&self, loc: u64) {
    let index = self.last.fetch_add(1, Ordering::Relaxed);
    if index < REDEX_QUEUE_SIZE {
      unsafe { self.data.get_unchecked(index) }.store(loc + 1, Ordering::Relaxed);
    }
  }

  #[inline(always)]
  pub fn pop(&self) -> Option<u64> {
    loop {
      let last = self.last.load(Ordering::Relaxed).min(REDEX_QUEUE_SIZE);
      if last == 0 {
        return None;
      }
      self.last.store(last - 1, Ordering::Relaxed);
      self.init.fetch_min(last - 1, Ordering::Relaxed);
      let got = unsafe { self.data.get_unchecked(last - 1) }.swap(0, Ordering::Relaxed);
      if got != 0 {
        return Some(got - 1);
      }
      if last == 1 {
        return None;
      }
    }
  }

  #[inline(always)]
  pub fn steal(&self) -> Option<u64> {
    let index = self.init.load(Ordering::Relaxed);
    if index >= REDEX_QUEUE_SIZE {
      return None;
    }
    let got = unsafe { self.data.get_unchecked(index) }.load(Ordering::Relaxed);
    if got != 0 {
      if unsafe { self.data.get_unchecked(index) }
        .compare_exchange(got, 0, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
      {
        self.init.fetch_add(1, Ordering::Relaxed);
        return Some(got - 1);
      }
    }
    None
  }
}

impl Default for RedexQueue {
  fn default() -> Self {
    Self::new()
  }
}
