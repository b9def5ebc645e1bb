use crate::runtime::base::memory::{Heap, Term, AUTO_LABEL};
use crate::runtime::base::program::Program;
use crate::runtime::base::reducer;
use crate::runtime::collapse::Collapse;
use crate::runtime::CELLS_PER_MB;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

// Errors
// ------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeError {
  HeapExhausted,
  StackOverflow,
  UnknownPrimitive(u64),
  UnknownTag(u8),
}

impl std::fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RuntimeError::HeapExhausted => write!(f, "heap exhausted"),
      RuntimeError::StackOverflow => write!(f, "reduction stack overflow"),
      RuntimeError::UnknownPrimitive(opr) => write!(f, "unknown primitive: {}", opr),
      RuntimeError::UnknownTag(tag) => write!(f, "unknown tag: 0x{:02X}", tag),
    }
  }
}

impl std::error::Error for RuntimeError {}

// Config
// ------

#[derive(Clone, Debug)]
pub struct Config {
  pub heap_size: usize,             // heap capacity, in terms
  pub stack_size: usize,            // frame stack capacity, in frames
  pub num_workers: usize,           // worker threads for the parallel paths
  pub enable_refcount: bool,        // per-cell refcount telemetry
  pub enable_label_recycling: bool, // reuse labels freed by annihilation
  pub commutation_limit: u64,       // advisory commutation budget
  pub eql_through_ann: bool,        // structural equality looks under annotations
}

impl Default for Config {
  fn default() -> Self {
    Config {
      heap_size: 64 * CELLS_PER_MB,
      stack_size: 1 << 16,
      num_workers: 1,
      enable_refcount: false,
      enable_label_recycling: false,
      commutation_limit: u64::MAX,
      eql_through_ann: false,
    }
  }
}

// Stats
// -----

#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
  pub cells_used: u64,
  pub interactions: u64,
  pub commutations: u64,
  pub commutation_flagged: bool,
}

// State
// -----

// Owns the heap, the program table and the global counters. The reducer and
// the parallel paths borrow it shared; all mutation goes through atomics or
// the substitution protocol.
pub struct State {
  pub heap: Heap,
  pub prog: Program,
  pub cfg: Config,
  itrs: AtomicU64,
  comms: AtomicU64,
  comm_flag: AtomicBool,
  fresh: AtomicU64,
  recycled: Mutex<Vec<u64>>,
}

impl State {
  pub fn new(cfg: Config) -> Self {
    State {
      heap: Heap::new(cfg.heap_size, cfg.enable_refcount),
      prog: Program::new(),
      cfg,
      itrs: AtomicU64::new(0),
      comms: AtomicU64::new(0),
      comm_flag: AtomicBool::new(false),
      fresh: AtomicU64::new(AUTO_LABEL),
      recycled: Mutex::new(Vec::new()),
    }
  }

  pub fn install(&mut self, prog: Program) {
    self.prog = prog;
  }

  #[inline(always)]
  pub fn inc_itrs(&self) {
    self.itrs.fetch_add(1, Ordering::Relaxed);
  }

  #[inline(always)]
  pub fn inc_comm(&self) {
    let comms = self.comms.fetch_add(1, Ordering::Relaxed) + 1;
    if comms > self.cfg.commutation_limit {
      self.comm_flag.store(true, Ordering::Relaxed);
    }
  }

  pub fn itrs(&self) -> u64 {
    self.itrs.load(Ordering::Relaxed)
  }

  // Draws a label from the auto-generated space, preferring recycled ones
  // when recycling is enabled.
  pub fn fresh_label(&self) -> u64 {
    if self.cfg.enable_label_recycling {
      if let Some(lab) = self.recycled.lock().unwrap().pop() {
        return lab;
      }
    }
    self.fresh.fetch_add(1, Ordering::Relaxed)
  }

  // Returns an annihilated label to the pool. User labels are never recycled.
  pub fn recycle_label(&self, lab: u64) {
    if self.cfg.enable_label_recycling && lab >= AUTO_LABEL {
      self.recycled.lock().unwrap().push(lab);
    }
  }

  // Drives a term to weak head normal form.
  pub fn reduce(&self, term: Term) -> Result<Term, RuntimeError> {
    reducer::reduce(self, term)
  }

  // Drives the term at a heap location to full normal form.
  pub fn normalize(&self, host: u64) -> Result<Term, RuntimeError> {
    reducer::normalize(self, host)
  }

  // Lazily enumerates the superposed results of a term.
  pub fn collapse(&self, term: Term) -> Collapse<'_> {
    Collapse::new(self, term)
  }

  // Rewinds the heap and the counters. Outstanding terms are invalidated.
  pub fn reset_heap(&self) {
    self.heap.reset();
    self.itrs.store(0, Ordering::Relaxed);
    self.comms.store(0, Ordering::Relaxed);
    self.comm_flag.store(false, Ordering::Relaxed);
    self.fresh.store(AUTO_LABEL, Ordering::Relaxed);
    self.recycled.lock().unwrap().clear();
  }

  pub fn stats(&self) -> Stats {
    Stats {
      cells_used: self.heap.used(),
      interactions: self.itrs.load(Ordering::Relaxed),
      commutations: self.comms.load(Ordering::Relaxed),
      commutation_flagged: self.comm_flag.load(Ordering::Relaxed),
    }
  }
}
