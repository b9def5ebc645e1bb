// The memory model
// ----------------
//
// The runtime memory is a flat vector of 64-bit terms. That is:
//
//   Heap ::= Vec<Term>
//
// A term has 4 parts:
//
//   Term ::= 0bS_TTTTTTT_EEEEEEEEEEEEEEEEEEEEEEEE_VVVVVVVVVVVVVVVVVVVVVVVVVVVVVVVV
//
// Where:
//
//   S : u1  is the substitution sentinel
//   T : u7  is the term tag
//   E : u24 is the ext field (label / ctor id / prim id / branch count)
//   V : u32 is the val field (heap index, or an immediate 32-bit number)
//
// The meaning of `ext` and `val` depends on the tag:
//
//   Tag | ext              | val
//   ----|------------------|------------------------------------------
//   VAR | unused           | index of the binder slot
//   LAM | unused           | index of the 1-cell node [body]
//   APP | unused           | index of the 2-cell node [fun, arg]
//   DUP | label            | index of the 2-cell node [body, value]
//   CO0 | label            | index of the shared value slot
//   CO1 | label            | index of the shared value slot
//   SUP | label            | index of the 2-cell node [left, right]
//   ERA | unused           | unused
//   NUM | unused           | immediate 32-bit value
//   Cnn | constructor id   | index of the nn-cell field block
//   Pnn | primitive id     | index of the nn-cell operand block
//   MAT | branch count n   | index of the (1+n)-cell node [scrut, b0..bn-1]
//   SWI | unused           | index of the 3-cell node [scrut, zero, succ]
//   REF | unused           | function id in the global table
//   ALO | unused           | function id in the global table
//   RED | unused           | index of the 1-cell node [pending]
//   USE | unused           | index of the 2-cell node [forced, next]
//   EQL | unused           | index of the 2-cell node [lhs, rhs]
//   ANN | unused           | index of the 2-cell node [term, type]
//
// Notes:
//
//   1. A lambda's body cell doubles as its binder slot: the bound VAR points
//      at it, and beta overwrites it with the substituted argument.
//   2. A cell whose sentinel bit is set has been substituted. The rest of the
//      cell is the forwarding term. Substituted cells never change again, so
//      readers may chase them without coordination.
//   3. CO0 and CO1 are the two projections of a duplication. They point at a
//      single shared slot. Whichever projection interacts first receives its
//      half directly and publishes the sibling's half into the slot.
//   4. Interaction-created duplications allocate only the 1-cell shared slot.
//      The 2-cell DUP node exists for the source-level `!&L{x,y}=v;k` form,
//      whose body is entered directly (the node "floats").
//   5. F_* tags only ever appear on the reducer's frame stack, never in the
//      heap. ANN/TYP/ALL/SIG/SLF/BRI are type-level and opaque to evaluation.
//
// Example:
//
//   Core: !&0{a,b}=&0{#1,#2}; (+ a b)
//
//   Memory:
//
//     Root : Term(DUP, 0, 0x00)
//     0x00 | Term(P02, ADD, 0x02)  // the duplication's body
//     0x01 | Term(SUP, 0,   0x04)  // the shared slot, holding the sup
//     0x02 | Term(CO0, 0,   0x01)  // the operator's 1st operand
//     0x03 | Term(CO1, 0,   0x01)  // the operator's 2nd operand
//     0x04 | Term(NUM, 0,   1)
//     0x05 | Term(NUM, 0,   2)

use crate::runtime::base::state::RuntimeError;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// Types
// -----

pub type Term = u64;
pub type Tag = u8;

pub const SUB_BIT: u64 = 1 << 63;
pub const TAG_SHIFT: u64 = 56;
pub const EXT_SHIFT: u64 = 32;
pub const TAG_MASK: u64 = 0x7F;
pub const EXT_MASK: u64 = 0xFF_FFFF;
pub const VAL_MASK: u64 = 0xFFFF_FFFF;

// User labels occupy the low half of the label space; labels generated by the
// auto-dup pass start here. The two ranges never overlap.
pub const AUTO_LABEL: u64 = 1 << 23;

// Tags
// ----

pub const VAR: Tag = 0x00; // variable occurrence
pub const LAM: Tag = 0x01; // lambda
pub const APP: Tag = 0x02; // application
pub const DUP: Tag = 0x03; // source-level duplication node
pub const CO0: Tag = 0x04; // 1st duplication projection
pub const CO1: Tag = 0x05; // 2nd duplication projection
pub const SUP: Tag = 0x06; // superposition
pub const ERA: Tag = 0x07; // eraser
pub const NUM: Tag = 0x08; // unboxed 32-bit number

pub const C00: Tag = 0x10; // constructors; arity = tag - C00
pub const C15: Tag = 0x1F;

pub const P00: Tag = 0x20; // primitives; arity = tag - P00
pub const P01: Tag = 0x21;
pub const P02: Tag = 0x22;
pub const P15: Tag = 0x2F;

pub const MAT: Tag = 0x30; // constructor match
pub const SWI: Tag = 0x31; // numeric switch
pub const REF: Tag = 0x32; // global function reference
pub const ALO: Tag = 0x33; // relocated function reference
pub const RED: Tag = 0x34; // memoized reduction obligation
pub const USE: Tag = 0x35; // strict sequencing
pub const EQL: Tag = 0x36; // structural equality

pub const F_APP: Tag = 0x40; // frame: resume an application
pub const F_MAT: Tag = 0x41; // frame: resume a match
pub const F_SWI: Tag = 0x42; // frame: resume a switch
pub const F_OP2: Tag = 0x43; // frame: resume a primitive
pub const F_USE: Tag = 0x44; // frame: resume a strict sequencing
pub const F_CO0: Tag = 0x45; // frame: resume a duplication (1st side)
pub const F_CO1: Tag = 0x46; // frame: resume a duplication (2nd side)
pub const F_EQ0: Tag = 0x47; // frame: resume an equality (lhs forced)
pub const F_EQ1: Tag = 0x48; // frame: resume an equality (rhs forced)
pub const F_RED: Tag = 0x49; // frame: publish a memoized obligation

pub const ANN: Tag = 0x50; // type annotation
pub const TYP: Tag = 0x51; // type of types
pub const ALL: Tag = 0x52; // function type
pub const SIG: Tag = 0x53; // pair type
pub const SLF: Tag = 0x54; // self type
pub const BRI: Tag = 0x55; // bridge type

// Term codec
// ----------

#[inline(always)]
pub fn term_new(tag: Tag, ext: u64, val: u64) -> Term {
  ((tag as u64) << TAG_SHIFT) | ((ext & EXT_MASK) << EXT_SHIFT) | (val & VAL_MASK)
}

#[inline(always)]
pub fn get_tag(term: Term) -> Tag {
  ((term >> TAG_SHIFT) & TAG_MASK) as Tag
}

#[inline(always)]
pub fn get_ext(term: Term) -> u64 {
  (term >> EXT_SHIFT) & EXT_MASK
}

#[inline(always)]
pub fn get_val(term: Term) -> u64 {
  term & VAL_MASK
}

#[inline(always)]
pub fn get_num(term: Term) -> u32 {
  (term & VAL_MASK) as u32
}

#[inline(always)]
pub fn get_loc(term: Term, arg: u64) -> u64 {
  get_val(term) + arg
}

#[inline(always)]
pub fn is_sub(term: Term) -> bool {
  term & SUB_BIT != 0
}

#[inline(always)]
pub fn set_sub(term: Term) -> Term {
  term | SUB_BIT
}

#[inline(always)]
pub fn clr_sub(term: Term) -> Term {
  term & !SUB_BIT
}

// Term constructors
// -----------------

pub fn Var(pos: u64) -> Term {
  term_new(VAR, 0, pos)
}

pub fn Lam(pos: u64) -> Term {
  term_new(LAM, 0, pos)
}

pub fn App(pos: u64) -> Term {
  term_new(APP, 0, pos)
}

pub fn Dup(lab: u64, pos: u64) -> Term {
  term_new(DUP, lab, pos)
}

pub fn Co0(lab: u64, pos: u64) -> Term {
  term_new(CO0, lab, pos)
}

pub fn Co1(lab: u64, pos: u64) -> Term {
  term_new(CO1, lab, pos)
}

pub fn Co(side: u64, lab: u64, pos: u64) -> Term {
  term_new(if side == 0 { CO0 } else { CO1 }, lab, pos)
}

pub fn Sup(lab: u64, pos: u64) -> Term {
  term_new(SUP, lab, pos)
}

pub fn Era() -> Term {
  term_new(ERA, 0, 0)
}

pub fn Num(val: u32) -> Term {
  term_new(NUM, 0, val as u64)
}

pub fn Ctr(ari: u64, cid: u64, pos: u64) -> Term {
  term_new(C00 + ari as Tag, cid, pos)
}

pub fn Op1(opr: u64, pos: u64) -> Term {
  term_new(P01, opr, pos)
}

pub fn Op2(opr: u64, pos: u64) -> Term {
  term_new(P02, opr, pos)
}

pub fn Mat(nbr: u64, pos: u64) -> Term {
  term_new(MAT, nbr, pos)
}

pub fn Swi(pos: u64) -> Term {
  term_new(SWI, 0, pos)
}

pub fn Ref(fid: u64) -> Term {
  term_new(REF, 0, fid)
}

pub fn Alo(fid: u64) -> Term {
  term_new(ALO, 0, fid)
}

pub fn Red(pos: u64) -> Term {
  term_new(RED, 0, pos)
}

pub fn Use(pos: u64) -> Term {
  term_new(USE, 0, pos)
}

pub fn Eql(pos: u64) -> Term {
  term_new(EQL, 0, pos)
}

pub fn Ann(pos: u64) -> Term {
  term_new(ANN, 0, pos)
}

// Tag classes
// -----------

pub fn ctr_ari(term: Term) -> u64 {
  (get_tag(term) - C00) as u64
}

pub fn pri_ari(term: Term) -> u64 {
  (get_tag(term) - P00) as u64
}

// True for tags whose term has reached weak head normal form.
pub fn is_whnf(tag: Tag) -> bool {
  matches!(tag, LAM | SUP | ERA | NUM | TYP | ALL | SIG | SLF | BRI) || (C00..=C15).contains(&tag)
}

// True for tags whose val field is a heap index.
pub fn has_loc(term: Term) -> bool {
  match get_tag(term) {
    VAR | LAM | APP | DUP | CO0 | CO1 | SUP | MAT | SWI | RED | USE | EQL | ANN | ALL | SIG
    | SLF | BRI => true,
    t if t > C00 && t <= C15 => true,
    t if t > P00 && t <= P15 => true,
    _ => false,
  }
}

// Heap
// ----

pub struct Heap {
  node: Box<[AtomicU64]>,
  next: AtomicU64,
  refs: Option<Box<[AtomicU32]>>,
}

pub fn new_atomic_u64_array(size: usize) -> Box<[AtomicU64]> {
  (0..size).map(|_| AtomicU64::new(0)).collect::<Vec<_>>().into_boxed_slice()
}

pub fn new_atomic_u32_array(size: usize) -> Box<[AtomicU32]> {
  (0..size).map(|_| AtomicU32::new(0)).collect::<Vec<_>>().into_boxed_slice()
}

impl Heap {
  pub fn new(size: usize, refcount: bool) -> Self {
    Heap {
      node: new_atomic_u64_array(size),
      next: AtomicU64::new(0),
      refs: if refcount { Some(new_atomic_u32_array(size)) } else { None },
    }
  }

  pub fn size(&self) -> u64 {
    self.node.len() as u64
  }

  // Number of cells handed out since the last reset.
  pub fn used(&self) -> u64 {
    self.next.load(Ordering::Relaxed).min(self.size())
  }

  // Bumps the allocation cursor by `arity` cells. Returned cells are zeroed.
  pub fn alloc(&self, arity: u64) -> Result<u64, RuntimeError> {
    if arity == 0 {
      return Ok(0);
    }
    let loc = self.next.fetch_add(arity, Ordering::Relaxed);
    if loc + arity > self.size() {
      return Err(RuntimeError::HeapExhausted);
    }
    Ok(loc)
  }

  // Rewinds the allocator. Invalidates every outstanding location.
  pub fn reset(&self) {
    let used = self.used();
    for i in 0..used as usize {
      unsafe { self.node.get_unchecked(i) }.store(0, Ordering::Relaxed);
    }
    if let Some(refs) = &self.refs {
      for i in 0..used as usize {
        unsafe { refs.get_unchecked(i) }.store(0, Ordering::Relaxed);
      }
    }
    self.next.store(0, Ordering::Relaxed);
  }

  // Raw cell read. Pairs with the Release store in `subst`, so a reader that
  // observes the sentinel also observes the full forwarding term.
  pub fn get(&self, loc: u64) -> Term {
    unsafe { self.node.get_unchecked(loc as usize) }.load(Ordering::Acquire)
  }

  // Cell read that transparently resolves a substituted cell.
  pub fn load(&self, loc: u64) -> Term {
    let cell = self.get(loc);
    if is_sub(cell) {
      clr_sub(cell)
    } else {
      cell
    }
  }

  pub fn set(&self, loc: u64, term: Term) {
    unsafe { self.node.get_unchecked(loc as usize) }.store(term, Ordering::Relaxed);
  }

  // Writes a term to memory, maintaining the optional refcount telemetry.
  pub fn link(&self, loc: u64, term: Term) -> Term {
    self.set(loc, term);
    if let Some(refs) = &self.refs {
      if has_loc(term) {
        unsafe { refs.get_unchecked(get_val(term) as usize) }.fetch_add(1, Ordering::Relaxed);
      }
    }
    term
  }

  // Takes the term stored on a cell, leaving it empty.
  pub fn take(&self, loc: u64) -> Term {
    unsafe { self.node.get_unchecked(loc as usize) }.swap(0, Ordering::Relaxed)
  }

  // Publishes a substitution: one 64-bit Release store of the whole
  // forwarding term. The cell is immutable from here on.
  pub fn subst(&self, loc: u64, term: Term) {
    unsafe { self.node.get_unchecked(loc as usize) }.store(set_sub(term), Ordering::Release);
  }

  // Claims a cell for the parallel sweep: flips the sentinel from 0 to 1 and
  // publishes the forwarding term in the same compare-and-swap.
  pub fn try_subst(&self, loc: u64, old: Term, neo: Term) -> bool {
    unsafe { self.node.get_unchecked(loc as usize) }
      .compare_exchange(old, set_sub(neo), Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
  }

  // Chases substituted binder slots until a non-forwarded term is reached.
  // Terminates: substituted cells never become unsubstituted, and each hop
  // lands on a cell that was substituted strictly earlier.
  pub fn deref(&self, mut term: Term) -> Term {
    loop {
      if is_sub(term) {
        term = clr_sub(term);
        continue;
      }
      match get_tag(term) {
        VAR | CO0 | CO1 => {
          let cell = self.get(get_val(term));
          if is_sub(cell) {
            term = clr_sub(cell);
          } else {
            return term;
          }
        }
        _ => return term,
      }
    }
  }

  pub fn refcount(&self, loc: u64) -> u32 {
    match &self.refs {
      Some(refs) => refs[loc as usize].load(Ordering::Relaxed),
      None => 0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codec_roundtrip() {
    let term = term_new(SUP, 0x123456, 0xDEADBEEF);
    assert_eq!(get_tag(term), SUP);
    assert_eq!(get_ext(term), 0x123456);
    assert_eq!(get_val(term), 0xDEADBEEF);
    assert!(!is_sub(term));
    assert!(is_sub(set_sub(term)));
    assert_eq!(clr_sub(set_sub(term)), term);
  }

  #[test]
  fn codec_masks_overflow() {
    let term = term_new(NUM, u64::MAX, u64::MAX);
    assert_eq!(get_tag(term), NUM);
    assert_eq!(get_ext(term), EXT_MASK);
    assert_eq!(get_val(term), VAL_MASK);
  }

  #[test]
  fn ctr_arity_lives_in_the_tag() {
    let term = Ctr(3, 7, 42);
    assert_eq!(get_tag(term), C00 + 3);
    assert_eq!(ctr_ari(term), 3);
    assert_eq!(get_ext(term), 7);
  }

  #[test]
  fn alloc_bumps_and_exhausts() {
    let heap = Heap::new(8, false);
    assert_eq!(heap.alloc(3).unwrap(), 0);
    assert_eq!(heap.alloc(5).unwrap(), 3);
    assert!(matches!(heap.alloc(1), Err(RuntimeError::HeapExhausted)));
    heap.reset();
    assert_eq!(heap.alloc(2).unwrap(), 0);
    assert_eq!(heap.get(0), 0);
  }

  #[test]
  fn deref_is_idempotent() {
    let heap = Heap::new(8, false);
    heap.subst(0, Var(1));
    heap.subst(1, Num(42));
    let got = heap.deref(Var(0));
    assert_eq!(got, Num(42));
    assert_eq!(heap.deref(got), got);
  }
}
