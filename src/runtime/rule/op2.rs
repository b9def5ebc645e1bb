use crate::runtime::base::memory::*;
use crate::runtime::base::reducer::Flow;
use crate::runtime::base::state::{RuntimeError, State};

// Primitive ids
// -------------

pub const ADD: u64 = 0x0;
pub const SUB: u64 = 0x1;
pub const MUL: u64 = 0x2;
pub const DIV: u64 = 0x3;
pub const MOD: u64 = 0x4;
pub const AND: u64 = 0x5;
pub const OR: u64 = 0x6;
pub const XOR: u64 = 0x7;
pub const LSH: u64 = 0x8;
pub const RSH: u64 = 0x9;
pub const NOT: u64 = 0xA;
pub const EQ: u64 = 0xB;
pub const NE: u64 = 0xC;
pub const LT: u64 = 0xD;
pub const LE: u64 = 0xE;
pub const GT: u64 = 0xF;
pub const GE: u64 = 0x10;

pub const OP_COUNT: u64 = 0x11;

// Evaluates a primitive on 32-bit immediates. Arithmetic is modular; DIV and
// MOD by zero yield zero; shift amounts are masked with 31; comparisons
// yield 1 or 0. NOT ignores its second operand.
#[inline(always)]
pub fn op(opr: u64, a: u32, b: u32) -> Result<u32, RuntimeError> {
  Ok(match opr {
    ADD => a.wrapping_add(b),
    SUB => a.wrapping_sub(b),
    MUL => a.wrapping_mul(b),
    DIV => {
      if b == 0 {
        0
      } else {
        a / b
      }
    }
    MOD => {
      if b == 0 {
        0
      } else {
        a % b
      }
    }
    AND => a & b,
    OR => a | b,
    XOR => a ^ b,
    LSH => a << (b & 31),
    RSH => a >> (b & 31),
    NOT => !a,
    EQ => u32::from(a == b),
    NE => u32::from(a != b),
    LT => u32::from(a < b),
    LE => u32::from(a <= b),
    GT => u32::from(a > b),
    GE => u32::from(a >= b),
    _ => return Err(RuntimeError::UnknownPrimitive(opr)),
  })
}

// (+ a b), a and b both numbers
// ----------------------------- OP2-NUM
// a + b
#[inline]
pub fn apply_num(state: &State, opr: u64, a: u32, b: u32) -> Result<Flow, RuntimeError> {
  state.inc_itrs();
  Ok(Flow::Value(Num(op(opr, a, b)?)))
}

// (+ {a0 a1} b)
// --------------------- OP2-SUP (either operand)
// dup b0 b1 = b
// {(+ a0 b0) (+ a1 b1)}
//
// `which` names the superposed operand slot (0 or 1).
#[inline]
pub fn apply_sup(state: &State, opr: u64, loc: u64, which: u64, sup: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;
  state.inc_itrs();
  let lab = get_ext(sup);
  let sup_loc = get_val(sup);
  let other = 1 - which;
  let shr = heap.alloc(1)?;
  let op1 = heap.alloc(2)?;
  heap.link(shr, heap.load(loc + other));
  heap.link(loc + which, heap.load(sup_loc + 0));
  heap.link(loc + other, Co0(lab, shr));
  heap.link(op1 + which, heap.load(sup_loc + 1));
  heap.link(op1 + other, Co1(lab, shr));
  heap.link(sup_loc + 0, Op2(opr, loc));
  heap.link(sup_loc + 1, Op2(opr, op1));
  Ok(Flow::Value(Sup(lab, sup_loc)))
}

// (! {a b})
// --------------- OP1-SUP
// {(! a) (! b)}
#[inline]
pub fn apply_sup_unary(state: &State, opr: u64, sup: Term) -> Result<Flow, RuntimeError> {
  let heap = &state.heap;
  state.inc_itrs();
  let lab = get_ext(sup);
  let sup_loc = get_val(sup);
  let un0 = heap.alloc(1)?;
  let un1 = heap.alloc(1)?;
  heap.link(un0, heap.load(sup_loc + 0));
  heap.link(un1, heap.load(sup_loc + 1));
  heap.link(sup_loc + 0, Op1(opr, un0));
  heap.link(sup_loc + 1, Op1(opr, un1));
  Ok(Flow::Value(Sup(lab, sup_loc)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn division_by_zero_is_zero() {
    assert_eq!(op(DIV, 42, 0).unwrap(), 0);
    assert_eq!(op(MOD, 42, 0).unwrap(), 0);
  }

  #[test]
  fn shifts_mask_their_amount() {
    assert_eq!(op(LSH, 1, 33).unwrap(), 2);
    assert_eq!(op(RSH, 4, 33).unwrap(), 2);
  }

  #[test]
  fn comparisons_yield_bits() {
    assert_eq!(op(LT, 1, 2).unwrap(), 1);
    assert_eq!(op(GE, 1, 2).unwrap(), 0);
    assert_eq!(op(EQ, 7, 7).unwrap(), 1);
  }

  #[test]
  fn arithmetic_wraps() {
    assert_eq!(op(ADD, u32::MAX, 1).unwrap(), 0);
    assert_eq!(op(MUL, 1 << 31, 2).unwrap(), 0);
  }

  #[test]
  fn unknown_ids_are_rejected() {
    assert!(matches!(op(OP_COUNT, 1, 1), Err(RuntimeError::UnknownPrimitive(_))));
  }
}
