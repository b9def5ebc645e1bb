// Global function table. A definition is compiled to a relocatable block of
// cells: location-bearing terms inside it index into the block itself, and
// expansion offsets them by the freshly allocated base.

use crate::runtime::base::memory::{
  get_ext, get_tag, get_val, has_loc, term_new, Term, AUTO_LABEL, CO0, CO1, DUP, REF,
};
use crate::runtime::base::state::{RuntimeError, State};
use crate::language::safety::Safety;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Def {
  pub name: String,
  pub safe: Safety,
  pub node: Vec<Term>, // cell template, block-relative locations
  pub root: Term,
}

#[derive(Debug)]
pub struct Program {
  pub defs: Vec<Def>,
  pub name_to_fid: HashMap<String, u64>,
}

impl Program {
  pub fn new() -> Self {
    Program { defs: Vec::new(), name_to_fid: HashMap::new() }
  }

  pub fn define(&mut self, def: Def) -> u64 {
    let fid = self.defs.len() as u64;
    self.name_to_fid.insert(def.name.clone(), fid);
    self.defs.push(def);
    fid
  }

  pub fn fid_of(&self, name: &str) -> Option<u64> {
    self.name_to_fid.get(name).copied()
  }

  pub fn name_of(&self, fid: u64) -> &str {
    self.defs.get(fid as usize).map(|def| def.name.as_str()).unwrap_or("?")
  }
}

impl Default for Program {
  fn default() -> Self {
    Self::new()
  }
}

// Each expansion of a definition must carry its own duplication labels: two
// instances sharing a label would annihilate against each other's
// superpositions. Labels from the auto-generated space are therefore remapped
// to fresh ones, consistently across the block; user labels pass through.
fn remap_label(state: &State, labs: &mut Vec<(u64, u64)>, lab: u64) -> u64 {
  if lab < AUTO_LABEL {
    return lab;
  }
  if let Some((_, neo)) = labs.iter().find(|(old, _)| *old == lab) {
    return *neo;
  }
  let neo = state.fresh_label();
  labs.push((lab, neo));
  neo
}

#[inline]
fn relocate(state: &State, labs: &mut Vec<(u64, u64)>, term: Term, base: u64) -> Term {
  let tag = get_tag(term);
  let ext = match tag {
    DUP | CO0 | CO1 => remap_label(state, labs, get_ext(term)),
    _ => get_ext(term),
  };
  let val = if has_loc(term) { get_val(term) + base } else { get_val(term) };
  term_new(tag, ext, val)
}

// Inline-expands a definition: allocates its block and returns the offset
// root. References inside the block stay lazy.
pub fn instantiate(state: &State, fid: u64) -> Result<Term, RuntimeError> {
  let def = state.prog.defs.get(fid as usize).ok_or(RuntimeError::UnknownTag(REF))?;
  let base = state.heap.alloc(def.node.len() as u64)?;
  let mut labs = Vec::new();
  for (i, cell) in def.node.iter().enumerate() {
    state.heap.set(base + i as u64, relocate(state, &mut labs, *cell, base));
  }
  state.inc_itrs();
  Ok(relocate(state, &mut labs, def.root, base))
}
