// Heap -> AST readback. Recovers a surface term from a (typically
// normalized) heap region, inventing a name per binder slot. Duplication
// projections that are still pending read back as suffixed variables bound
// by a floating dup, which keeps shared spines printable without expanding
// them. Depth-bounded against cyclic duplication structures.

use crate::language::syntax::Term;
use crate::runtime::base::memory::{self as rt, Term as RtTerm};
use crate::runtime::base::state::State;
use std::collections::HashMap;

pub struct Readback<'a> {
  state: &'a State,
  names: HashMap<u64, String>,
  next: usize,
}

// a, b, ..., z, aa, ab, ...
fn name_of(mut idx: usize) -> String {
  let mut name = String::new();
  loop {
    name.insert(0, (b'a' + (idx % 26) as u8) as char);
    idx = idx / 26;
    if idx == 0 {
      break;
    }
    idx -= 1;
  }
  name
}

impl<'a> Readback<'a> {
  pub fn new(state: &'a State) -> Self {
    Readback { state, names: HashMap::new(), next: 0 }
  }

  fn fresh(&mut self) -> String {
    let name = name_of(self.next);
    self.next += 1;
    name
  }

  fn binder(&mut self, slot: u64) -> String {
    if let Some(name) = self.names.get(&slot) {
      return name.clone();
    }
    let name = self.fresh();
    self.names.insert(slot, name.clone());
    name
  }

  pub fn go(&mut self, term: RtTerm, depth: usize) -> Term {
    let heap = &self.state.heap;
    let term = heap.deref(term);
    if depth == 0 {
      return Term::Var { nam: "...".to_string() };
    }
    let loc = rt::get_val(term);
    match rt::get_tag(term) {
      rt::VAR => Term::Var { nam: self.binder(loc) },
      rt::LAM => {
        let nam = self.binder(loc);
        let bod = self.go(heap.load(loc), depth - 1);
        Term::Lam { nam, bod: Box::new(bod) }
      }
      rt::APP => Term::App {
        fun: Box::new(self.go(heap.load(loc), depth - 1)),
        arg: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::SUP => Term::Sup {
        lab: rt::get_ext(term),
        fst: Box::new(self.go(heap.load(loc), depth - 1)),
        snd: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::DUP => {
        let nam = self.binder(loc + 1);
        Term::Dup {
          lab: rt::get_ext(term),
          fst: format!("{}0", nam),
          snd: format!("{}1", nam),
          val: Box::new(self.go(heap.load(loc + 1), depth - 1)),
          bod: Box::new(self.go(heap.load(loc), depth - 1)),
        }
      }
      rt::CO0 | rt::CO1 => {
        let side = if rt::get_tag(term) == rt::CO0 { 0 } else { 1 };
        let nam = self.binder(loc);
        Term::Var { nam: format!("{}{}", nam, side) }
      }
      rt::ERA => Term::Era,
      rt::NUM => Term::Num { val: rt::get_num(term) },
      rt::MAT => Term::Mat {
        cnd: Box::new(self.go(heap.load(loc), depth - 1)),
        brs: (0..rt::get_ext(term)).map(|i| self.go(heap.load(loc + 1 + i), depth - 1)).collect(),
      },
      rt::SWI => Term::Swi {
        cnd: Box::new(self.go(heap.load(loc), depth - 1)),
        zer: Box::new(self.go(heap.load(loc + 1), depth - 1)),
        suc: Box::new(self.go(heap.load(loc + 2), depth - 1)),
      },
      rt::REF | rt::ALO => Term::Ref { nam: self.state.prog.name_of(loc).to_string() },
      rt::RED => self.go(heap.load(loc), depth - 1),
      rt::USE => Term::Use {
        val: Box::new(self.go(heap.load(loc), depth - 1)),
        bod: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::EQL => Term::Eql {
        fst: Box::new(self.go(heap.load(loc), depth - 1)),
        snd: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::ANN => Term::Ann {
        val: Box::new(self.go(heap.load(loc), depth - 1)),
        typ: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::TYP => Term::Typ,
      rt::ALL => Term::All {
        inp: Box::new(self.go(heap.load(loc), depth - 1)),
        out: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::SIG => Term::Sig {
        fst: Box::new(self.go(heap.load(loc), depth - 1)),
        snd: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      rt::SLF => Term::Slf { bod: Box::new(self.go(heap.load(loc), depth - 1)) },
      rt::BRI => Term::Bri { bod: Box::new(self.go(heap.load(loc), depth - 1)) },
      tag if tag >= rt::C00 && tag <= rt::C15 => Term::Ctr {
        cid: rt::get_ext(term),
        fds: (0..rt::ctr_ari(term)).map(|i| self.go(heap.load(loc + i), depth - 1)).collect(),
      },
      tag if tag == rt::P01 => {
        Term::Op1 { opr: rt::get_ext(term), val: Box::new(self.go(heap.load(loc), depth - 1)) }
      }
      tag if tag >= rt::P00 && tag <= rt::P15 => Term::Op2 {
        opr: rt::get_ext(term),
        fst: Box::new(self.go(heap.load(loc), depth - 1)),
        snd: Box::new(self.go(heap.load(loc + 1), depth - 1)),
      },
      _ => Term::Era,
    }
  }
}

pub const MAX_DEPTH: usize = 4096;

pub fn as_term(state: &State, term: RtTerm) -> Term {
  Readback::new(state).go(term, MAX_DEPTH)
}

pub fn as_code(state: &State, term: RtTerm) -> String {
  as_term(state, term).show()
}
