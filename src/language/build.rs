// AST -> heap builder. Definitions compile to relocatable cell templates:
// every location-bearing term inside the block indexes the block itself, so
// expansion is a copy plus an offset.

use crate::language::safety::analyze_safety;
use crate::language::syntax::{Book, Term};
use crate::runtime::base::memory::{self as rt, Term as RtTerm};
use crate::runtime::base::program::{Def, Program};
use std::collections::HashMap;

struct Builder<'b> {
  cells: Vec<RtTerm>,
  scope: HashMap<String, Vec<RtTerm>>,
  fids: &'b HashMap<String, u64>,
}

impl<'b> Builder<'b> {
  fn bind(&mut self, nam: &str, term: RtTerm) {
    self.scope.entry(nam.to_string()).or_default().push(term);
  }

  fn unbind(&mut self, nam: &str) {
    if let Some(stack) = self.scope.get_mut(nam) {
      stack.pop();
    }
  }

  fn reserve(&mut self, arity: u64) -> u64 {
    let loc = self.cells.len() as u64;
    for _ in 0..arity {
      self.cells.push(0);
    }
    loc
  }

  fn go(&mut self, term: &Term) -> Result<RtTerm, String> {
    match term {
      Term::Var { nam } => match self.scope.get(nam).and_then(|stack| stack.last()) {
        Some(bound) => Ok(*bound),
        None => Err(format!("unbound variable: {}", nam)),
      },
      Term::Ref { nam } => match self.fids.get(nam) {
        Some(fid) => Ok(rt::Ref(*fid)),
        None => Err(format!("unbound reference: @{}", nam)),
      },
      Term::Era => Ok(rt::Era()),
      Term::Num { val } => Ok(rt::Num(*val)),
      Term::Lam { nam, bod } => {
        let loc = self.reserve(1);
        self.bind(nam, rt::Var(loc));
        let bod = self.go(bod)?;
        self.unbind(nam);
        self.cells[loc as usize] = bod;
        Ok(rt::Lam(loc))
      }
      Term::App { fun, arg } => {
        let loc = self.reserve(2);
        let fun = self.go(fun)?;
        let arg = self.go(arg)?;
        self.cells[loc as usize] = fun;
        self.cells[loc as usize + 1] = arg;
        Ok(rt::App(loc))
      }
      Term::Sup { lab, fst, snd } => {
        let loc = self.reserve(2);
        let fst = self.go(fst)?;
        let snd = self.go(snd)?;
        self.cells[loc as usize] = fst;
        self.cells[loc as usize + 1] = snd;
        Ok(rt::Sup(*lab, loc))
      }
      Term::Dup { lab, fst, snd, val, bod } => {
        let loc = self.reserve(2);
        let val = self.go(val)?;
        self.cells[loc as usize + 1] = val;
        self.bind(fst, rt::Co0(*lab, loc + 1));
        self.bind(snd, rt::Co1(*lab, loc + 1));
        let bod = self.go(bod)?;
        self.unbind(snd);
        self.unbind(fst);
        self.cells[loc as usize] = bod;
        Ok(rt::Dup(*lab, loc))
      }
      Term::Ctr { cid, fds } => {
        if fds.len() > 15 {
          return Err(format!("constructor arity too high: {}", fds.len()));
        }
        let loc = self.reserve(fds.len() as u64);
        for (i, fd) in fds.iter().enumerate() {
          let fd = self.go(fd)?;
          self.cells[loc as usize + i] = fd;
        }
        Ok(rt::Ctr(fds.len() as u64, *cid, loc))
      }
      Term::Mat { cnd, brs } => {
        let loc = self.reserve(1 + brs.len() as u64);
        let cnd = self.go(cnd)?;
        self.cells[loc as usize] = cnd;
        for (i, br) in brs.iter().enumerate() {
          let br = self.go(br)?;
          self.cells[loc as usize + 1 + i] = br;
        }
        Ok(rt::Mat(brs.len() as u64, loc))
      }
      Term::Swi { cnd, zer, suc } => {
        let loc = self.reserve(3);
        let cnd = self.go(cnd)?;
        let zer = self.go(zer)?;
        let suc = self.go(suc)?;
        self.cells[loc as usize] = cnd;
        self.cells[loc as usize + 1] = zer;
        self.cells[loc as usize + 2] = suc;
        Ok(rt::Swi(loc))
      }
      Term::Op1 { opr, val } => {
        let loc = self.reserve(1);
        let val = self.go(val)?;
        self.cells[loc as usize] = val;
        Ok(rt::Op1(*opr, loc))
      }
      Term::Op2 { opr, fst, snd } => {
        let loc = self.reserve(2);
        let fst = self.go(fst)?;
        let snd = self.go(snd)?;
        self.cells[loc as usize] = fst;
        self.cells[loc as usize + 1] = snd;
        Ok(rt::Op2(*opr, loc))
      }
      Term::Use { val, bod } => {
        let loc = self.reserve(2);
        let val = self.go(val)?;
        let bod = self.go(bod)?;
        self.cells[loc as usize] = val;
        self.cells[loc as usize + 1] = bod;
        Ok(rt::Use(loc))
      }
      Term::Eql { fst, snd } => {
        let loc = self.reserve(2);
        let fst = self.go(fst)?;
        let snd = self.go(snd)?;
        self.cells[loc as usize] = fst;
        self.cells[loc as usize + 1] = snd;
        Ok(rt::Eql(loc))
      }
      Term::Ann { val, typ } => {
        let loc = self.reserve(2);
        let val = self.go(val)?;
        let typ = self.go(typ)?;
        self.cells[loc as usize] = val;
        self.cells[loc as usize + 1] = typ;
        Ok(rt::Ann(loc))
      }
      Term::Typ => Ok(rt::term_new(rt::TYP, 0, 0)),
      Term::All { inp, out } => {
        let loc = self.reserve(2);
        let inp = self.go(inp)?;
        let out = self.go(out)?;
        self.cells[loc as usize] = inp;
        self.cells[loc as usize + 1] = out;
        Ok(rt::term_new(rt::ALL, 0, loc))
      }
      Term::Sig { fst, snd } => {
        let loc = self.reserve(2);
        let fst = self.go(fst)?;
        let snd = self.go(snd)?;
        self.cells[loc as usize] = fst;
        self.cells[loc as usize + 1] = snd;
        Ok(rt::term_new(rt::SIG, 0, loc))
      }
      Term::Slf { bod } => {
        let loc = self.reserve(1);
        let bod = self.go(bod)?;
        self.cells[loc as usize] = bod;
        Ok(rt::term_new(rt::SLF, 0, loc))
      }
      Term::Bri { bod } => {
        let loc = self.reserve(1);
        let bod = self.go(bod)?;
        self.cells[loc as usize] = bod;
        Ok(rt::term_new(rt::BRI, 0, loc))
      }
    }
  }
}

// Compiles one definition to a relocatable template.
pub fn build_def(name: &str, term: &Term, fids: &HashMap<String, u64>) -> Result<Def, String> {
  let mut builder = Builder { cells: Vec::new(), scope: HashMap::new(), fids };
  let root = builder.go(term)?;
  Ok(Def { name: name.to_string(), safe: analyze_safety(term), node: builder.cells, root })
}

// Compiles a whole book. `main`, when present, always receives fid 0.
pub fn build_book(book: &Book) -> Result<Program, String> {
  let mut order: Vec<&(String, Term)> = Vec::new();
  for def in &book.defs {
    if def.0 == "main" {
      order.insert(0, def);
    } else {
      order.push(def);
    }
  }
  let mut fids = HashMap::new();
  for (fid, (name, _)) in order.iter().enumerate() {
    if fids.insert(name.clone(), fid as u64).is_some() {
      return Err(format!("duplicate definition: @{}", name));
    }
  }
  let mut prog = Program::new();
  for (name, term) in &order {
    prog.define(build_def(name, term, &fids)?);
  }
  Ok(prog)
}
