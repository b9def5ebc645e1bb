// The use-count pass. Variables are affine at runtime: a binder used n > 1
// times gets n-1 duplications threaded linearly above its body, and each use
// site is rewritten to one projection of the chain. Labels come from the
// auto-generated space, which never overlaps user labels.

use crate::language::syntax::{Book, Term};
use crate::runtime::base::memory::AUTO_LABEL;
use std::collections::VecDeque;

pub fn auto_dup(term: &Term) -> Term {
  let mut fresh = AUTO_LABEL;
  auto_dup_term(term, &mut fresh)
}

pub fn auto_dup_book(book: &Book) -> Book {
  let mut fresh = AUTO_LABEL;
  Book {
    defs: book.defs.iter().map(|(name, term)| (name.clone(), auto_dup_term(term, &mut fresh))).collect(),
  }
}

pub fn auto_dup_term(term: &Term, fresh: &mut u64) -> Term {
  match term {
    Term::Var { .. } | Term::Ref { .. } | Term::Era | Term::Num { .. } | Term::Typ => term.clone(),
    Term::Lam { nam, bod } => {
      let bod = auto_dup_term(bod, fresh);
      let bod = split_uses(nam, bod, fresh);
      Term::Lam { nam: nam.clone(), bod: Box::new(bod) }
    }
    Term::App { fun, arg } => Term::App {
      fun: Box::new(auto_dup_term(fun, fresh)),
      arg: Box::new(auto_dup_term(arg, fresh)),
    },
    Term::Sup { lab, fst, snd } => Term::Sup {
      lab: *lab,
      fst: Box::new(auto_dup_term(fst, fresh)),
      snd: Box::new(auto_dup_term(snd, fresh)),
    },
    Term::Dup { lab, fst, snd, val, bod } => {
      let val = auto_dup_term(val, fresh);
      let bod = auto_dup_term(bod, fresh);
      let bod = split_uses(fst, bod, fresh);
      let bod = split_uses(snd, bod, fresh);
      Term::Dup {
        lab: *lab,
        fst: fst.clone(),
        snd: snd.clone(),
        val: Box::new(val),
        bod: Box::new(bod),
      }
    }
    Term::Ctr { cid, fds } => {
      Term::Ctr { cid: *cid, fds: fds.iter().map(|fd| auto_dup_term(fd, fresh)).collect() }
    }
    Term::Mat { cnd, brs } => Term::Mat {
      cnd: Box::new(auto_dup_term(cnd, fresh)),
      brs: brs.iter().map(|br| auto_dup_term(br, fresh)).collect(),
    },
    Term::Swi { cnd, zer, suc } => Term::Swi {
      cnd: Box::new(auto_dup_term(cnd, fresh)),
      zer: Box::new(auto_dup_term(zer, fresh)),
      suc: Box::new(auto_dup_term(suc, fresh)),
    },
    Term::Op1 { opr, val } => Term::Op1 { opr: *opr, val: Box::new(auto_dup_term(val, fresh)) },
    Term::Op2 { opr, fst, snd } => Term::Op2 {
      opr: *opr,
      fst: Box::new(auto_dup_term(fst, fresh)),
      snd: Box::new(auto_dup_term(snd, fresh)),
    },
    Term::Use { val, bod } => Term::Use {
      val: Box::new(auto_dup_term(val, fresh)),
      bod: Box::new(auto_dup_term(bod, fresh)),
    },
    Term::Eql { fst, snd } => Term::Eql {
      fst: Box::new(auto_dup_term(fst, fresh)),
      snd: Box::new(auto_dup_term(snd, fresh)),
    },
    Term::Ann { val, typ } => Term::Ann {
      val: Box::new(auto_dup_term(val, fresh)),
      typ: Box::new(auto_dup_term(typ, fresh)),
    },
    Term::All { inp, out } => Term::All {
      inp: Box::new(auto_dup_term(inp, fresh)),
      out: Box::new(auto_dup_term(out, fresh)),
    },
    Term::Sig { fst, snd } => Term::Sig {
      fst: Box::new(auto_dup_term(fst, fresh)),
      snd: Box::new(auto_dup_term(snd, fresh)),
    },
    Term::Slf { bod } => Term::Slf { bod: Box::new(auto_dup_term(bod, fresh)) },
    Term::Bri { bod } => Term::Bri { bod: Box::new(auto_dup_term(bod, fresh)) },
  }
}

// If `nam` occurs n > 1 times in `bod`, renames the occurrences in traversal
// order and threads a linear duplication chain above the body.
fn split_uses(nam: &str, bod: Term, fresh: &mut u64) -> Term {
  let n = count_uses(&bod, nam);
  if n <= 1 {
    return bod;
  }
  let uses: Vec<String> = (0..n).map(|i| format!("{}${}", nam, i)).collect();
  let mut queue: VecDeque<String> = uses.iter().cloned().collect();
  let mut bod = rename_uses(bod, nam, &mut queue);
  let tmp = |i: usize| format!("{}$t{}", nam, i);
  let labs: Vec<u64> = (0..n - 1)
    .map(|_| {
      let lab = *fresh;
      *fresh += 1;
      lab
    })
    .collect();
  for i in (0..n - 1).rev() {
    let lab = labs[i];
    let fst = uses[i].clone();
    let snd = if i == n - 2 { uses[n - 1].clone() } else { tmp(i) };
    let val = if i == 0 { nam.to_string() } else { tmp(i - 1) };
    bod = Term::Dup {
      lab,
      fst,
      snd,
      val: Box::new(Term::Var { nam: val }),
      bod: Box::new(bod),
    };
  }
  bod
}

// Counts free occurrences of `nam`, stopping at shadowing binders.
pub fn count_uses(term: &Term, nam: &str) -> usize {
  match term {
    Term::Var { nam: got } => usize::from(got == nam),
    Term::Ref { .. } | Term::Era | Term::Num { .. } | Term::Typ => 0,
    Term::Lam { nam: bnd, bod } => {
      if bnd == nam {
        0
      } else {
        count_uses(bod, nam)
      }
    }
    Term::App { fun, arg } => count_uses(fun, nam) + count_uses(arg, nam),
    Term::Sup { fst, snd, .. } => count_uses(fst, nam) + count_uses(snd, nam),
    Term::Dup { fst, snd, val, bod, .. } => {
      let in_bod = if fst == nam || snd == nam { 0 } else { count_uses(bod, nam) };
      count_uses(val, nam) + in_bod
    }
    Term::Ctr { fds, .. } => fds.iter().map(|fd| count_uses(fd, nam)).sum(),
    Term::Mat { cnd, brs } => {
      count_uses(cnd, nam) + brs.iter().map(|br| count_uses(br, nam)).sum::<usize>()
    }
    Term::Swi { cnd, zer, suc } => {
      count_uses(cnd, nam) + count_uses(zer, nam) + count_uses(suc, nam)
    }
    Term::Op1 { val, .. } => count_uses(val, nam),
    Term::Op2 { fst, snd, .. } => count_uses(fst, nam) + count_uses(snd, nam),
    Term::Use { val, bod } => count_uses(val, nam) + count_uses(bod, nam),
    Term::Eql { fst, snd } => count_uses(fst, nam) + count_uses(snd, nam),
    Term::Ann { val, typ } => count_uses(val, nam) + count_uses(typ, nam),
    Term::All { inp, out } => count_uses(inp, nam) + count_uses(out, nam),
    Term::Sig { fst, snd } => count_uses(fst, nam) + count_uses(snd, nam),
    Term::Slf { bod } | Term::Bri { bod } => count_uses(bod, nam),
  }
}

// Replaces free occurrences of `nam` with the queued names, in the same
// traversal order `count_uses` counts them.
fn rename_uses(term: Term, nam: &str, queue: &mut VecDeque<String>) -> Term {
  match term {
    Term::Var { nam: got } => {
      if got == nam {
        Term::Var { nam: queue.pop_front().expect("use count mismatch") }
      } else {
        Term::Var { nam: got }
      }
    }
    Term::Ref { .. } | Term::Era | Term::Num { .. } | Term::Typ => term,
    Term::Lam { nam: bnd, bod } => {
      if bnd == nam {
        Term::Lam { nam: bnd, bod }
      } else {
        Term::Lam { nam: bnd, bod: Box::new(rename_uses(*bod, nam, queue)) }
      }
    }
    Term::App { fun, arg } => Term::App {
      fun: Box::new(rename_uses(*fun, nam, queue)),
      arg: Box::new(rename_uses(*arg, nam, queue)),
    },
    Term::Sup { lab, fst, snd } => Term::Sup {
      lab,
      fst: Box::new(rename_uses(*fst, nam, queue)),
      snd: Box::new(rename_uses(*snd, nam, queue)),
    },
    Term::Dup { lab, fst, snd, val, bod } => {
      let val = Box::new(rename_uses(*val, nam, queue));
      let bod = if fst == nam || snd == nam {
        bod
      } else {
        Box::new(rename_uses(*bod, nam, queue))
      };
      Term::Dup { lab, fst, snd, val, bod }
    }
    Term::Ctr { cid, fds } => Term::Ctr {
      cid,
      fds: fds.into_iter().map(|fd| rename_uses(fd, nam, queue)).collect(),
    },
    Term::Mat { cnd, brs } => Term::Mat {
      cnd: Box::new(rename_uses(*cnd, nam, queue)),
      brs: brs.into_iter().map(|br| rename_uses(br, nam, queue)).collect(),
    },
    Term::Swi { cnd, zer, suc } => Term::Swi {
      cnd: Box::new(rename_uses(*cnd, nam, queue)),
      zer: Box::new(rename_uses(*zer, nam, queue)),
      suc: Box::new(rename_uses(*suc, nam, queue)),
    },
    Term::Op1 { opr, val } => Term::Op1 { opr, val: Box::new(rename_uses(*val, nam, queue)) },
    Term::Op2 { opr, fst, snd } => Term::Op2 {
      opr,
      fst: Box::new(rename_uses(*fst, nam, queue)),
      snd: Box::new(rename_uses(*snd, nam, queue)),
    },
    Term::Use { val, bod } => Term::Use {
      val: Box::new(rename_uses(*val, nam, queue)),
      bod: Box::new(rename_uses(*bod, nam, queue)),
    },
    Term::Eql { fst, snd } => Term::Eql {
      fst: Box::new(rename_uses(*fst, nam, queue)),
      snd: Box::new(rename_uses(*snd, nam, queue)),
    },
    Term::Ann { val, typ } => Term::Ann {
      val: Box::new(rename_uses(*val, nam, queue)),
      typ: Box::new(rename_uses(*typ, nam, queue)),
    },
    Term::All { inp, out } => Term::All {
      inp: Box::new(rename_uses(*inp, nam, queue)),
      out: Box::new(rename_uses(*out, nam, queue)),
    },
    Term::Sig { fst, snd } => Term::Sig {
      fst: Box::new(rename_uses(*fst, nam, queue)),
      snd: Box::new(rename_uses(*snd, nam, queue)),
    },
    Term::Slf { bod } => Term::Slf { bod: Box::new(rename_uses(*bod, nam, queue)) },
    Term::Bri { bod } => Term::Bri { bod: Box::new(rename_uses(*bod, nam, queue)) },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::language::syntax::read_term;

  #[test]
  fn single_uses_are_untouched() {
    let term = read_term("\\x.(+ x #1)").unwrap();
    assert_eq!(auto_dup(&term), term);
  }

  #[test]
  fn double_use_gets_one_dup() {
    let term = read_term("\\x.(+ x x)").unwrap();
    let got = auto_dup(&term);
    match got {
      Term::Lam { bod, .. } => match *bod {
        Term::Dup { lab, fst, snd, .. } => {
          assert!(lab >= AUTO_LABEL);
          assert_eq!(fst, "x$0");
          assert_eq!(snd, "x$1");
        }
        other => panic!("expected dup, got {}", other.show()),
      },
      other => panic!("expected lam, got {}", other.show()),
    }
  }

  #[test]
  fn triple_use_gets_a_chain() {
    let term = read_term("\\x.(+ x (+ x x))").unwrap();
    let got = auto_dup(&term);
    let shown = got.show();
    // two dups, three projections, threaded linearly
    assert_eq!(shown.matches("!&").count(), 2);
    assert!(shown.contains("x$0"));
    assert!(shown.contains("x$2"));
  }
}
