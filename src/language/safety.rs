// Static safety analysis. The dangerous shape is a cloner cloning a cloner:
// a duplication whose duplicated expression contains a lambda that itself
// clones, which is the standard source of exponential blow-up. Terms with no
// duplication at all cannot blow up and are safe to copy freely.

use crate::language::syntax::Term;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Safety {
  Safe,
  Warn,
  Unsafe,
}

impl std::fmt::Display for Safety {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Safety::Safe => write!(f, "safe"),
      Safety::Warn => write!(f, "warn"),
      Safety::Unsafe => write!(f, "unsafe"),
    }
  }
}

pub fn analyze_safety(term: &Term) -> Safety {
  if !has_clone(term) {
    return Safety::Safe;
  }
  if dups_a_cloner(term) {
    return Safety::Unsafe;
  }
  Safety::Warn
}

// Any duplication or superposition in the term.
fn has_clone(term: &Term) -> bool {
  matches!(term, Term::Dup { .. } | Term::Sup { .. }) || any_child(term, has_clone)
}

// A lambda whose body clones.
fn lam_that_clones(term: &Term) -> bool {
  match term {
    Term::Lam { bod, .. } => has_clone(bod),
    _ => any_child(term, lam_that_clones),
  }
}

// A duplication whose duplicated expression contains a cloning lambda.
fn dups_a_cloner(term: &Term) -> bool {
  match term {
    Term::Dup { val, bod, .. } => {
      lam_that_clones(val) || dups_a_cloner(val) || dups_a_cloner(bod)
    }
    _ => any_child(term, dups_a_cloner),
  }
}

fn any_child(term: &Term, pred: fn(&Term) -> bool) -> bool {
  match term {
    Term::Var { .. } | Term::Ref { .. } | Term::Era | Term::Num { .. } | Term::Typ => false,
    Term::Lam { bod, .. } | Term::Slf { bod } | Term::Bri { bod } => pred(bod),
    Term::App { fun, arg } => pred(fun) || pred(arg),
    Term::Sup { fst, snd, .. } => pred(fst) || pred(snd),
    Term::Dup { val, bod, .. } => pred(val) || pred(bod),
    Term::Ctr { fds, .. } => fds.iter().any(pred),
    Term::Mat { cnd, brs } => pred(cnd) || brs.iter().any(pred),
    Term::Swi { cnd, zer, suc } => pred(cnd) || pred(zer) || pred(suc),
    Term::Op1 { val, .. } => pred(val),
    Term::Op2 { fst, snd, .. } => pred(fst) || pred(snd),
    Term::Use { val, bod } => pred(val) || pred(bod),
    Term::Eql { fst, snd } => pred(fst) || pred(snd),
    Term::Ann { val, typ } => pred(val) || pred(typ),
    Term::All { inp, out } => pred(inp) || pred(out),
    Term::Sig { fst, snd } => pred(fst) || pred(snd),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::language::syntax::read_term;

  #[test]
  fn plain_terms_are_safe() {
    let term = read_term("\\x.(+ x #1)").unwrap();
    assert_eq!(analyze_safety(&term), Safety::Safe);
  }

  #[test]
  fn duplication_warns() {
    let term = read_term("!&0{a,b}=#1; (+ a b)").unwrap();
    assert_eq!(analyze_safety(&term), Safety::Warn);
  }

  #[test]
  fn cloning_a_cloner_is_unsafe() {
    let term = read_term("!&0{f,g}=\\x.!&1{a,b}=x; (a b); (f g)").unwrap();
    assert_eq!(analyze_safety(&term), Safety::Unsafe);
  }
}
