// Raw term and heap rendering, for the debug flag and for error reports.
// This prints the machine representation; user-facing output goes through
// language::readback instead.

use crate::runtime::base::memory::*;
use crate::runtime::base::state::State;

pub fn tag_name(tag: Tag) -> String {
  match tag {
    VAR => "Var".to_string(),
    LAM => "Lam".to_string(),
    APP => "App".to_string(),
    DUP => "Dup".to_string(),
    CO0 => "Co0".to_string(),
    CO1 => "Co1".to_string(),
    SUP => "Sup".to_string(),
    ERA => "Era".to_string(),
    NUM => "Num".to_string(),
    MAT => "Mat".to_string(),
    SWI => "Swi".to_string(),
    REF => "Ref".to_string(),
    ALO => "Alo".to_string(),
    RED => "Red".to_string(),
    USE => "Use".to_string(),
    EQL => "Eql".to_string(),
    ANN => "Ann".to_string(),
    TYP => "Typ".to_string(),
    ALL => "All".to_string(),
    SIG => "Sig".to_string(),
    SLF => "Slf".to_string(),
    BRI => "Bri".to_string(),
    F_APP => "F-App".to_string(),
    F_MAT => "F-Mat".to_string(),
    F_SWI => "F-Swi".to_string(),
    F_OP2 => "F-Op2".to_string(),
    F_USE => "F-Use".to_string(),
    F_CO0 => "F-Co0".to_string(),
    F_CO1 => "F-Co1".to_string(),
    F_EQ0 => "F-Eq0".to_string(),
    F_EQ1 => "F-Eq1".to_string(),
    F_RED => "F-Red".to_string(),
    t if (C00..=C15).contains(&t) => format!("C{:02}", t - C00),
    t if (P00..=P15).contains(&t) => format!("P{:02}", t - P00),
    t => format!("?{:02X}", t),
  }
}

pub fn show_cell(term: Term) -> String {
  format!(
    "{}{}:{:06X}:{:08X}",
    if is_sub(term) { "~" } else { "" },
    tag_name(get_tag(clr_sub(term))),
    get_ext(clr_sub(term)),
    get_val(clr_sub(term)),
  )
}

// Renders a term tree, chasing substitutions, down to a depth bound.
pub fn show_term(state: &State, term: Term, depth: usize) -> String {
  let heap = &state.heap;
  let term = heap.deref(term);
  if depth == 0 {
    return "...".to_string();
  }
  let loc = get_val(term);
  let go = |at: u64| show_term(state, heap.load(at), depth - 1);
  match get_tag(term) {
    VAR => format!("x{}", loc),
    LAM => format!("λx{} {}", loc, go(loc)),
    APP => format!("({} {})", go(loc), go(loc + 1)),
    DUP => format!("dup &{} = {}; {}", get_ext(term), go(loc + 1), go(loc)),
    CO0 => format!("co0-{}@{}", get_ext(term), loc),
    CO1 => format!("co1-{}@{}", get_ext(term), loc),
    SUP => format!("&{}{{{} {}}}", get_ext(term), go(loc), go(loc + 1)),
    ERA => "*".to_string(),
    NUM => format!("#{}", get_num(term)),
    MAT => {
      let brs: Vec<String> = (0..get_ext(term)).map(|i| go(loc + 1 + i)).collect();
      format!("~{}{{{}}}", go(loc), brs.join(" "))
    }
    SWI => format!("(?{} {} {})", go(loc), go(loc + 1), go(loc + 2)),
    REF => format!("@{}", state.prog.name_of(loc)),
    ALO => format!("@!{}", state.prog.name_of(loc)),
    RED => format!("red({})", go(loc)),
    USE => format!("(seq {} {})", go(loc), go(loc + 1)),
    EQL => format!("(=== {} {})", go(loc), go(loc + 1)),
    ANN => format!("{{{} : {}}}", go(loc), go(loc + 1)),
    TYP => "Type".to_string(),
    ALL => format!("∀({} {})", go(loc), go(loc + 1)),
    SIG => format!("Σ({} {})", go(loc), go(loc + 1)),
    SLF => format!("$({})", go(loc)),
    BRI => format!("†({})", go(loc)),
    t if (C00..=C15).contains(&t) => {
      let fds: Vec<String> = (0..ctr_ari(term)).map(|i| go(loc + i)).collect();
      format!("${}{{{}}}", get_ext(term), fds.join(" "))
    }
    t if (P00..=P15).contains(&t) => {
      let ops: Vec<String> = (0..pri_ari(term)).map(|i| go(loc + i)).collect();
      format!("(p{} {})", get_ext(term), ops.join(" "))
    }
    _ => show_cell(term),
  }
}

// Dumps a window of the heap, one cell per line, skipping empties.
pub fn show_heap(state: &State, from: u64, upto: u64) -> String {
  let mut out = String::new();
  for loc in from..upto.min(state.heap.used()) {
    let cell = state.heap.get(loc);
    if cell != 0 {
      out.push_str(&format!("{:08X} | {}\n", loc, show_cell(cell)));
    }
  }
  out
}
