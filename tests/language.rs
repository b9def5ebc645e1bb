use icvm::language::autodup::auto_dup;
use icvm::language::syntax::{read_book, read_term};
use icvm::{analyze_safety, Safety};
use insta::assert_snapshot;

#[test]
fn parses_and_prints_the_surface_forms() {
  let roundtrip = |src: &str| read_term(src).unwrap().show();
  assert_snapshot!(roundtrip("(+ #21 #21)"), @"(+ #21 #21)");
  assert_snapshot!(roundtrip("\\x.(x #1)"), @"\\x.(x #1)");
  assert_snapshot!(roundtrip("!&0{a,b}=&0{#1,#2}; (+ a b)"), @"!&0{a,b}=&0{#1,#2}; (+ a b)");
  assert_snapshot!(roundtrip("(?#3 #10 \\p.p)"), @"(?#3 #10 \\p.p)");
  assert_snapshot!(roundtrip("~$0{#7 #8}{\\a.\\b.(+ a b)}"), @"~$0{#7 #8}{\\a.\\b.(+ a b)}");
  assert_snapshot!(roundtrip("{#1 : *}"), @"{#1 : *}");
  assert_snapshot!(roundtrip("(=== #42 #7)"), @"(=== #42 #7)");
  assert_snapshot!(roundtrip("(seq #1 #2)"), @"(seq #1 #2)");
  assert_snapshot!(roundtrip("(! #0)"), @"(! #0)");
  assert_snapshot!(roundtrip("('a' 'b')"), @"(#97 #98)");
}

#[test]
fn application_chains_fold_left() {
  assert_snapshot!(read_term("(f a b c)").unwrap().show(), @"(((f a) b) c)");
}

#[test]
fn numbers_read_in_hex_and_binary() {
  assert_eq!(read_term("#0x2A").unwrap().show(), "#42");
  assert_eq!(read_term("#0b101").unwrap().show(), "#5");
}

#[test]
fn books_parse_in_source_order() {
  let book = read_book("@id = \\x.x\n@main = (@id #1)\n").unwrap();
  assert_eq!(book.defs.len(), 2);
  assert_eq!(book.defs[0].0, "id");
  assert_eq!(book.show(), "@id = \\x.x\n@main = (@id #1)\n");
}

#[test]
fn malformed_input_is_rejected() {
  assert!(read_term("(+ #1").is_err());
  assert!(read_term("!&0{a}=#1; a").is_err());
  assert!(read_term("#notanumber").is_err());
}

#[test]
fn auto_dup_threads_projections_linearly() {
  let term = read_term("\\x.(+ x (+ x x))").unwrap();
  assert_snapshot!(
    auto_dup(&term).show(),
    @"\\x.!&8388608{x$0,x$t0}=x; !&8388609{x$1,x$2}=x$t0; (+ x$0 (+ x$1 x$2))"
  );
}

#[test]
fn auto_dup_respects_shadowing() {
  let term = read_term("\\x.(x \\x.x)").unwrap();
  assert_eq!(auto_dup(&term), term);
}

#[test]
fn safety_grades_cloning_shapes() {
  assert_eq!(analyze_safety(&read_term("\\x.(+ x #1)").unwrap()), Safety::Safe);
  assert_eq!(analyze_safety(&read_term("!&0{a,b}=#1; (+ a b)").unwrap()), Safety::Warn);
  assert_eq!(analyze_safety(&read_term("&2{#1,#2}").unwrap()), Safety::Warn);
  assert_eq!(
    analyze_safety(&read_term("!&0{f,g}=\\x.!&1{a,b}=x; (a b); (f g)").unwrap()),
    Safety::Unsafe
  );
}

#[test]
fn unbound_names_fail_to_build() {
  use icvm::language::build::build_def;
  use std::collections::HashMap;
  let term = read_term("(+ x #1)").unwrap();
  let err = build_def("main", &term, &HashMap::new()).unwrap_err();
  assert!(err.contains("unbound variable"));
  let term = read_term("(@missing #1)").unwrap();
  let err = build_def("main", &term, &HashMap::new()).unwrap_err();
  assert!(err.contains("unbound reference"));
}

#[test]
fn duplicate_definitions_fail_to_build() {
  use icvm::language::build::build_book;
  let book = read_book("@f = #1\n@f = #2\n").unwrap();
  assert!(build_book(&book).unwrap_err().contains("duplicate definition"));
}
