use crate::runtime::rule::op2;
use highlight_error::highlight_error;
use std::fmt::Display;
use TSPL::{new_parser, Parser};

// Types
// -----

// The surface language. Variables are named; the builder resolves them to
// binder slots when laying out the heap. Type-level terms (Typ, All, Sig,
// Slf, Bri) have no surface syntax and are only produced by readback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
  Var { nam: String },
  Ref { nam: String },
  Era,
  Num { val: u32 },
  Lam { nam: String, bod: Box<Term> },
  App { fun: Box<Term>, arg: Box<Term> },
  Sup { lab: u64, fst: Box<Term>, snd: Box<Term> },
  Dup { lab: u64, fst: String, snd: String, val: Box<Term>, bod: Box<Term> },
  Ctr { cid: u64, fds: Vec<Term> },
  Mat { cnd: Box<Term>, brs: Vec<Term> },
  Swi { cnd: Box<Term>, zer: Box<Term>, suc: Box<Term> },
  Op1 { opr: u64, val: Box<Term> },
  Op2 { opr: u64, fst: Box<Term>, snd: Box<Term> },
  Use { val: Box<Term>, bod: Box<Term> },
  Eql { fst: Box<Term>, snd: Box<Term> },
  Ann { val: Box<Term>, typ: Box<Term> },
  Typ,
  All { inp: Box<Term>, out: Box<Term> },
  Sig { fst: Box<Term>, snd: Box<Term> },
  Slf { bod: Box<Term> },
  Bri { bod: Box<Term> },
}

// A book of top-level definitions, in source order.
#[derive(Clone, Debug, Default)]
pub struct Book {
  pub defs: Vec<(String, Term)>,
}

// Parser
// ------

new_parser!(CoreParser);

impl<'i> CoreParser<'i> {
  pub fn parse_term(&mut self) -> Result<Term, String> {
    self.skip_trivia();
    match self.peek_one() {
      Some('\\') | Some('λ') => {
        self.advance_one();
        let nam = self.parse_name()?;
        self.consume(".")?;
        let bod = Box::new(self.parse_term()?);
        Ok(Term::Lam { nam, bod })
      }
      Some('(') => {
        self.advance_one();
        self.parse_paren()
      }
      Some('&') => {
        self.advance_one();
        let lab = self.parse_label()?;
        self.consume("{")?;
        let fst = Box::new(self.parse_term()?);
        self.consume(",")?;
        let snd = Box::new(self.parse_term()?);
        self.consume("}")?;
        Ok(Term::Sup { lab, fst, snd })
      }
      Some('!') => {
        self.advance_one();
        self.consume("&")?;
        let lab = self.parse_label()?;
        self.consume("{")?;
        let fst = self.parse_name()?;
        self.consume(",")?;
        let snd = self.parse_name()?;
        self.consume("}")?;
        self.consume("=")?;
        let val = Box::new(self.parse_term()?);
        self.consume(";")?;
        let bod = Box::new(self.parse_term()?);
        Ok(Term::Dup { lab, fst, snd, val, bod })
      }
      Some('#') => {
        self.advance_one();
        let val = self.parse_u32()?;
        Ok(Term::Num { val })
      }
      Some('\'') => {
        self.advance_one();
        let chr = match self.advance_one() {
          Some('\\') => match self.advance_one() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            _ => self.expected("escape character")?,
          },
          Some(chr) => chr,
          None => self.expected("character")?,
        };
        self.consume("'")?;
        Ok(Term::Num { val: chr as u32 })
      }
      Some('*') => {
        self.advance_one();
        Ok(Term::Era)
      }
      Some('@') => {
        self.advance_one();
        let nam = self.parse_name()?;
        Ok(Term::Ref { nam })
      }
      Some('$') => {
        self.advance_one();
        let cid = self.parse_u32()? as u64;
        self.consume("{")?;
        let mut fds = Vec::new();
        loop {
          self.skip_trivia();
          if self.peek_one() == Some('}') {
            break;
          }
          fds.push(self.parse_term()?);
        }
        self.consume("}")?;
        Ok(Term::Ctr { cid, fds })
      }
      Some('~') => {
        self.advance_one();
        let cnd = Box::new(self.parse_term()?);
        self.consume("{")?;
        let mut brs = Vec::new();
        loop {
          self.skip_trivia();
          if self.peek_one() == Some('}') {
            break;
          }
          brs.push(self.parse_term()?);
        }
        self.consume("}")?;
        Ok(Term::Mat { cnd, brs })
      }
      Some('{') => {
        self.advance_one();
        let val = Box::new(self.parse_term()?);
        self.consume(":")?;
        let typ = Box::new(self.parse_term()?);
        self.consume("}")?;
        Ok(Term::Ann { val, typ })
      }
      _ => {
        let nam = self.parse_name()?;
        Ok(Term::Var { nam })
      }
    }
  }

  // The interior of a parenthesized form: a switch, a strict sequencing, an
  // equality, a primitive, or an application chain.
  fn parse_paren(&mut self) -> Result<Term, String> {
    self.skip_trivia();
    if self.peek_one() == Some('?') {
      self.advance_one();
      let cnd = Box::new(self.parse_term()?);
      let zer = Box::new(self.parse_term()?);
      let suc = Box::new(self.parse_term()?);
      self.consume(")")?;
      return Ok(Term::Swi { cnd, zer, suc });
    }
    if self.peek_many(4).map_or(false, |s| s.starts_with("seq") && !is_name_char(s.chars().nth(3))) {
      self.advance_many(3);
      let val = Box::new(self.parse_term()?);
      let bod = Box::new(self.parse_term()?);
      self.consume(")")?;
      return Ok(Term::Use { val, bod });
    }
    if self.try_consume("===") {
      let fst = Box::new(self.parse_term()?);
      let snd = Box::new(self.parse_term()?);
      self.consume(")")?;
      return Ok(Term::Eql { fst, snd });
    }
    if let Some(opr) = self.try_parse_oper() {
      if opr == op2::NOT {
        let val = Box::new(self.parse_term()?);
        self.consume(")")?;
        return Ok(Term::Op1 { opr, val });
      }
      let fst = Box::new(self.parse_term()?);
      let snd = Box::new(self.parse_term()?);
      self.consume(")")?;
      return Ok(Term::Op2 { opr, fst, snd });
    }
    let mut fun = self.parse_term()?;
    loop {
      self.skip_trivia();
      if self.peek_one() == Some(')') {
        break;
      }
      let arg = Box::new(self.parse_term()?);
      fun = Term::App { fun: Box::new(fun), arg };
    }
    self.consume(")")?;
    Ok(fun)
  }

  // Operator symbols, longest first. `&` and `*` begin superpositions and
  // erasers elsewhere; right after `(` they are operators.
  fn try_parse_oper(&mut self) -> Option<u64> {
    let ops: &[(&str, u64)] = &[
      ("<<", op2::LSH),
      (">>", op2::RSH),
      ("==", op2::EQ),
      ("!=", op2::NE),
      ("<=", op2::LE),
      (">=", op2::GE),
      ("+", op2::ADD),
      ("-", op2::SUB),
      ("*", op2::MUL),
      ("/", op2::DIV),
      ("%", op2::MOD),
      ("&", op2::AND),
      ("|", op2::OR),
      ("^", op2::XOR),
      ("<", op2::LT),
      (">", op2::GT),
      ("!", op2::NOT),
    ];
    for (sym, opr) in ops {
      if self.peek_many(sym.len()) == Some(*sym) {
        // `!&` opens a duplication and `&L{`/`&{` a superposition literal,
        // not an operator.
        if *sym == "!" && self.peek_many(2) == Some("!&") {
          return None;
        }
        if *sym == "&" {
          if let Some(next) = self.peek_many(2).and_then(|s| s.chars().nth(1)) {
            if next.is_ascii_digit() || next == '{' {
              return None;
            }
          }
        }
        self.advance_many(sym.len());
        return Some(*opr);
      }
    }
    None
  }

  fn parse_label(&mut self) -> Result<u64, String> {
    self.skip_trivia();
    if self.peek_one() == Some('{') {
      return Ok(0);
    }
    Ok(self.parse_u32()? as u64)
  }

  fn parse_u32(&mut self) -> Result<u32, String> {
    self.skip_trivia();
    let start = self.index;
    let num = self.take_while(|x| x.is_alphanumeric());
    let end = self.index;
    let display_err =
      |err: &dyn Display| format!("invalid number literal: {err}\n{}", highlight_error(start, end, self.input));
    if let Some(rest) = num.strip_prefix("0x") {
      u32::from_str_radix(rest, 16).map_err(|err| display_err(&err))
    } else if let Some(rest) = num.strip_prefix("0b") {
      u32::from_str_radix(rest, 2).map_err(|err| display_err(&err))
    } else {
      num.parse::<u32>().map_err(|err| display_err(&err))
    }
  }

  fn try_consume(&mut self, str: &str) -> bool {
    let matches = self.peek_many(str.len()) == Some(str);
    if matches {
      self.advance_many(str.len());
    }
    matches
  }

  pub fn parse_book(&mut self) -> Result<Book, String> {
    let mut defs = Vec::new();
    loop {
      self.skip_trivia();
      if self.is_eof() {
        break;
      }
      self.consume("@")?;
      let name = self.parse_name()?;
      self.consume("=")?;
      let term = self.parse_term()?;
      defs.push((name, term));
    }
    Ok(Book { defs })
  }
}

fn is_name_char(chr: Option<char>) -> bool {
  matches!(chr, Some(c) if c.is_alphanumeric() || c == '_')
}

pub fn read_term(code: &str) -> Result<Term, String> {
  let mut parser = CoreParser::new(code);
  let term = parser.parse_term()?;
  parser.skip_trivia();
  if !parser.is_eof() {
    return parser.expected("end of input")?;
  }
  Ok(term)
}

pub fn read_book(code: &str) -> Result<Book, String> {
  CoreParser::new(code).parse_book()
}

// Stringifier
// -----------

fn oper_sym(opr: u64) -> &'static str {
  match opr {
    op2::ADD => "+",
    op2::SUB => "-",
    op2::MUL => "*",
    op2::DIV => "/",
    op2::MOD => "%",
    op2::AND => "&",
    op2::OR => "|",
    op2::XOR => "^",
    op2::LSH => "<<",
    op2::RSH => ">>",
    op2::NOT => "!",
    op2::EQ => "==",
    op2::NE => "!=",
    op2::LT => "<",
    op2::LE => "<=",
    op2::GT => ">",
    op2::GE => ">=",
    _ => "?",
  }
}

impl Term {
  pub fn show(&self) -> String {
    match self {
      Term::Var { nam } => nam.clone(),
      Term::Ref { nam } => format!("@{}", nam),
      Term::Era => "*".to_string(),
      Term::Num { val } => format!("#{}", val),
      Term::Lam { nam, bod } => format!("\\{}.{}", nam, bod.show()),
      Term::App { fun, arg } => format!("({} {})", fun.show(), arg.show()),
      Term::Sup { lab, fst, snd } => format!("&{}{{{},{}}}", lab, fst.show(), snd.show()),
      Term::Dup { lab, fst, snd, val, bod } => {
        format!("!&{}{{{},{}}}={}; {}", lab, fst, snd, val.show(), bod.show())
      }
      Term::Ctr { cid, fds } => {
        let fds: Vec<String> = fds.iter().map(|x| x.show()).collect();
        format!("${}{{{}}}", cid, fds.join(" "))
      }
      Term::Mat { cnd, brs } => {
        let brs: Vec<String> = brs.iter().map(|x| x.show()).collect();
        format!("~{}{{{}}}", cnd.show(), brs.join(" "))
      }
      Term::Swi { cnd, zer, suc } => {
        format!("(?{} {} {})", cnd.show(), zer.show(), suc.show())
      }
      Term::Op1 { opr, val } => format!("({} {})", oper_sym(*opr), val.show()),
      Term::Op2 { opr, fst, snd } => {
        format!("({} {} {})", oper_sym(*opr), fst.show(), snd.show())
      }
      Term::Use { val, bod } => format!("(seq {} {})", val.show(), bod.show()),
      Term::Eql { fst, snd } => format!("(=== {} {})", fst.show(), snd.show()),
      Term::Ann { val, typ } => format!("{{{} : {}}}", val.show(), typ.show()),
      Term::Typ => "Type".to_string(),
      Term::All { inp, out } => format!("(all {} {})", inp.show(), out.show()),
      Term::Sig { fst, snd } => format!("(sig {} {})", fst.show(), snd.show()),
      Term::Slf { bod } => format!("(slf {})", bod.show()),
      Term::Bri { bod } => format!("(bri {})", bod.show()),
    }
  }
}

impl Book {
  pub fn show(&self) -> String {
    let mut out = String::new();
    for (name, term) in &self.defs {
      out.push_str(&format!("@{} = {}\n", name, term.show()));
    }
    out
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.show())
  }
}
