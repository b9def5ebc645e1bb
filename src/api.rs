// The embedding API. A `Runtime` owns a `State` plus the label counter the
// use-count pass draws from, and strings everything together: parse,
// auto-dup, build, instantiate, normalize, read back.

use crate::language::autodup::auto_dup_term;
use crate::language::build::{build_def, build_book};
use crate::language::readback;
use crate::language::syntax::{self, Book, Term};
use crate::runtime::base::memory::AUTO_LABEL;
use crate::runtime::base::program::instantiate;
use crate::runtime::base::state::{Config, State, Stats};

pub struct Runtime {
  pub state: State,
  labels: u64,
  evals: usize,
}

impl Runtime {
  /// Creates a new, empty runtime.
  pub fn new(cfg: Config) -> Self {
    Runtime { state: State::new(cfg), labels: AUTO_LABEL, evals: 0 }
  }

  /// Creates a runtime from source code, with the default configuration.
  pub fn from_code(code: &str) -> Result<Self, String> {
    Runtime::from_code_with(Config::default(), code)
  }

  /// Creates a runtime from source code and an explicit configuration.
  pub fn from_code_with(cfg: Config, code: &str) -> Result<Self, String> {
    let mut runtime = Runtime::new(cfg);
    runtime.define(code)?;
    Ok(runtime)
  }

  /// Installs a book of definitions, replacing any previous one.
  pub fn define(&mut self, code: &str) -> Result<(), String> {
    let book = syntax::read_book(code)?;
    let book = Book {
      defs: book
        .defs
        .iter()
        .map(|(name, term)| (name.clone(), auto_dup_term(term, &mut self.labels)))
        .collect(),
    };
    let prog = build_book(&book)?;
    self.state.install(prog);
    Ok(())
  }

  // Builds an expression against the installed definitions and allocates it,
  // returning the root location.
  fn alloc_expr(&mut self, expr: &str) -> Result<u64, String> {
    let term = syntax::read_term(expr)?;
    self.alloc_term(&term)
  }

  /// Allocates a term, returning its root location.
  pub fn alloc_term(&mut self, term: &Term) -> Result<u64, String> {
    let term = auto_dup_term(term, &mut self.labels);
    let name = format!("eval${}", self.evals);
    self.evals += 1;
    let fids = self.state.prog.name_to_fid.clone();
    let def = build_def(&name, &term, &fids)?;
    let fid = self.state.prog.define(def);
    let root = instantiate(&self.state, fid).map_err(|err| err.to_string())?;
    let host = self.state.heap.alloc(1).map_err(|err| err.to_string())?;
    self.state.heap.link(host, root);
    Ok(host)
  }

  /// Evaluates an expression to full normal form, as code.
  pub fn eval(&mut self, expr: &str) -> Result<String, String> {
    let host = self.alloc_expr(expr)?;
    self.state.normalize(host).map_err(|err| err.to_string())?;
    Ok(readback::as_code(&self.state, self.state.heap.load(host)))
  }

  /// Enumerates up to `limit` superposed results of an expression.
  pub fn collapse(&mut self, expr: &str, limit: usize) -> Result<Vec<String>, String> {
    let host = self.alloc_expr(expr)?;
    let root = self.state.heap.load(host);
    let mut results = Vec::new();
    for item in self.state.collapse(root).take(limit) {
      let term = item.map_err(|err| err.to_string())?;
      results.push(readback::as_code(&self.state, term));
    }
    Ok(results)
  }

  /// Evaluates an expression to weak head normal form only.
  pub fn reduce(&mut self, expr: &str) -> Result<String, String> {
    let host = self.alloc_expr(expr)?;
    let term = self.state.reduce(self.state.heap.load(host)).map_err(|err| err.to_string())?;
    self.state.heap.link(host, term);
    Ok(readback::as_code(&self.state, term))
  }

  pub fn stats(&self) -> Stats {
    self.state.stats()
  }

  /// Rewinds the heap. Installed definitions survive; evaluated terms die.
  pub fn reset(&mut self) {
    self.state.reset_heap();
  }
}

/// One-shot convenience: load `code`, evaluate `expr`, return the normal
/// form and the run's stats.
pub fn eval_code(code: &str, expr: &str, cfg: Config) -> Result<(String, Stats), String> {
  let mut runtime = Runtime::from_code_with(cfg, code)?;
  let norm = runtime.eval(expr)?;
  Ok((norm, runtime.stats()))
}
