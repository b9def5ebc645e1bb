#![allow(dead_code)]
#![allow(non_snake_case)]
#![allow(unused_parens)]
#![allow(unused_labels)]
#![allow(clippy::identity_op)]

pub mod api;
pub mod language;
pub mod runtime;

pub use api::Runtime;
pub use language::safety::{analyze_safety, Safety};
pub use runtime::batch::{batch_op, parallel_batch_op};
pub use runtime::collapse::Collapse;
pub use runtime::parallel::parallel_sweep;
pub use runtime::{Config, RuntimeError, State, Stats, Term};

pub use runtime::{
  get_ext, get_loc, get_num, get_tag, get_val, is_sub, term_new, CELLS_PER_GB, CELLS_PER_KB,
  CELLS_PER_MB,
};
