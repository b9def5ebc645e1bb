pub mod frames;
pub mod redex_queue;

pub use frames::*;
pub use redex_queue::*;
