pub mod debug;
pub mod memory;
pub mod program;
pub mod reducer;
pub mod state;

pub use memory::*;
pub use program::*;
pub use reducer::*;
pub use state::*;
