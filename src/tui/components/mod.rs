pub mod input;
pub mod progress;

pub use input::*;
pub use progress::*;
