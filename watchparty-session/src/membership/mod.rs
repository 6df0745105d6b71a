mod membership;
mod phase;
mod roster;

pub use membership::*;
pub use phase::*;
pub use roster::*;
