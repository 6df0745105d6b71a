mod bridge;
mod replay;

pub use bridge::*;
pub use replay::*;
