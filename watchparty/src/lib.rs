pub use watchparty_core::model::PeerId;

pub mod model {
    pub use watchparty_core::model::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use watchparty_session::*;
}
