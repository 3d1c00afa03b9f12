//! irt-engine: IR tester session
//!
//! [`Session`] is the command surface a shell talks to. It owns the loaded IR/DI, the
//! equalizer and mix state, the background pipeline and the playback engine, and turns
//! everything that happened since the last call into [`SessionEvent`]s on `poll`.

mod config;
mod convolver;
mod debounce;
mod error;
mod session;

pub use config::*;
pub use convolver::*;
pub use debounce::*;
pub use error::*;
pub use session::*;
