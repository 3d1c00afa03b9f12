//! irt-file: IR / DI file I/O
//!
//! Import goes through hound for WAV and symphonia for everything else
//! (FLAC, AIFF, MP3, OGG Vorbis, AAC/ALAC in M4A). Every file is downmixed to mono and
//! peak-normalized before it becomes an asset.
//!
//! Export writes a normalized copy back out as WAV, keeping the source bit depth when WAV can
//! carry it.

mod asset;
mod decoder;
mod error;
mod export;

pub use asset::*;
pub use decoder::*;
pub use error::*;
pub use export::*;
