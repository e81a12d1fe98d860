//! Compact text encoding of a game for persistence.

pub mod codec;

pub use codec::{CodecError, EncodedSession, SessionRecord};
