//! Wire Protocol
//! 
//! JSON envelopes exchanged with the transport and the frame codec around them.

pub mod codec;
pub mod constants;
pub mod types;

pub use codec::{decode_frame, encode_frame};
pub use constants::*;
pub use types::Envelope;
