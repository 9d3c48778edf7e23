//! Telephony media-stream messages
//!
//! The carrier sends JSON text messages tagged by `event`:
//! `connected`, `start`, `media` (base64 audio) and `stop`.

pub mod frame;
pub mod messages;

pub use frame::AudioFrame;
pub use messages::MediaFormat;
