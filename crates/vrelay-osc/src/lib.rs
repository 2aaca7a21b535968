//! OSC 1.0 encoding, UDP transport, and the cooldown/TTL-aware send queue.

pub mod encoding;
pub mod sender;
pub mod smart_queue;

pub use encoding::{encode_chatbox_message, encode_message, encode_typing_message, OscArg};
pub use sender::{OscSender, UdpOscSender};
pub use smart_queue::{ChatboxOscClient, OSCMessage, SmartOscQueue, SmartOscQueueConfig};
