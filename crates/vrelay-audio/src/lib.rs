pub mod constants;
pub mod mock;
pub mod normalize;
pub mod ring_buffer;
pub mod source;
pub mod types;

pub use constants::*;
pub use mock::MockAudioSource;
pub use normalize::*;
pub use ring_buffer::RingBuffer;
pub use source::AudioSource;
pub use types::{AudioFrame, RawAudioFrame};
