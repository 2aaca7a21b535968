/// The only two sample rates this pipeline speaks downstream of normalization.
pub const SAMPLE_RATE_8K_HZ: u32 = 8_000;
pub const SAMPLE_RATE_16K_HZ: u32 = 16_000;

pub fn is_supported_sample_rate(hz: u32) -> bool {
    matches!(hz, SAMPLE_RATE_8K_HZ | SAMPLE_RATE_16K_HZ)
}

/// Fixed chunk size the VAD gate processes, one per sample rate.
pub fn default_chunk_samples(sample_rate_hz: u32) -> Option<usize> {
    match sample_rate_hz {
        SAMPLE_RATE_16K_HZ => Some(512),
        SAMPLE_RATE_8K_HZ => Some(256),
        _ => None,
    }
}
