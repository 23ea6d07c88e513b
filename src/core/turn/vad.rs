//! Amplitude-based voice activity detection over PCM16 chunks.

/// Peak absolute sample value of a little-endian PCM16 chunk.
///
/// A trailing odd byte is ignored. Computed in `i32` so `i16::MIN` maps to
/// 32768 instead of overflowing.
pub fn peak_amplitude(chunk: &[u8]) -> u32 {
    chunk
        .chunks_exact(2)
        .map(|pair| i32::from(i16::from_le_bytes([pair[0], pair[1]])).unsigned_abs())
        .max()
        .unwrap_or(0)
}

/// Whether the chunk's peak amplitude exceeds `threshold`.
#[inline]
pub fn is_voiced(chunk: &[u8], threshold: u32) -> bool {
    peak_amplitude(chunk) > threshold
}
