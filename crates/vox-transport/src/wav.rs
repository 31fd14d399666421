/// Prepends a 44-byte little-endian PCM WAV header to `audio`, byte-exact
/// with the `RIFF`/`WAVE`/`fmt `/`data` layout (spec §4.9).
pub fn wrap_wav(audio: &[u8], sample_rate: u32, channels: u16, sample_width: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(44 + audio.len());

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36u32 + audio.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // subchunk1 size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate * channels as u32 * sample_width as u32;
    out.extend_from_slice(&byte_rate.to_le_bytes());
    let block_align = channels * sample_width;
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(sample_width * 8).to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&(audio.len() as u32).to_le_bytes());
    out.extend_from_slice(audio);

    out
}
