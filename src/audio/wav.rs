//! PCM WAV buffer concatenation
//!
//! The synthesis provider returns one PCM WAV buffer per chunk, each with
//! the canonical 44-byte header (RIFF + fmt + data). Concatenation emits the
//! first buffer's header with the two size fields recomputed:
//!
//! - data size = sum of all buffers' data bytes
//! - RIFF size = data size + 36 (header size minus the 8-byte RIFF preamble)
//!
//! All buffers must agree on sample rate, channel count and bit depth.

use super::AudioError;

/// Canonical PCM WAV header size
pub const HEADER_SIZE: usize = 44;

/// Byte offset of the RIFF chunk size field
const RIFF_SIZE_OFFSET: usize = 4;

/// Byte offset of the data chunk size field
const DATA_SIZE_OFFSET: usize = 40;

/// PCM stream parameters carried in the fmt chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Number of interleaved channels
    pub channels: u16,
    /// Samples per second
    pub sample_rate: u32,
    /// Bits per sample
    pub bits_per_sample: u16,
}

/// A parsed WAV buffer: its format and the audio payload bounds
#[derive(Debug, Clone, Copy)]
pub struct ParsedWav {
    /// Stream format from the fmt chunk
    pub format: WavFormat,
    /// Length of the data chunk in bytes
    pub data_len: usize,
}

/// Parse and validate a canonical 44-byte-header PCM WAV buffer.
///
/// Rejects buffers that are too short, carry wrong magic values, use a
/// non-PCM encoding, or whose declared data size overruns the buffer. A
/// data size field smaller than the trailing bytes is accepted (trailing
/// bytes are ignored), matching what lenient decoders do.
pub fn parse_header(buffer: &[u8]) -> Result<ParsedWav, AudioError> {
    if buffer.len() < HEADER_SIZE {
        return Err(AudioError::InvalidWav(format!(
            "buffer too short: {} bytes",
            buffer.len()
        )));
    }

    if &buffer[0..4] != b"RIFF" {
        return Err(AudioError::InvalidWav("missing RIFF magic".to_string()));
    }
    if &buffer[8..12] != b"WAVE" {
        return Err(AudioError::InvalidWav("missing WAVE magic".to_string()));
    }
    if &buffer[12..16] != b"fmt " {
        return Err(AudioError::InvalidWav("missing fmt chunk".to_string()));
    }
    if &buffer[36..40] != b"data" {
        return Err(AudioError::InvalidWav("missing data chunk".to_string()));
    }

    let audio_format = u16::from_le_bytes([buffer[20], buffer[21]]);
    if audio_format != 1 {
        return Err(AudioError::InvalidWav(format!(
            "not PCM (format tag {})",
            audio_format
        )));
    }

    let channels = u16::from_le_bytes([buffer[22], buffer[23]]);
    let sample_rate = u32::from_le_bytes([buffer[24], buffer[25], buffer[26], buffer[27]]);
    let bits_per_sample = u16::from_le_bytes([buffer[34], buffer[35]]);

    let data_len = u32::from_le_bytes([
        buffer[DATA_SIZE_OFFSET],
        buffer[DATA_SIZE_OFFSET + 1],
        buffer[DATA_SIZE_OFFSET + 2],
        buffer[DATA_SIZE_OFFSET + 3],
    ]) as usize;

    if HEADER_SIZE + data_len > buffer.len() {
        return Err(AudioError::InvalidWav(format!(
            "data size field ({}) overruns buffer ({} bytes)",
            data_len,
            buffer.len()
        )));
    }

    Ok(ParsedWav {
        format: WavFormat {
            channels,
            sample_rate,
            bits_per_sample,
        },
        data_len,
    })
}

/// Concatenate PCM WAV buffers into a single WAV file.
///
/// The output carries the first buffer's header with the RIFF and data size
/// fields recomputed over the combined payload. Returns an error if the
/// input is empty, any buffer fails to parse, or the buffers disagree on
/// format.
pub fn concat(buffers: &[Vec<u8>]) -> Result<Vec<u8>, AudioError> {
    let first = buffers
        .first()
        .ok_or_else(|| AudioError::InvalidWav("no buffers to concatenate".to_string()))?;

    let reference = parse_header(first)?;

    let mut total_data = reference.data_len;
    let mut parsed = Vec::with_capacity(buffers.len());
    parsed.push(reference);

    for buffer in &buffers[1..] {
        let info = parse_header(buffer)?;
        if info.format != reference.format {
            return Err(AudioError::FormatMismatch(format!(
                "expected {:?}, got {:?}",
                reference.format, info.format
            )));
        }
        total_data += info.data_len;
        parsed.push(info);
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + total_data);
    out.extend_from_slice(&first[..HEADER_SIZE]);

    let riff_size = (total_data + 36) as u32;
    out[RIFF_SIZE_OFFSET..RIFF_SIZE_OFFSET + 4].copy_from_slice(&riff_size.to_le_bytes());
    out[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 4].copy_from_slice(&(total_data as u32).to_le_bytes());

    for (buffer, info) in buffers.iter().zip(parsed.iter()) {
        out.extend_from_slice(&buffer[HEADER_SIZE..HEADER_SIZE + info.data_len]);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a PCM WAV buffer with hound: 16-bit mono, given rate and samples
    fn make_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("writer");
            for &s in samples {
                writer.write_sample(s).expect("write sample");
            }
            writer.finalize().expect("finalize");
        }
        cursor.into_inner()
    }

    #[test]
    fn parses_hound_output() {
        let wav = make_wav(24000, &[0, 1, -1, 32767]);
        let parsed = parse_header(&wav).expect("parse");

        assert_eq!(parsed.format.channels, 1);
        assert_eq!(parsed.format.sample_rate, 24000);
        assert_eq!(parsed.format.bits_per_sample, 16);
        assert_eq!(parsed.data_len, 8); // 4 samples * 2 bytes
    }

    #[test]
    fn concat_recomputes_size_fields() {
        let a = make_wav(24000, &[1, 2, 3]);
        let b = make_wav(24000, &[4, 5]);
        let c = make_wav(24000, &[6, 7, 8, 9]);

        let merged = concat(&[a, b, c]).expect("concat");

        // 9 samples * 2 bytes of payload
        let parsed = parse_header(&merged).expect("parse merged");
        assert_eq!(parsed.data_len, 18);
        assert_eq!(merged.len(), HEADER_SIZE + 18);

        // RIFF size = data size + 36
        let riff_size = u32::from_le_bytes([merged[4], merged[5], merged[6], merged[7]]);
        assert_eq!(riff_size, 18 + 36);
    }

    #[test]
    fn concat_preserves_sample_order() {
        let a = make_wav(16000, &[10, 20]);
        let b = make_wav(16000, &[30]);

        let merged = concat(&[a, b]).expect("concat");

        let mut reader = hound::WavReader::new(Cursor::new(merged)).expect("reader");
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![10, 20, 30]);
    }

    #[test]
    fn concat_single_buffer_is_identity_payload() {
        let a = make_wav(22050, &[7, 8, 9]);
        let merged = concat(&[a.clone()]).expect("concat");

        assert_eq!(merged.len(), a.len());
        assert_eq!(&merged[HEADER_SIZE..], &a[HEADER_SIZE..]);
    }

    #[test]
    fn rejects_sample_rate_mismatch() {
        let a = make_wav(24000, &[1]);
        let b = make_wav(16000, &[2]);

        match concat(&[a, b]) {
            Err(AudioError::FormatMismatch(_)) => {}
            other => panic!("expected format mismatch, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(concat(&[]), Err(AudioError::InvalidWav(_))));
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        assert!(matches!(
            parse_header(b"not a wav"),
            Err(AudioError::InvalidWav(_))
        ));

        let mut wav = make_wav(24000, &[1, 2, 3]);
        wav.truncate(30);
        assert!(matches!(parse_header(&wav), Err(AudioError::InvalidWav(_))));

        // Corrupt the magic
        let mut wav = make_wav(24000, &[1]);
        wav[0] = b'X';
        assert!(matches!(parse_header(&wav), Err(AudioError::InvalidWav(_))));
    }

    #[test]
    fn rejects_overrunning_data_size() {
        let mut wav = make_wav(24000, &[1, 2]);
        // Claim more data than the buffer holds
        wav[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(parse_header(&wav), Err(AudioError::InvalidWav(_))));
    }
}
