//! Symphonia helpers for decoding fetched chunk bytes.

use std::io::Cursor;

use log::warn;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::buffer::ChunkBuffer;
use crate::error::FetchError;

/// Decode an in-memory encoded chunk into interleaved `f32` samples.
///
/// # Arguments
///
/// * `bytes` - Encoded audio (any container/codec symphonia was built with).
/// * `extension` - Optional file extension used as a probe hint.
pub fn decode_chunk(bytes: Vec<u8>, extension: Option<&str>) -> Result<ChunkBuffer, FetchError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;

    // First audio track with a decodeable codec.
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FetchError::Unsupported("no supported audio tracks".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|channels| channels.count() as u16)
        .unwrap_or(0);

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(Error::DecodeError(err)) => {
                warn!("skipping undecodable packet: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(FetchError::Decode(
            "stream did not report a sample rate or channel layout".to_string(),
        ));
    }

    Ok(ChunkBuffer::new(sample_rate, channels, samples))
}

#[cfg(test)]
mod tests {
    use super::decode_chunk;
    use std::io::Cursor;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for frame in 0..frames {
                for _ in 0..channels {
                    let value = if frame % 2 == 0 { 8_000 } else { -8_000 };
                    writer.write_sample(value as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_wav_into_interleaved_frames() {
        let buffer = decode_chunk(wav_bytes(8_000, 2, 4_000), Some("wav")).unwrap();
        assert_eq!(buffer.sample_rate, 8_000);
        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.frames(), 4_000);
        assert!((buffer.duration() - 0.5).abs() < 1e-9);
        assert!(buffer.sample(0, 0) > 0.2);
        assert!(buffer.sample(1, 1) < -0.2);
    }

    #[test]
    fn garbage_bytes_are_a_fetch_error() {
        let result = decode_chunk(vec![0x42; 64], None);
        assert!(result.is_err());
    }
}
