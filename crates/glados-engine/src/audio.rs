use std::io::Cursor;

use flacenc::{component::BitRepr, error::Verify};
use mp3lame_encoder::{Bitrate, BuildError, FlushNoGap, MonoPcm, Quality};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Output sample rate of the voice model
pub const SAMPLE_RATE: u32 = 22_050;

/// Constant bitrate of MP3 output
const MP3_BITRATE: Bitrate = Bitrate::Kbps64;

/// Factor mapping the model's normalized floats onto 16-bit samples
pub const QUANTIZATION_SCALE: f32 = 32_768.0;

/// Container formats the store can encode
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudioFormat {
    /// RIFF WAVE, 16-bit mono PCM
    Wav,
    /// Headerless little-endian 16-bit mono PCM
    Pcm,
    /// MPEG-1/2 Layer III, constant bitrate
    Mp3,
    /// Lossless FLAC, 16-bit mono
    Flac,
}

impl AudioFormat {
    /// Parse a user-supplied format name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns an input error naming the supported formats
    pub fn parse(name: &str) -> Result<Self> {
        use strum::VariantNames;

        name.trim().parse().map_err(|_| {
            EngineError::Input(format!(
                "unsupported audio format '{name}', expected one of: {}",
                Self::VARIANTS.join(", ")
            ))
        })
    }

    /// File extension, lower-case, without the dot
    pub fn extension(self) -> &'static str {
        self.into()
    }

    /// Registered MIME type
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/x-wav",
            Self::Pcm => "audio/L16",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
        }
    }

    /// Encode 16-bit mono samples into this container
    ///
    /// # Errors
    ///
    /// Returns a storage error if the encoder rejects the input
    pub fn encode(self, samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
        match self {
            Self::Wav => encode_wav(samples, sample_rate),
            Self::Pcm => Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect()),
            Self::Mp3 => encode_mp3(samples, sample_rate),
            Self::Flac => encode_flac(samples, sample_rate),
        }
    }
}

fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer =
        hound::WavWriter::new(&mut cursor, spec).map_err(|e| EngineError::storage("failed to start wav", e))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| EngineError::storage("failed to write wav sample", e))?;
    }

    writer
        .finalize()
        .map_err(|e| EngineError::storage("failed to finalize wav", e))?;

    Ok(cursor.into_inner())
}

fn encode_mp3(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let mut builder =
        mp3lame_encoder::Builder::new().ok_or_else(|| EngineError::Storage("failed to allocate mp3 encoder".into()))?;

    configure_mp3(&mut builder, sample_rate).map_err(|e| EngineError::storage("failed to configure mp3 encoder", e))?;

    let mut encoder = builder
        .build()
        .map_err(|e| EngineError::storage("failed to start mp3 encoder", e))?;

    let mut out = Vec::new();
    encoder
        .encode_to_vec(MonoPcm(samples), &mut out)
        .map_err(|e| EngineError::storage("failed to encode mp3", e))?;
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| EngineError::storage("failed to flush mp3", e))?;

    Ok(out)
}

fn configure_mp3(builder: &mut mp3lame_encoder::Builder, sample_rate: u32) -> std::result::Result<(), BuildError> {
    builder.set_num_channels(1)?;
    builder.set_sample_rate(sample_rate)?;
    builder.set_brate(MP3_BITRATE)?;
    builder.set_quality(Quality::Good)
}

fn encode_flac(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EngineError::storage("invalid flac encoder config", e))?;

    let widened: Vec<i32> = samples.iter().copied().map(i32::from).collect();
    let rate = usize::try_from(sample_rate).map_err(|e| EngineError::storage("sample rate out of range", e))?;
    let source = flacenc::source::MemSource::from_samples(&widened, 1, 16, rate);

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EngineError::storage("failed to encode flac", format!("{e:?}")))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|_| EngineError::Storage("failed to write flac stream".into()))?;

    Ok(sink.as_slice().to_vec())
}

/// Scale by 32768 and narrow to `i16`
///
/// Out-of-range samples are clipped to the `i16` range rather than wrapped.
#[allow(clippy::cast_possible_truncation)]
pub fn quantize(waveform: &[f32]) -> Vec<i16> {
    let (min, max) = (f32::from(i16::MIN), f32::from(i16::MAX));

    waveform
        .iter()
        .map(|&sample| (sample * QUANTIZATION_SCALE).clamp(min, max) as i16)
        .collect()
}
