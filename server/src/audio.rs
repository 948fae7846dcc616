//! WAV output encoding.

use std::path::Path;

use crate::tts::Waveform;

/// Write a waveform to `path` as mono 16-bit PCM WAV.
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &waveform.samples {
        writer.write_sample(f32_to_i16(sample))?;
    }
    writer.finalize()
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
