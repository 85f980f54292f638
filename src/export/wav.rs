//! WAV file export functionality

use std::io::{Seek, Write};
use std::path::Path;

use super::{ExportConfig, ExportSummary};
use crate::replayer::Song;
use crate::Result;

/// Render `song` into an unsigned 8-bit mono WAV file
///
/// The song is restarted from its beginning. Without a fixed duration the
/// render stops at the end of the first pass.
pub fn export_to_wav<P: AsRef<Path>>(
    song: &mut Song,
    output_path: P,
    config: ExportConfig,
) -> Result<ExportSummary> {
    let path = output_path.as_ref();
    let mut writer = hound::WavWriter::create(path, wav_spec(song))?;
    let summary = render_into(song, &mut writer, config)?;
    writer.finalize()?;

    tracing::info!(
        path = %path.display(),
        samples = summary.samples,
        reached_end = summary.reached_end,
        "WAV export complete"
    );
    Ok(summary)
}

/// Same as [`export_to_wav`], writing to any seekable stream.
pub fn write_wav<W: Write + Seek>(
    song: &mut Song,
    output: W,
    config: ExportConfig,
) -> Result<ExportSummary> {
    let mut writer = hound::WavWriter::new(output, wav_spec(song))?;
    let summary = render_into(song, &mut writer, config)?;
    writer.finalize()?;
    Ok(summary)
}

fn wav_spec(song: &Song) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: song.config().sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    }
}

fn render_into<W: Write + Seek>(
    song: &mut Song,
    writer: &mut hound::WavWriter<W>,
    config: ExportConfig,
) -> Result<ExportSummary> {
    let limit = config.sample_limit(song.config().sample_rate);
    let step_ms = song.config().buffer_time_ms();
    let stop_at_end = config.duration_secs.is_none();

    song.play();

    let mut pending: Vec<u8> = Vec::with_capacity(song.config().buffer_size);
    let mut written = 0usize;
    let mut reached_end = false;

    while written < limit {
        let mut ended = false;
        song.update(step_ms, &mut |pcm: &[u8], end: bool| {
            pending.extend_from_slice(pcm);
            ended |= end;
        });
        reached_end |= ended;

        // hound takes 8-bit samples signed and stores them unsigned
        for &sample in pending.iter().take(limit - written) {
            writer.write_sample(sample.wrapping_sub(128) as i8)?;
            written += 1;
        }
        pending.clear();

        if ended && stop_at_end {
            break;
        }
    }

    song.stop(true);
    Ok(ExportSummary {
        samples: written,
        reached_end,
    })
}
