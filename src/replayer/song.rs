//! Song orchestrator
//!
//! Owns one [`Channel`] and one [`ChannelPlayer`] per voice, schedules ticks
//! on a fixed grid, mixes the rendered voices and emits fixed-size unsigned
//! 8-bit chunks to a [`PcmSink`].
//!
//! Ticks run one buffer ahead of the audio clock so every chunk is rendered
//! from events that are already queued. When the song ends, the last chunk is
//! cut at the end time and the song rewinds to its start.

use std::sync::Arc;

use super::channel::Channel;
use super::config::{EndPolicy, PlayerConfig};
use crate::module::{Module, SongInfo};
use crate::synth::ChannelPlayer;
use crate::Result;

/// Playback state of a [`Song`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Player is stopped (at beginning or end).
    #[default]
    Stopped,
    /// Player is actively playing.
    Playing,
    /// Player is paused (can resume).
    Paused,
}

/// Receiver of rendered PCM chunks
///
/// Chunks are unsigned 8-bit mono samples centred on 128. The last chunk of
/// a song pass is flagged with `end_of_stream` and may be shorter.
pub trait PcmSink {
    /// Accept one chunk.
    fn sample_data(&mut self, pcm: &[u8], end_of_stream: bool);
}

impl<F: FnMut(&[u8], bool)> PcmSink for F {
    fn sample_data(&mut self, pcm: &[u8], end_of_stream: bool) {
        self(pcm, end_of_stream)
    }
}

/// Replayer for one song of a module
#[derive(Debug, Clone)]
pub struct Song {
    module: Arc<Module>,
    info: SongInfo,
    index: usize,
    config: PlayerConfig,
    channels: Vec<Channel>,
    players: Vec<ChannelPlayer>,

    // Render buffers, allocated once
    voice_pcm: Vec<Vec<i8>>,
    voice_active: Vec<Vec<bool>>,
    pcm: Vec<u8>,

    state: PlaybackState,
    total_time: f64,
    next_tick_time: f64,
    last_sample_time: f64,
    end_of_stream: bool,
    end_time: f64,
}

impl Song {
    /// Create a replayer for song `index` of `module`
    ///
    /// The first buffer interval is ticked ahead right away.
    pub fn new(module: Arc<Module>, index: usize, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        let info = module.song(index)?;
        let voices = module.voice_count();
        let buffer_size = config.buffer_size;

        let channels = (0..voices)
            .map(|voice| Channel::new(voice, Arc::clone(&module), info))
            .collect();
        let players = (0..voices)
            .map(|_| ChannelPlayer::new(config.sample_rate, config.tone_clock_hz, config.waveform))
            .collect();

        let mut song = Self {
            module,
            info,
            index,
            channels,
            players,
            voice_pcm: vec![vec![0; buffer_size]; voices],
            voice_active: vec![vec![false; buffer_size]; voices],
            pcm: vec![128; buffer_size],
            config,
            state: PlaybackState::Stopped,
            total_time: 0.0,
            next_tick_time: 0.0,
            last_sample_time: 0.0,
            end_of_stream: false,
            end_time: 0.0,
        };
        song.prebuffer();

        tracing::debug!(
            song = index,
            voices,
            start = info.start_division,
            end = info.end_division,
            speed = info.initial_speed,
            "song ready"
        );
        Ok(song)
    }

    /// Start playback from the beginning
    pub fn play(&mut self) {
        self.stop(true);
        self.state = PlaybackState::Playing;
    }

    /// Stop playback; with `reset` the song rewinds to its start
    pub fn stop(&mut self, reset: bool) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.state = PlaybackState::Stopped;
        if reset {
            self.reset();
        }
    }

    /// Rewind every voice and clock to the freshly constructed state
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        for player in &mut self.players {
            player.reset();
        }
        self.pcm.fill(128);
        self.total_time = 0.0;
        self.next_tick_time = 0.0;
        self.last_sample_time = 0.0;
        self.end_of_stream = false;
        self.end_time = 0.0;
        self.prebuffer();
    }

    /// Whether playback is paused
    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// Pause or resume; ignored while stopped
    pub fn set_paused(&mut self, paused: bool) {
        self.state = match (self.state, paused) {
            (PlaybackState::Playing, true) => PlaybackState::Paused,
            (PlaybackState::Paused, false) => PlaybackState::Playing,
            (state, _) => state,
        };
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Advance the song by `elapsed_ms` and hand every completed chunk to
    /// `sink`. Does nothing unless playing.
    pub fn update<S: PcmSink + ?Sized>(&mut self, elapsed_ms: f64, sink: &mut S) {
        if self.state != PlaybackState::Playing {
            return;
        }

        self.total_time += elapsed_ms.max(0.0);
        self.process_ticks();

        let buffer_time = self.config.buffer_time_ms();
        while self.total_time - self.last_sample_time >= buffer_time {
            if self.end_of_stream && self.end_time <= self.last_sample_time + buffer_time {
                let remaining = (self.end_time - self.last_sample_time).max(0.0);
                let len = ((remaining * self.config.sample_rate as f64 / 1000.0) as usize)
                    .min(self.pcm.len());
                self.render_chunk();
                sink.sample_data(&self.pcm[..len], true);

                tracing::debug!(song = self.index, "end of song, looping");
                self.reset();
                return;
            }

            self.render_chunk();
            sink.sample_data(&self.pcm, false);
            self.last_sample_time += buffer_time;
            self.process_ticks();
        }
    }

    fn prebuffer(&mut self) {
        self.process_ticks();
    }

    /// Run every tick that starts less than one buffer ahead of the clock.
    fn process_ticks(&mut self) {
        let horizon = self.total_time + self.config.buffer_time_ms();
        let tick_time = self.config.tick_time_ms;

        while !self.end_of_stream && self.next_tick_time < horizon {
            let time = self.next_tick_time;
            for (channel, player) in self.channels.iter_mut().zip(self.players.iter_mut()) {
                channel.tick(time, player);
            }

            let finished = match self.config.end_policy {
                EndPolicy::AnyVoice => self.channels.iter().any(Channel::is_finished),
                EndPolicy::AllVoices => self.channels.iter().all(Channel::is_finished),
            };
            if finished {
                self.end_of_stream = true;
                self.end_time = time + tick_time;
            }
            self.next_tick_time += tick_time;
        }
    }

    /// Render and mix the chunk starting at `last_sample_time` into `pcm`.
    fn render_chunk(&mut self) {
        let start = self.last_sample_time;
        for ((player, out), active) in self
            .players
            .iter_mut()
            .zip(self.voice_pcm.iter_mut())
            .zip(self.voice_active.iter_mut())
        {
            player.render(out, active, start);
        }

        for (i, sample) in self.pcm.iter_mut().enumerate() {
            let mut sum = 0i32;
            let mut count = 0i32;
            for (out, active) in self.voice_pcm.iter().zip(&self.voice_active) {
                if active[i] {
                    sum += out[i] as i32;
                    count += 1;
                }
            }
            *sample = if count == 0 {
                128
            } else {
                (128 + sum / count) as u8
            };
        }
    }

    /// Channel runtime of voice `index`
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// Event queues of voice `index`
    pub fn channel_player(&self, index: usize) -> Option<&ChannelPlayer> {
        self.players.get(index)
    }

    /// Number of voices
    pub fn voice_count(&self) -> usize {
        self.channels.len()
    }

    /// Division range and speed of the song
    pub fn info(&self) -> SongInfo {
        self.info
    }

    /// Song index inside the module
    pub fn index(&self) -> usize {
        self.index
    }

    /// Shared module tables
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Playback parameters
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// `true` once the end of the song has been scheduled
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Song time already handed to the sink, in milliseconds
    pub fn position_ms(&self) -> f64 {
        self.last_sample_time
    }
}
