//! Single-track playback with auto-advance.
//!
//! The controller owns at most one live engine instance. Engine callbacks are
//! delivered back as [`EngineEvent`]s tagged with the generation of the
//! instance that produced them, so late events from a replaced instance are
//! dropped instead of corrupting the current state.

use crate::error::{EngineError, PlaybackError};
use crate::format::{wrap_next, wrap_prev};
use crate::site::Track;

/// Something that can open one audio source at a time.
pub trait AudioEngine {
    type Instance: EngineInstance;

    /// Open `source` and start playing it. The instance reports back through
    /// events carrying `generation`. Dropping the instance releases it.
    fn open(&mut self, generation: u64, source: &str) -> Result<Self::Instance, EngineError>;
}

pub trait EngineInstance {
    fn play(&self);
    fn pause(&self);
    fn seek(&self, seconds: f64);
    fn position(&self) -> Option<f64>;
    fn duration(&self) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    Playing,
    Paused,
    Loaded { duration: f64 },
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub generation: u64,
    pub kind: EngineEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What the list renderer needs to know about playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NowPlaying {
    pub index: Option<usize>,
    pub playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub position: f64,
    pub duration: Option<f64>,
}

impl Progress {
    /// Share of the track already played. An unknown duration counts as one
    /// second so the bar stays near the start instead of dividing by zero.
    pub fn fraction(&self) -> f64 {
        let duration = self.duration.filter(|d| *d > 0.0).unwrap_or(1.0);
        self.position / duration
    }
}

struct Loaded<I> {
    index: usize,
    generation: u64,
    instance: I,
    playing: bool,
    duration: Option<f64>,
}

pub struct PlaybackController<E: AudioEngine> {
    engine: E,
    tracks: Vec<Track>,
    generation: u64,
    loaded: Option<Loaded<E::Instance>>,
}

impl<E: AudioEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            tracks: Vec::new(),
            generation: 0,
            loaded: None,
        }
    }

    /// Replace the track list. Anything playing is closed first because old
    /// indices mean nothing in the new list.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.close();
        self.tracks = tracks;
    }

    pub fn now_playing(&self) -> NowPlaying {
        match &self.loaded {
            Some(l) => NowPlaying {
                index: Some(l.index),
                playing: l.playing,
            },
            None => NowPlaying::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.loaded.is_none()
    }

    pub fn is_playing(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.playing)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.loaded.as_ref().and_then(|l| self.tracks.get(l.index))
    }

    pub fn select_track(&mut self, index: usize) -> Result<&Track, PlaybackError> {
        let len = self.tracks.len();
        if index >= len {
            return Err(PlaybackError::InvalidIndex { index, len });
        }

        // Release before open: never two live instances.
        self.loaded = None;

        self.generation += 1;
        let generation = self.generation;
        let track = &self.tracks[index];
        tracing::info!(index, generation, title = %track.title, "selecting track");

        let instance = self.engine.open(generation, &track.preview_url)?;
        instance.play();
        self.loaded = Some(Loaded {
            index,
            generation,
            instance,
            playing: false,
            duration: None,
        });

        Ok(&self.tracks[index])
    }

    /// Returns false when idle. The playing flag only changes once the
    /// engine reports back.
    pub fn toggle_play_pause(&mut self) -> bool {
        let Some(loaded) = &self.loaded else {
            return false;
        };
        if loaded.playing {
            loaded.instance.pause();
        } else {
            loaded.instance.play();
        }
        true
    }

    pub fn pause(&mut self) {
        if let Some(loaded) = self.loaded.as_ref().filter(|l| l.playing) {
            loaded.instance.pause();
        }
    }

    /// Cyclic step through the list. From idle, next starts at the first
    /// track and previous at the last. Returns the newly selected index.
    pub fn advance(&mut self, direction: Direction) -> Result<Option<usize>, PlaybackError> {
        let len = self.tracks.len();
        if len == 0 {
            return Ok(None);
        }

        let target = match (direction, self.loaded.as_ref().map(|l| l.index)) {
            (Direction::Next, Some(i)) => wrap_next(i, len),
            (Direction::Previous, Some(i)) => wrap_prev(i, len),
            (Direction::Next, None) => 0,
            (Direction::Previous, None) => len - 1,
        };
        self.select_track(target)?;
        Ok(Some(target))
    }

    /// `fraction` comes straight from pointer geometry and is not clamped.
    pub fn seek(&mut self, fraction: f64) {
        let Some(loaded) = &self.loaded else { return };
        let duration = loaded.instance.duration().or(loaded.duration);
        match duration {
            Some(d) if d > 0.0 => {
                tracing::debug!(fraction, seconds = fraction * d, "seeking");
                loaded.instance.seek(fraction * d);
            }
            _ => tracing::debug!(fraction, "seek ignored, duration unknown"),
        }
    }

    pub fn close(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            tracing::info!(index = loaded.index, "closing player");
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        let loaded = self.loaded.as_ref()?;
        Some(Progress {
            position: loaded.instance.position().unwrap_or(0.0),
            duration: loaded.instance.duration().or(loaded.duration),
        })
    }

    /// Apply an engine callback. Returns whether anything observable changed.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<bool, PlaybackError> {
        let Some(loaded) = self
            .loaded
            .as_mut()
            .filter(|l| l.generation == event.generation)
        else {
            tracing::trace!(generation = event.generation, "dropping stale engine event");
            return Ok(false);
        };

        match event.kind {
            EngineEventKind::Playing => {
                let changed = !loaded.playing;
                loaded.playing = true;
                Ok(changed)
            }
            EngineEventKind::Paused => {
                let changed = loaded.playing;
                loaded.playing = false;
                Ok(changed)
            }
            EngineEventKind::Loaded { duration } => {
                loaded.duration = Some(duration);
                Ok(true)
            }
            EngineEventKind::Ended => {
                tracing::debug!(index = loaded.index, "track ended, advancing");
                self.advance(Direction::Next)?;
                Ok(true)
            }
            EngineEventKind::Failed(reason) => {
                // No retry and nothing shown; progress simply never fills in.
                tracing::warn!(index = loaded.index, %reason, "audio source failed");
                Ok(false)
            }
        }
    }
}
