//! GStreamer `playbin` as the audio engine: one pipeline per loaded track.

use gstreamer as gst;
use gstreamer::prelude::*;
use std::rc::Rc;

use crate::error::EngineError;
use crate::playback::{AudioEngine, EngineEvent, EngineEventKind, EngineInstance};

const BUFFER_NS: i64 = 5_000_000_000;

pub struct GstEngine {
    sink: Rc<dyn Fn(EngineEvent)>,
}

impl GstEngine {
    /// `sink` receives every bus callback, already translated into events.
    pub fn new(sink: impl Fn(EngineEvent) + 'static) -> Self {
        Self {
            sink: Rc::new(sink),
        }
    }
}

pub struct GstInstance {
    pipeline: gst::Element,
    _bus_watch: gst::bus::BusWatchGuard,
}

fn seconds(t: gst::ClockTime) -> f64 {
    t.nseconds() as f64 / 1_000_000_000.0
}

impl AudioEngine for GstEngine {
    type Instance = GstInstance;

    fn open(&mut self, generation: u64, source: &str) -> Result<GstInstance, EngineError> {
        let pipeline = gst::ElementFactory::make("playbin")
            .build()
            .map_err(|e| EngineError::Pipeline(e.to_string()))?;
        pipeline.set_property("uri", source);
        pipeline.set_property("buffer-duration", BUFFER_NS);

        let bus = pipeline
            .bus()
            .ok_or_else(|| EngineError::Pipeline("playbin has no bus".to_string()))?;

        let sink = self.sink.clone();
        let weak = pipeline.downgrade();
        let bus_watch = bus
            .add_watch_local(move |_, msg| {
                let emit = |kind| sink(EngineEvent { generation, kind });
                match msg.view() {
                    gst::MessageView::Eos(_) => emit(EngineEventKind::Ended),
                    gst::MessageView::Error(err) => {
                        emit(EngineEventKind::Failed(err.error().to_string()))
                    }
                    gst::MessageView::StateChanged(changed) => {
                        let Some(pipeline) = weak.upgrade() else {
                            return gst::glib::ControlFlow::Break;
                        };
                        // Children of the playbin report their own transitions.
                        if msg.src() == Some(pipeline.upcast_ref::<gst::Object>()) {
                            match changed.current() {
                                gst::State::Playing => emit(EngineEventKind::Playing),
                                gst::State::Paused => emit(EngineEventKind::Paused),
                                _ => {}
                            }
                        }
                    }
                    gst::MessageView::DurationChanged(_) | gst::MessageView::AsyncDone(_) => {
                        let duration = weak
                            .upgrade()
                            .and_then(|p| p.query_duration::<gst::ClockTime>());
                        if let Some(d) = duration {
                            emit(EngineEventKind::Loaded {
                                duration: seconds(d),
                            });
                        }
                    }
                    _ => {}
                }
                gst::glib::ControlFlow::Continue
            })
            .map_err(|e| EngineError::Pipeline(e.to_string()))?;

        tracing::debug!(generation, uri = source, "opened playbin");
        Ok(GstInstance {
            pipeline,
            _bus_watch: bus_watch,
        })
    }
}

impl GstInstance {
    fn set_state(&self, state: gst::State) {
        if let Err(e) = self.pipeline.set_state(state) {
            tracing::warn!(?state, error = %e, "pipeline state change failed");
        }
    }
}

impl EngineInstance for GstInstance {
    fn play(&self) {
        self.set_state(gst::State::Playing);
    }

    fn pause(&self) {
        self.set_state(gst::State::Paused);
    }

    fn seek(&self, seconds: f64) {
        let ns = (seconds.max(0.0) * 1_000_000_000.0) as u64;
        if let Err(e) = self.pipeline.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
            gst::ClockTime::from_nseconds(ns),
        ) {
            tracing::debug!(seconds, error = %e, "seek rejected");
        }
    }

    fn position(&self) -> Option<f64> {
        self.pipeline.query_position::<gst::ClockTime>().map(seconds)
    }

    fn duration(&self) -> Option<f64> {
        self.pipeline.query_duration::<gst::ClockTime>().map(seconds)
    }
}

impl Drop for GstInstance {
    fn drop(&mut self) {
        self.pipeline.set_state(gst::State::Null).ok();
    }
}
