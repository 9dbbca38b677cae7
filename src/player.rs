use gtk4::prelude::*;
use mpris_server::{Metadata, PlaybackStatus, Player as MprisPlayer, Time};
use relm4::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::engine::GstEngine;
use crate::format::{format_time, genre_label};
use crate::playback::{Direction, EngineEvent, NowPlaying, PlaybackController, Progress};
use crate::site::{fetch_bytes, Track};

pub struct Player {
    controller: PlaybackController<GstEngine>,
    title: String,
    genre: String,
    full_link: String,
    position: f64,
    duration: Option<f64>,
    art: Option<gtk4::gdk::Texture>,
    art_url: Option<String>,
    reported: NowPlaying,
    published_length: Option<i64>,
    progress_bar: gtk4::ProgressBar,
    playing: Rc<Cell<bool>>,
    ticking: Rc<Cell<bool>>,
    mpris: Rc<RefCell<Option<MprisPlayer>>>,
}

#[derive(Debug)]
pub enum PlayerMsg {
    SetTracks(Vec<Track>),
    Select(usize),
    Toggle,
    Pause,
    Next,
    Prev,
    Close,
    Seek(f64),
    Frame,
    Engine(EngineEvent),
    OpenLink,
}

#[derive(Debug)]
pub enum PlayerOutput {
    StateChanged(NowPlaying),
    OpenLink(String),
}

#[relm4::component(pub)]
impl Component for Player {
    type Init = ();
    type Input = PlayerMsg;
    type Output = PlayerOutput;
    type CommandOutput = (String, Vec<u8>);

    view! {
        gtk4::Revealer {
            set_transition_type: gtk4::RevealerTransitionType::SlideUp,
            set_transition_duration: 200,
            #[watch]
            set_reveal_child: !model.controller.is_idle(),

            gtk4::Box {
                set_orientation: gtk4::Orientation::Vertical,

                gtk4::Separator {},

                gtk4::Box {
                    set_orientation: gtk4::Orientation::Horizontal,
                    set_spacing: 8,
                    set_margin_start: 8,
                    set_margin_end: 8,
                    set_margin_top: 8,

                    gtk4::Frame {
                        add_css_class: "album-art",
                        set_valign: gtk4::Align::Center,

                        gtk4::Image {
                            set_pixel_size: 42,
                            #[watch]
                            set_paintable: model.art.as_ref(),
                        },
                    },

                    gtk4::Box {
                        set_orientation: gtk4::Orientation::Vertical,
                        set_valign: gtk4::Align::Center,
                        set_hexpand: true,

                        gtk4::Label {
                            set_xalign: 0.0,
                            set_ellipsize: gtk4::pango::EllipsizeMode::End,
                            add_css_class: "album-title",
                            add_css_class: "caption",
                            #[watch]
                            set_label: &model.title,
                        },

                        gtk4::Label {
                            set_xalign: 0.0,
                            set_ellipsize: gtk4::pango::EllipsizeMode::End,
                            add_css_class: "dim-label",
                            add_css_class: "caption",
                            #[watch]
                            set_label: &model.genre,
                        },
                    },

                    gtk4::Button {
                        set_icon_name: "media-skip-backward-symbolic",
                        add_css_class: "flat",
                        set_valign: gtk4::Align::Center,
                        connect_clicked => PlayerMsg::Prev,
                    },

                    gtk4::Button {
                        #[watch]
                        set_icon_name: if model.controller.is_playing() { "media-playback-pause-symbolic" } else { "media-playback-start-symbolic" },
                        add_css_class: "circular",
                        add_css_class: "suggested-action",
                        set_valign: gtk4::Align::Center,
                        connect_clicked => PlayerMsg::Toggle,
                    },

                    gtk4::Button {
                        set_icon_name: "media-skip-forward-symbolic",
                        add_css_class: "flat",
                        set_valign: gtk4::Align::Center,
                        connect_clicked => PlayerMsg::Next,
                    },

                    gtk4::Button {
                        set_icon_name: "web-browser-symbolic",
                        add_css_class: "flat",
                        set_valign: gtk4::Align::Center,
                        set_tooltip_text: Some("Full mix"),
                        #[watch]
                        set_sensitive: !model.full_link.is_empty(),
                        connect_clicked => PlayerMsg::OpenLink,
                    },

                    gtk4::Button {
                        set_icon_name: "window-close-symbolic",
                        add_css_class: "flat",
                        set_valign: gtk4::Align::Center,
                        set_tooltip_text: Some("Close player"),
                        connect_clicked => PlayerMsg::Close,
                    },
                },

                gtk4::Box {
                    set_orientation: gtk4::Orientation::Horizontal,
                    set_spacing: 8,
                    set_margin_start: 8,
                    set_margin_end: 8,
                    set_margin_top: 4,
                    set_margin_bottom: 8,

                    gtk4::Label {
                        set_width_chars: 5,
                        add_css_class: "caption",
                        add_css_class: "numeric",
                        set_valign: gtk4::Align::Center,
                        #[watch]
                        set_label: &format_time(model.position),
                    },

                    #[local_ref]
                    progress_bar -> gtk4::ProgressBar {
                        set_hexpand: true,
                        set_valign: gtk4::Align::Center,
                        set_cursor_from_name: Some("pointer"),
                        add_css_class: "seek-bar",
                    },

                    gtk4::Label {
                        set_width_chars: 5,
                        add_css_class: "caption",
                        add_css_class: "numeric",
                        set_valign: gtk4::Align::Center,
                        #[watch]
                        set_label: &model.duration.map(format_time).unwrap_or_default(),
                    },
                },
            },
        }
    }

    fn init(_: Self::Init, root: Self::Root, sender: ComponentSender<Self>) -> ComponentParts<Self> {
        let s = sender.clone();
        let engine = GstEngine::new(move |event| s.input(PlayerMsg::Engine(event)));

        let progress_bar = gtk4::ProgressBar::new();
        let click = gtk4::GestureClick::new();
        {
            let bar = progress_bar.clone();
            let s = sender.clone();
            click.connect_pressed(move |_, _, x, _| {
                let width = bar.width() as f64;
                if width > 0.0 {
                    s.input(PlayerMsg::Seek(x / width));
                }
            });
        }
        progress_bar.add_controller(click);

        let mpris: Rc<RefCell<Option<MprisPlayer>>> = Rc::new(RefCell::new(None));
        let mpris_clone = mpris.clone();
        let st = sender.clone();
        let sn = sender.clone();
        let sp = sender.clone();
        let ss = sender.clone();

        gtk4::glib::MainContext::default().spawn_local(async move {
            match MprisPlayer::builder("showreel")
                .identity("Showreel")
                .can_play(true)
                .can_pause(true)
                .can_go_next(true)
                .can_go_previous(true)
                .can_seek(false)
                .can_control(true)
                .build()
                .await
            {
                Ok(m) => {
                    m.connect_play_pause(move |_| st.input(PlayerMsg::Toggle));
                    m.connect_next(move |_| sn.input(PlayerMsg::Next));
                    m.connect_previous(move |_| sp.input(PlayerMsg::Prev));
                    m.connect_stop(move |_| ss.input(PlayerMsg::Close));
                    let run_task = m.run();
                    *mpris_clone.borrow_mut() = Some(m);
                    run_task.await;
                }
                Err(e) => tracing::debug!(error = %e, "media key integration unavailable"),
            }
        });

        let model = Self {
            controller: PlaybackController::new(engine),
            title: String::new(),
            genre: String::new(),
            full_link: String::new(),
            position: 0.0,
            duration: None,
            art: None,
            art_url: None,
            reported: NowPlaying::default(),
            published_length: None,
            progress_bar: progress_bar.clone(),
            playing: Rc::new(Cell::new(false)),
            ticking: Rc::new(Cell::new(false)),
            mpris,
        };

        let progress_bar = &model.progress_bar;
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            PlayerMsg::SetTracks(tracks) => {
                self.controller.set_tracks(tracks);
            }
            PlayerMsg::Select(index) => {
                if let Err(e) = self.controller.select_track(index) {
                    tracing::error!(index, error = %e, "cannot play track");
                }
            }
            PlayerMsg::Toggle => {
                self.controller.toggle_play_pause();
            }
            PlayerMsg::Pause => self.controller.pause(),
            PlayerMsg::Next => self.advance(Direction::Next),
            PlayerMsg::Prev => self.advance(Direction::Previous),
            PlayerMsg::Close => self.controller.close(),
            PlayerMsg::Seek(fraction) => {
                self.controller.seek(fraction);
                self.poll_progress();
            }
            PlayerMsg::Frame => {
                self.poll_progress();
                return;
            }
            PlayerMsg::Engine(event) => match self.controller.handle_event(event) {
                Ok(false) => return,
                Ok(true) => {}
                Err(e) => tracing::error!(error = %e, "auto-advance failed"),
            },
            PlayerMsg::OpenLink => {
                if !self.full_link.is_empty() {
                    sender.output(PlayerOutput::OpenLink(self.full_link.clone())).ok();
                }
                return;
            }
        }

        self.refresh(&sender);
    }

    fn update_cmd(
        &mut self,
        (url, bytes): Self::CommandOutput,
        _sender: ComponentSender<Self>,
        _root: &Self::Root,
    ) {
        if self.art_url.as_deref() != Some(url.as_str()) || bytes.is_empty() {
            return;
        }
        match gtk4::gdk::Texture::from_bytes(&gtk4::glib::Bytes::from_owned(bytes)) {
            Ok(texture) => self.art = Some(texture),
            Err(e) => tracing::debug!(%url, error = %e, "artwork not decodable"),
        }
    }
}

impl Player {
    fn advance(&mut self, direction: Direction) {
        if let Err(e) = self.controller.advance(direction) {
            tracing::error!(?direction, error = %e, "cannot change track");
        }
    }

    fn poll_progress(&mut self) {
        match self.controller.progress() {
            Some(progress) => {
                self.position = progress.position;
                self.duration = progress.duration;
                self.progress_bar.set_fraction(progress.fraction().clamp(0.0, 1.0));
            }
            None => {
                self.position = 0.0;
                self.duration = None;
                self.progress_bar.set_fraction(0.0);
            }
        }
    }

    /// Bring display fields, the progress loop and listeners in line with
    /// the controller after a transition.
    fn refresh(&mut self, sender: &ComponentSender<Self>) {
        let now = self.controller.now_playing();
        let track_changed = now.index != self.reported.index;

        if track_changed {
            match self.controller.current_track().cloned() {
                Some(track) => self.show_track(&track, sender),
                None => self.clear_track(),
            }
        }

        self.playing.set(now.playing);
        if now.playing {
            self.start_progress_loop(sender);
        }

        // The duration arrives after the track starts, so it republishes too.
        let length = length_micros(self.controller.progress());
        let state_changed = now != self.reported;
        if state_changed || length != self.published_length {
            self.reported = now;
            self.published_length = length;
            self.sync_mpris(length);
        }
        if state_changed {
            sender.output(PlayerOutput::StateChanged(now)).ok();
        }
    }

    fn show_track(&mut self, track: &Track, sender: &ComponentSender<Self>) {
        self.title = track.title.clone();
        self.genre = genre_label(&track.genre);
        self.full_link = track.full_link.clone();
        self.art = None;
        self.poll_progress();

        self.art_url = (!track.artwork.is_empty()).then(|| track.artwork.clone());
        if let Some(url) = self.art_url.clone() {
            sender.oneshot_command(async move {
                let bytes = fetch_bytes(&url).await.unwrap_or_else(|e| {
                    tracing::debug!(%url, error = %e, "artwork fetch failed");
                    Vec::new()
                });
                (url, bytes)
            });
        }
    }

    fn clear_track(&mut self) {
        self.title.clear();
        self.genre.clear();
        self.full_link.clear();
        self.art = None;
        self.art_url = None;
        self.poll_progress();
    }

    /// Per-frame polling while playing. The callback stops itself once
    /// playback stops; the next transition into playing starts a new one.
    fn start_progress_loop(&self, sender: &ComponentSender<Self>) {
        if self.ticking.replace(true) {
            return;
        }
        let playing = self.playing.clone();
        let ticking = self.ticking.clone();
        let s = sender.clone();
        self.progress_bar.add_tick_callback(move |_, _| {
            if !playing.get() {
                ticking.set(false);
                return gtk4::glib::ControlFlow::Break;
            }
            s.input(PlayerMsg::Frame);
            gtk4::glib::ControlFlow::Continue
        });
    }

    fn sync_mpris(&self, length: Option<i64>) {
        let mpris = self.mpris.clone();

        let status = if self.controller.is_playing() {
            PlaybackStatus::Playing
        } else if !self.controller.is_idle() {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Stopped
        };

        let meta = self.controller.current_track().map(|t| {
            let mut m = Metadata::new();
            m.set_title(Some(&t.title));
            m.set_album(Some(&t.description));
            if !t.artwork.is_empty() {
                m.set_art_url(Some(&t.artwork));
            }
            if let Some(micros) = length {
                m.set_length(Some(Time::from_micros(micros)));
            }
            m
        });

        gtk4::glib::spawn_future_local(async move {
            let binding = mpris.borrow();
            let Some(m) = binding.as_ref() else { return };
            m.set_playback_status(status).await.ok();
            if let Some(meta) = meta {
                m.set_metadata(meta).await.ok();
            }
        });
    }
}

/// Track length for MPRIS metadata, once the engine knows it.
fn length_micros(progress: Option<Progress>) -> Option<i64> {
    progress
        .and_then(|p| p.duration)
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| (d * 1_000_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_follows_controller_progress() {
        let known = Progress {
            position: 3.0,
            duration: Some(61.5),
        };
        assert_eq!(length_micros(Some(known)), Some(61_500_000));
    }

    #[test]
    fn test_length_unknown_until_loaded() {
        assert_eq!(length_micros(None), None);
        let pending = Progress {
            position: 0.0,
            duration: None,
        };
        assert_eq!(length_micros(Some(pending)), None);
        let live = Progress {
            position: 0.0,
            duration: Some(f64::INFINITY),
        };
        assert_eq!(length_micros(Some(live)), None);
    }
}
