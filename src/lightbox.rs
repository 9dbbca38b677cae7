use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;
use relm4::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

use crate::artwork;
use crate::format::{wrap_next, wrap_prev};
use crate::site::GalleryItem;

/// Which gallery item the viewer shows, and whether it is up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightboxState {
    index: usize,
    open: bool,
}

impl LightboxState {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self, index: usize, len: usize) -> bool {
        if index >= len {
            return false;
        }
        self.index = index;
        self.open = true;
        true
    }

    pub fn next(&mut self, len: usize) {
        self.index = wrap_next(self.index, len);
    }

    pub fn previous(&mut self, len: usize) {
        self.index = wrap_prev(self.index, len);
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}

/// Something playing that has to be silenced before it is thrown away.
pub trait VideoHandle {
    fn stop(&self);
}

impl VideoHandle for gtk4::Video {
    fn stop(&self) {
        if let Some(stream) = self.media_stream() {
            stream.pause();
        }
    }
}

/// Holds the one live video of the viewer.
#[derive(Debug)]
pub struct MediaSlot<V> {
    live: Option<V>,
}

impl<V> Default for MediaSlot<V> {
    fn default() -> Self {
        Self { live: None }
    }
}

impl<V: VideoHandle> MediaSlot<V> {
    pub fn is_empty(&self) -> bool {
        self.live.is_none()
    }

    /// Stops the live video and hands it back for detaching.
    pub fn clear(&mut self) -> Option<V> {
        let video = self.live.take()?;
        video.stop();
        Some(video)
    }

    /// The previous video is stopped and passed to `detach` before `create`
    /// runs, so two never coexist.
    pub fn install(&mut self, detach: impl FnOnce(V), create: impl FnOnce() -> V) -> &V {
        if let Some(old) = self.clear() {
            detach(old);
        }
        self.live.insert(create())
    }
}

pub struct Lightbox {
    items: Vec<GalleryItem>,
    state: LightboxState,
    parent: gtk4::Widget,
    dialog: adw::Dialog,
    media_box: gtk4::Box,
    picture: gtk4::Picture,
    video: MediaSlot<gtk4::Video>,
    caption: String,
    meta: String,
    shown: Rc<Cell<u64>>,
}

#[derive(Debug)]
pub enum LightboxMsg {
    SetItems(Vec<GalleryItem>),
    Open(usize),
    Next,
    Prev,
    Closed,
}

#[relm4::component(pub)]
impl SimpleComponent for Lightbox {
    /// Widget the dialog is presented over.
    type Init = gtk4::Widget;
    type Input = LightboxMsg;
    type Output = ();

    view! {
        adw::Dialog {
            set_content_width: 960,
            set_content_height: 720,
            set_follows_content_size: false,

            #[wrap(Some)]
            set_child = &adw::ToolbarView {
                add_top_bar = &adw::HeaderBar {
                    set_show_title: false,
                },

                #[wrap(Some)]
                set_content = &gtk4::Box {
                    set_orientation: gtk4::Orientation::Vertical,
                    set_spacing: 8,
                    set_margin_start: 12,
                    set_margin_end: 12,
                    set_margin_bottom: 12,

                    gtk4::Box {
                        set_orientation: gtk4::Orientation::Horizontal,
                        set_spacing: 8,
                        set_vexpand: true,

                        gtk4::Button {
                            set_icon_name: "go-previous-symbolic",
                            add_css_class: "circular",
                            set_valign: gtk4::Align::Center,
                            connect_clicked => LightboxMsg::Prev,
                        },

                        #[local_ref]
                        media_box -> gtk4::Box {
                            set_orientation: gtk4::Orientation::Vertical,
                            set_hexpand: true,
                            set_vexpand: true,

                            #[local_ref]
                            picture -> gtk4::Picture {
                                set_content_fit: gtk4::ContentFit::Contain,
                                set_vexpand: true,
                                #[watch]
                                set_alternative_text: Some(model.caption.as_str()),
                            },
                        },

                        gtk4::Button {
                            set_icon_name: "go-next-symbolic",
                            add_css_class: "circular",
                            set_valign: gtk4::Align::Center,
                            connect_clicked => LightboxMsg::Next,
                        },
                    },

                    gtk4::Label {
                        add_css_class: "title-4",
                        set_wrap: true,
                        #[watch]
                        set_label: &model.caption,
                    },

                    gtk4::Label {
                        add_css_class: "dim-label",
                        #[watch]
                        set_label: &model.meta,
                        #[watch]
                        set_visible: !model.meta.is_empty(),
                    },
                },
            },
        }
    }

    fn init(parent: Self::Init, root: Self::Root, sender: ComponentSender<Self>) -> ComponentParts<Self> {
        let model = Self {
            items: Vec::new(),
            state: LightboxState::default(),
            parent,
            dialog: root.clone(),
            media_box: gtk4::Box::new(gtk4::Orientation::Vertical, 0),
            picture: gtk4::Picture::new(),
            video: MediaSlot::default(),
            caption: String::new(),
            meta: String::new(),
            shown: Rc::new(Cell::new(0)),
        };

        // Escape is handled by the dialog itself and ends up in `closed`.
        let s = sender.clone();
        model.dialog.connect_closed(move |_| s.input(LightboxMsg::Closed));

        let keys = gtk4::EventControllerKey::new();
        let s = sender.clone();
        keys.connect_key_pressed(move |_, key, _, _| match key {
            gtk4::gdk::Key::Left => {
                s.input(LightboxMsg::Prev);
                gtk4::glib::Propagation::Stop
            }
            gtk4::gdk::Key::Right => {
                s.input(LightboxMsg::Next);
                gtk4::glib::Propagation::Stop
            }
            _ => gtk4::glib::Propagation::Proceed,
        });
        model.dialog.add_controller(keys);

        let media_box = &model.media_box;
        let picture = &model.picture;
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, _sender: ComponentSender<Self>) {
        let len = self.items.len();
        match msg {
            LightboxMsg::SetItems(items) => {
                self.items = items;
                if self.state.is_open() {
                    self.dialog.close();
                }
            }
            LightboxMsg::Open(index) => {
                if self.state.open(index, len) {
                    self.show_current();
                    self.dialog.present(Some(&self.parent));
                }
            }
            LightboxMsg::Next if self.state.is_open() => {
                self.state.next(len);
                self.show_current();
            }
            LightboxMsg::Prev if self.state.is_open() => {
                self.state.previous(len);
                self.show_current();
            }
            LightboxMsg::Next | LightboxMsg::Prev => {}
            LightboxMsg::Closed => {
                self.state.close();
                self.drop_video();
            }
        }
    }
}

impl Lightbox {
    /// Pause and detach the video widget, if any.
    fn drop_video(&mut self) {
        if let Some(video) = self.video.clear() {
            self.media_box.remove(&video);
        }
    }

    fn show_current(&mut self) {
        let Some(item) = self.items.get(self.state.index()).cloned() else {
            return;
        };
        let token = self.shown.get() + 1;
        self.shown.set(token);

        self.caption = item.caption();
        self.meta = item.date.clone().unwrap_or_default();

        if item.is_video() {
            self.picture.set_visible(false);
            self.picture.set_paintable(None::<&gtk4::gdk::Paintable>);

            let media_box = self.media_box.clone();
            let video = self.video.install(
                |old| media_box.remove(&old),
                || {
                    let video = gtk4::Video::new();
                    video.set_autoplay(true);
                    video.set_loop(true);
                    video.set_vexpand(true);
                    video.set_file(Some(&gtk4::gio::File::for_uri(item.source())));
                    video
                },
            );
            self.media_box.prepend(video);
        } else {
            self.drop_video();
            self.picture.set_visible(true);
            self.picture.set_paintable(None::<&gtk4::gdk::Paintable>);
            let picture = self.picture.clone();
            let shown = self.shown.clone();
            artwork::load(item.source(), move |texture| {
                // A later navigation already replaced this item.
                if shown.get() == token {
                    picture.set_paintable(Some(&texture));
                }
            });
        }
        tracing::debug!(index = self.state.index(), video = item.is_video(), "lightbox item");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct FakeVideo {
        name: &'static str,
        journal: Journal,
    }

    impl VideoHandle for FakeVideo {
        fn stop(&self) {
            self.journal.borrow_mut().push(format!("stop {}", self.name));
        }
    }

    fn make(name: &'static str, journal: &Journal) -> impl FnOnce() -> FakeVideo {
        let journal = journal.clone();
        move || {
            journal.borrow_mut().push(format!("create {name}"));
            FakeVideo { name, journal }
        }
    }

    fn detach(journal: &Journal) -> impl FnOnce(FakeVideo) {
        let journal = journal.clone();
        move |old| journal.borrow_mut().push(format!("detach {}", old.name))
    }

    #[test]
    fn test_old_video_removed_before_new_one_created() {
        let journal = Journal::default();
        let mut slot = MediaSlot::default();

        slot.install(detach(&journal), make("first", &journal));
        let live = slot.install(detach(&journal), make("second", &journal));
        assert_eq!(live.name, "second");

        assert_eq!(
            *journal.borrow(),
            ["create first", "stop first", "detach first", "create second"]
        );
    }

    #[test]
    fn test_close_stops_live_video() {
        let journal = Journal::default();
        let mut slot = MediaSlot::default();
        slot.install(detach(&journal), make("clip", &journal));

        let closed = slot.clear();
        assert_eq!(closed.map(|v| v.name), Some("clip"));
        assert!(slot.is_empty());
        assert_eq!(journal.borrow().last().map(String::as_str), Some("stop clip"));

        // Closing again, or navigating to an image, has nothing to stop.
        assert!(slot.clear().is_none());
        assert_eq!(journal.borrow().len(), 2);
    }

    #[test]
    fn test_next_from_last_wraps_to_first() {
        let mut state = LightboxState::default();
        assert!(state.open(4, 5));
        state.next(5);
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn test_previous_from_first_wraps_to_last() {
        let mut state = LightboxState::default();
        assert!(state.open(0, 5));
        state.previous(5);
        assert_eq!(state.index(), 4);
        state.previous(5);
        assert_eq!(state.index(), 3);
    }

    #[test]
    fn test_open_rejects_out_of_range() {
        let mut state = LightboxState::default();
        assert!(!state.open(3, 3));
        assert!(!state.is_open());
        assert!(!state.open(0, 0));
    }

    #[test]
    fn test_close_keeps_index() {
        let mut state = LightboxState::default();
        state.open(2, 3);
        state.next(3);
        state.close();
        assert!(!state.is_open());
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn test_single_item_stays_put() {
        let mut state = LightboxState::default();
        state.open(0, 1);
        state.next(1);
        assert_eq!(state.index(), 0);
        state.previous(1);
        assert_eq!(state.index(), 0);
    }
}
