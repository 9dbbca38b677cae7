use gtk4::prelude::*;
use relm4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::artwork;
use crate::format::genre_label;
use crate::playback::NowPlaying;
use crate::site::Track;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenreFilter {
    #[default]
    All,
    Genre(String),
}

impl GenreFilter {
    pub fn matches(&self, track: &Track) -> bool {
        match self {
            Self::All => true,
            Self::Genre(g) => track.genre == *g,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterState {
    genre: GenreFilter,
    visible: usize,
    base: usize,
    step: usize,
}

impl FilterState {
    pub fn new(base: usize, step: usize) -> Self {
        Self {
            genre: GenreFilter::All,
            visible: base,
            base,
            step,
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Changing the filter always starts over at the first page.
    pub fn set_genre(&mut self, genre: GenreFilter) {
        self.genre = genre;
        self.visible = self.base;
    }

    pub fn load_more(&mut self) {
        self.visible += self.step;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixRow {
    /// Position in the full track list; what playback addresses.
    pub index: usize,
    /// 1-based position within the filtered view.
    pub number: usize,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub duration: String,
    pub artwork: String,
    pub full_link: String,
    pub is_current: bool,
    pub is_playing: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixListView {
    pub rows: Vec<MixRow>,
    pub total: usize,
    pub has_more: bool,
}

pub fn render(tracks: &[Track], filter: &FilterState, now: NowPlaying) -> MixListView {
    let filtered: Vec<(usize, &Track)> = tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| filter.genre.matches(t))
        .collect();
    let total = filtered.len();

    let rows: Vec<MixRow> = filtered
        .into_iter()
        .take(filter.visible)
        .enumerate()
        .map(|(pos, (index, t))| {
            let is_current = now.index == Some(index);
            MixRow {
                index,
                number: pos + 1,
                title: t.title.clone(),
                description: t.description.clone(),
                genre: t.genre.clone(),
                duration: t.duration.clone(),
                artwork: t.artwork.clone(),
                full_link: t.full_link.clone(),
                is_current,
                is_playing: is_current && now.playing,
            }
        })
        .collect();

    MixListView {
        has_more: rows.len() < total,
        rows,
        total,
    }
}

/// Distinct genres in order of first appearance.
pub fn genres(tracks: &[Track]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for t in tracks {
        if !t.genre.is_empty() && !seen.contains(&t.genre) {
            seen.push(t.genre.clone());
        }
    }
    seen
}

pub struct MixList {
    tracks: Vec<Track>,
    filter: FilterState,
    now: NowPlaying,
    has_more: bool,
    list_box: gtk4::ListBox,
    filter_bar: gtk4::Box,
    row_indices: Rc<RefCell<Vec<usize>>>,
}

#[derive(Debug)]
pub enum MixListMsg {
    SetTracks(Vec<Track>),
    SetFilter(GenreFilter),
    LoadMore,
    NowPlaying(NowPlaying),
}

#[derive(Debug)]
pub enum MixListOutput {
    Play(usize),
    OpenLink(String),
}

#[relm4::component(pub)]
impl SimpleComponent for MixList {
    type Init = (usize, usize);
    type Input = MixListMsg;
    type Output = MixListOutput;

    view! {
        gtk4::ScrolledWindow {
            set_hscrollbar_policy: gtk4::PolicyType::Never,
            set_vexpand: true,
            set_hexpand: true,

            #[wrap(Some)]
            set_child = &gtk4::Box {
                set_orientation: gtk4::Orientation::Vertical,
                set_spacing: 12,
                set_margin_start: 16,
                set_margin_end: 16,
                set_margin_top: 16,
                set_margin_bottom: 16,

                #[local_ref]
                filter_bar -> gtk4::Box {
                    set_orientation: gtk4::Orientation::Horizontal,
                    set_spacing: 8,
                    set_halign: gtk4::Align::Center,
                },

                #[local_ref]
                list_box -> gtk4::ListBox {
                    set_selection_mode: gtk4::SelectionMode::None,
                    add_css_class: "boxed-list",
                },

                gtk4::Button {
                    set_label: "Load more",
                    set_halign: gtk4::Align::Center,
                    add_css_class: "pill",
                    #[watch]
                    set_visible: model.has_more,
                    connect_clicked => MixListMsg::LoadMore,
                },
            },
        }
    }

    fn init(
        (page_size, page_step): Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let model = Self {
            tracks: Vec::new(),
            filter: FilterState::new(page_size, page_step),
            now: NowPlaying::default(),
            has_more: false,
            list_box: gtk4::ListBox::new(),
            filter_bar: gtk4::Box::new(gtk4::Orientation::Horizontal, 8),
            row_indices: Rc::new(RefCell::new(Vec::new())),
        };

        let indices = model.row_indices.clone();
        let s = sender.clone();
        model.list_box.connect_row_activated(move |_, row| {
            let index = usize::try_from(row.index())
                .ok()
                .and_then(|pos| indices.borrow().get(pos).copied());
            if let Some(index) = index {
                s.output(MixListOutput::Play(index)).ok();
            }
        });

        let filter_bar = &model.filter_bar;
        let list_box = &model.list_box;
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        match msg {
            MixListMsg::SetTracks(tracks) => {
                self.tracks = tracks;
                self.filter.set_genre(GenreFilter::All);
                self.rebuild_filter_bar(&sender);
            }
            MixListMsg::SetFilter(genre) => {
                tracing::debug!(?genre, "filter changed");
                self.filter.set_genre(genre);
            }
            MixListMsg::LoadMore => self.filter.load_more(),
            MixListMsg::NowPlaying(now) => self.now = now,
        }
        self.render_rows(&sender);
    }
}

impl MixList {
    fn rebuild_filter_bar(&self, sender: &ComponentSender<Self>) {
        while let Some(child) = self.filter_bar.first_child() {
            self.filter_bar.remove(&child);
        }

        let all_btn = gtk4::ToggleButton::with_label("All");
        all_btn.set_active(true);
        let s = sender.input_sender().clone();
        all_btn.connect_clicked(move |_| s.emit(MixListMsg::SetFilter(GenreFilter::All)));
        self.filter_bar.append(&all_btn);

        for genre in genres(&self.tracks) {
            let btn = gtk4::ToggleButton::with_label(&genre_label(&genre));
            btn.set_group(Some(&all_btn));
            let s = sender.input_sender().clone();
            btn.connect_clicked(move |_| {
                s.emit(MixListMsg::SetFilter(GenreFilter::Genre(genre.clone())))
            });
            self.filter_bar.append(&btn);
        }
    }

    fn render_rows(&mut self, sender: &ComponentSender<Self>) {
        let view = render(&self.tracks, &self.filter, self.now);

        while let Some(child) = self.list_box.first_child() {
            self.list_box.remove(&child);
        }
        for row in &view.rows {
            self.list_box.append(&build_row(row, sender));
        }

        *self.row_indices.borrow_mut() = view.rows.iter().map(|r| r.index).collect();
        self.has_more = view.has_more;
        tracing::trace!(shown = view.rows.len(), total = view.total, "mix list rendered");
    }
}

fn build_row(data: &MixRow, sender: &ComponentSender<MixList>) -> gtk4::ListBoxRow {
    let row = gtk4::Box::new(gtk4::Orientation::Horizontal, 12);
    row.set_margin_start(12);
    row.set_margin_end(12);
    row.set_margin_top(6);
    row.set_margin_bottom(6);

    if data.is_playing {
        let icon = gtk4::Image::from_icon_name("audio-volume-high-symbolic");
        icon.add_css_class("accent");
        icon.set_width_request(24);
        row.append(&icon);
    } else {
        let number = gtk4::Label::new(Some(data.number.to_string().as_str()));
        number.add_css_class("dim-label");
        number.add_css_class("numeric");
        number.set_width_chars(3);
        number.set_xalign(1.0);
        row.append(&number);
    }

    let art = gtk4::Image::new();
    art.set_pixel_size(48);
    let frame = gtk4::Frame::new(None);
    frame.set_overflow(gtk4::Overflow::Hidden);
    frame.set_child(Some(&art));
    row.append(&frame);
    {
        let art = art.clone();
        artwork::load(&data.artwork, move |texture| art.set_paintable(Some(&texture)));
    }

    let info = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
    info.set_hexpand(true);
    info.set_valign(gtk4::Align::Center);

    let title = gtk4::Label::new(Some(data.title.as_str()));
    title.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    title.set_xalign(0.0);
    title.add_css_class("heading");
    if data.is_current {
        title.add_css_class("accent");
    }
    info.append(&title);

    let description = gtk4::Label::new(Some(data.description.as_str()));
    description.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    description.set_xalign(0.0);
    description.add_css_class("dim-label");
    description.add_css_class("caption");
    info.append(&description);
    row.append(&info);

    let genre = gtk4::Label::new(Some(genre_label(&data.genre).as_str()));
    genre.add_css_class("genre-tag");
    genre.add_css_class("caption");
    genre.set_valign(gtk4::Align::Center);
    row.append(&genre);

    let duration = gtk4::Label::new(Some(data.duration.as_str()));
    duration.add_css_class("dim-label");
    duration.add_css_class("numeric");
    duration.set_valign(gtk4::Align::Center);
    row.append(&duration);

    let link = gtk4::Button::from_icon_name("web-browser-symbolic");
    link.add_css_class("flat");
    link.set_valign(gtk4::Align::Center);
    link.set_tooltip_text(Some("Full mix"));
    link.set_sensitive(!data.full_link.is_empty());
    let url = data.full_link.clone();
    let s = sender.clone();
    link.connect_clicked(move |_| {
        s.output(MixListOutput::OpenLink(url.clone())).ok();
    });
    row.append(&link);

    let list_row = gtk4::ListBoxRow::new();
    list_row.set_child(Some(&row));
    list_row.set_cursor_from_name(Some("pointer"));
    if data.is_current {
        list_row.add_css_class("now-playing");
    }
    list_row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, genre: &str) -> Track {
        Track {
            id: title.to_string(),
            title: title.to_string(),
            description: format!("{} live", title),
            genre: genre.to_string(),
            duration: "1:00:00".to_string(),
            artwork: String::new(),
            preview_url: String::new(),
            full_link: String::new(),
        }
    }

    fn catalog() -> Vec<Track> {
        vec![
            track("A", "techno"),
            track("B", "house"),
            track("C", "techno"),
            track("D", "afro"),
            track("E", "techno"),
            track("F", "house"),
            track("G", "techno"),
            track("H", "techno"),
            track("I", "techno"),
            track("J", "house"),
        ]
    }

    fn titles(view: &MixListView) -> Vec<&str> {
        view.rows.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_all_shows_first_page() {
        let tracks = catalog();
        let filter = FilterState::new(6, 3);
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(titles(&view), ["A", "B", "C", "D", "E", "F"]);
        assert_eq!(view.total, 10);
        assert!(view.has_more);
    }

    #[test]
    fn test_all_unfiltered_when_everything_visible() {
        let tracks = catalog();
        let mut filter = FilterState::new(6, 3);
        filter.load_more();
        filter.load_more();
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(view.rows.len(), tracks.len());
        assert!(!view.has_more);
    }

    #[test]
    fn test_genre_filter_is_exact() {
        let mut tracks = catalog();
        tracks.push(track("K", "tech"));
        tracks.push(track("L", "Techno"));
        let mut filter = FilterState::new(20, 3);
        filter.set_genre(GenreFilter::Genre("techno".into()));
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(titles(&view), ["A", "C", "E", "G", "H", "I"]);
        assert!(view.rows.iter().all(|r| r.genre == "techno"));
    }

    #[test]
    fn test_rows_keep_global_index_and_local_number() {
        let tracks = catalog();
        let mut filter = FilterState::new(6, 3);
        filter.set_genre(GenreFilter::Genre("house".into()));
        let view = render(&tracks, &filter, NowPlaying::default());
        let pairs: Vec<(usize, usize)> = view.rows.iter().map(|r| (r.index, r.number)).collect();
        assert_eq!(pairs, [(1, 1), (5, 2), (9, 3)]);
        assert!(!view.has_more);
    }

    #[test]
    fn test_load_more_until_exhausted() {
        let tracks = catalog();
        let mut filter = FilterState::new(6, 3);
        filter.set_genre(GenreFilter::Genre("techno".into()));
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(view.total, 6);
        assert_eq!(view.rows.len(), 6);
        // visible == total: hidden
        assert!(!view.has_more);

        filter.set_genre(GenreFilter::All);
        assert!(render(&tracks, &filter, NowPlaying::default()).has_more);
        filter.load_more();
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(view.rows.len(), 9);
        assert!(view.has_more);
        filter.load_more();
        let view = render(&tracks, &filter, NowPlaying::default());
        assert_eq!(view.rows.len(), 10);
        assert!(!view.has_more);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut filter = FilterState::new(6, 3);
        filter.load_more();
        filter.load_more();
        assert_eq!(filter.visible(), 12);
        filter.set_genre(GenreFilter::Genre("afro".into()));
        assert_eq!(filter.visible(), 6);
        assert_eq!(filter.genre, GenreFilter::Genre("afro".into()));
    }

    #[test]
    fn test_now_playing_flags() {
        let tracks = catalog();
        let filter = FilterState::new(6, 3);

        let view = render(&tracks, &filter, NowPlaying { index: Some(2), playing: true });
        let flags: Vec<(bool, bool)> = view.rows.iter().map(|r| (r.is_current, r.is_playing)).collect();
        assert_eq!(flags[2], (true, true));
        assert_eq!(flags.iter().filter(|f| f.0).count(), 1);

        let view = render(&tracks, &filter, NowPlaying { index: Some(2), playing: false });
        assert!(view.rows[2].is_current);
        assert!(!view.rows[2].is_playing);

        // Current track filtered out: nothing highlighted.
        let mut filter = FilterState::new(6, 3);
        filter.set_genre(GenreFilter::Genre("house".into()));
        let view = render(&tracks, &filter, NowPlaying { index: Some(2), playing: true });
        assert!(view.rows.iter().all(|r| !r.is_current && !r.is_playing));
    }

    #[test]
    fn test_empty_catalog() {
        let view = render(&[], &FilterState::new(6, 3), NowPlaying::default());
        assert!(view.rows.is_empty());
        assert!(!view.has_more);
    }

    #[test]
    fn test_genres_in_first_appearance_order() {
        let mut tracks = catalog();
        tracks.push(track("X", ""));
        assert_eq!(genres(&tracks), ["techno", "house", "afro"]);
    }
}
