use gtk4::prelude::*;
use libadwaita as adw;
use relm4::prelude::*;

use crate::artwork;
use crate::format::wrap_next;
use crate::lightbox::{Lightbox, LightboxMsg};
use crate::site::GalleryItem;

const AUTOPLAY_SECS: u32 = 4;
const PAGE_SIZE: i32 = 360;

pub struct Gallery {
    items: Vec<GalleryItem>,
    carousel: adw::Carousel,
    lightbox: Controller<Lightbox>,
}

#[derive(Debug)]
pub enum GalleryMsg {
    SetItems(Vec<GalleryItem>),
    Open(usize),
    Autoplay,
}

#[relm4::component(pub)]
impl SimpleComponent for Gallery {
    type Init = ();
    type Input = GalleryMsg;
    type Output = ();

    view! {
        gtk4::Box {
            set_orientation: gtk4::Orientation::Vertical,
            set_spacing: 12,
            set_margin_top: 16,
            set_margin_bottom: 16,
            set_vexpand: true,

            #[local_ref]
            carousel -> adw::Carousel {
                set_vexpand: true,
                set_spacing: 20,
                set_allow_scroll_wheel: true,
                #[watch]
                set_visible: !model.items.is_empty(),
            },

            adw::CarouselIndicatorDots {
                set_carousel: Some(&model.carousel),
                #[watch]
                set_visible: model.items.len() > 1,
            },

            adw::StatusPage {
                set_icon_name: Some("image-missing-symbolic"),
                set_title: "Nothing here yet",
                set_vexpand: true,
                #[watch]
                set_visible: model.items.is_empty(),
            },
        }
    }

    fn init(_: Self::Init, root: Self::Root, sender: ComponentSender<Self>) -> ComponentParts<Self> {
        let lightbox = Lightbox::builder()
            .launch(root.clone().upcast())
            .detach();

        let model = Self {
            items: Vec::new(),
            carousel: adw::Carousel::new(),
            lightbox,
        };

        let carousel = &model.carousel;
        let widgets = view_output!();

        let s = sender.clone();
        gtk4::glib::timeout_add_seconds_local(AUTOPLAY_SECS, move || {
            s.input(GalleryMsg::Autoplay);
            gtk4::glib::ControlFlow::Continue
        });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        match msg {
            GalleryMsg::SetItems(items) => {
                while self.carousel.n_pages() > 0 {
                    let page = self.carousel.nth_page(0);
                    self.carousel.remove(&page);
                }
                for (index, item) in items.iter().enumerate() {
                    self.carousel.append(&build_page(index, item, &sender));
                }
                self.lightbox.emit(LightboxMsg::SetItems(items.clone()));
                self.items = items;
            }
            GalleryMsg::Open(index) => {
                self.lightbox.emit(LightboxMsg::Open(index));
            }
            GalleryMsg::Autoplay => {
                let pages = self.carousel.n_pages();
                if pages < 2 || !self.carousel.is_mapped() {
                    return;
                }
                let current = self.carousel.position().round() as usize;
                let next = wrap_next(current, pages as usize) as u32;
                self.carousel.scroll_to(&self.carousel.nth_page(next), true);
            }
        }
    }
}

fn build_page(index: usize, item: &GalleryItem, sender: &ComponentSender<Gallery>) -> gtk4::Overlay {
    let picture = gtk4::Picture::new();
    picture.set_content_fit(gtk4::ContentFit::Cover);
    picture.set_size_request(PAGE_SIZE, PAGE_SIZE);
    picture.set_alternative_text(Some(item.title.as_str()));
    {
        let picture = picture.clone();
        artwork::load(item.preview_src(), move |texture| picture.set_paintable(Some(&texture)));
    }

    let overlay = gtk4::Overlay::new();
    overlay.set_child(Some(&picture));
    overlay.add_css_class("gallery-slide");
    overlay.set_overflow(gtk4::Overflow::Hidden);
    overlay.set_halign(gtk4::Align::Center);
    overlay.set_valign(gtk4::Align::Center);

    if item.is_video() {
        let badge = gtk4::Image::from_icon_name("media-playback-start-symbolic");
        badge.set_pixel_size(48);
        badge.add_css_class("video-badge");
        badge.set_halign(gtk4::Align::Center);
        badge.set_valign(gtk4::Align::Center);
        overlay.add_overlay(&badge);
    }

    let caption = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
    caption.add_css_class("slide-caption");
    caption.set_valign(gtk4::Align::End);
    if let Some(venue) = item.venue.as_deref().filter(|v| !v.is_empty()) {
        let venue = gtk4::Label::new(Some(venue));
        venue.add_css_class("accent");
        venue.add_css_class("caption");
        venue.set_xalign(0.0);
        caption.append(&venue);
    }
    let title = gtk4::Label::new(Some(item.title.as_str()));
    title.add_css_class("heading");
    title.set_ellipsize(gtk4::pango::EllipsizeMode::End);
    title.set_xalign(0.0);
    caption.append(&title);
    overlay.add_overlay(&caption);

    let s = sender.clone();
    let gesture = gtk4::GestureClick::new();
    gesture.connect_released(move |_, _, _, _| {
        s.input(GalleryMsg::Open(index));
    });
    overlay.add_controller(gesture);
    overlay.set_cursor_from_name(Some("pointer"));

    overlay
}
