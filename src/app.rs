use crate::config::SiteConfig;
use crate::contact::{Contact, ContactInit, ContactOutput};
use crate::gallery::{Gallery, GalleryMsg};
use crate::mix_list::{MixList, MixListMsg, MixListOutput};
use crate::player::{Player, PlayerMsg, PlayerOutput};
use crate::site::{Catalog, ContactEndpoint, SiteClient};
use gtk4::gdk;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;
use relm4::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

const TOAST_SECS: u32 = 4;

pub struct App {
    mixes: Controller<MixList>,
    gallery: Controller<Gallery>,
    contact: Controller<Contact>,
    player: Controller<Player>,
    toast_overlay: adw::ToastOverlay,
    player_idle: Rc<Cell<bool>>,
}

#[derive(Debug)]
pub enum AppMsg {
    MixAction(MixListOutput),
    PlayerAction(PlayerOutput),
    ContactAction(ContactOutput),
    PlayerToggle,
    PlayerNext,
    PlayerPrev,
    Suspended,
    OpenLink(String),
    ShowToast(String),
}

#[derive(Debug)]
pub enum AppCmd {
    CatalogLoaded(Catalog),
}

/// Window-wide player keys. Space only means play/pause once something is
/// loaded, so it still activates buttons otherwise. Nothing is taken while
/// the user is typing.
pub fn media_shortcut(key: gdk::Key, ctrl: bool, focused_on_text: bool, idle: bool) -> Option<AppMsg> {
    if focused_on_text {
        return None;
    }
    match key {
        gdk::Key::space if !ctrl && !idle => Some(AppMsg::PlayerToggle),
        gdk::Key::Right if ctrl => Some(AppMsg::PlayerNext),
        gdk::Key::Left if ctrl => Some(AppMsg::PlayerPrev),
        _ => None,
    }
}

#[relm4::component(pub)]
impl Component for App {
    type Init = ();
    type Input = AppMsg;
    type Output = ();
    type CommandOutput = AppCmd;

    view! {
        adw::ApplicationWindow {
            set_title: Some("Showreel"),
            set_default_width: 900,
            set_default_height: 700,
            set_size_request: (360, 480),

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {
                gtk4::Box {
                    set_orientation: gtk4::Orientation::Vertical,

                    adw::HeaderBar {
                        #[wrap(Some)]
                        #[name = "view_switcher"]
                        set_title_widget = &adw::ViewSwitcher {
                            set_policy: adw::ViewSwitcherPolicy::Wide,
                        },
                    },

                    #[name = "content_stack"]
                    adw::ViewStack {
                        set_vexpand: true,

                        add_titled_with_icon[Some("mixes"), "Mixes", "audio-x-generic-symbolic"] = model.mixes.widget() {},
                        add_titled_with_icon[Some("gallery"), "Gallery", "image-x-generic-symbolic"] = model.gallery.widget() {},
                        add_titled_with_icon[Some("contact"), "Contact", "mail-unread-symbolic"] = model.contact.widget() {},
                    },

                    #[name = "player_box"]
                    gtk4::Box {},
                },
            },
        }
    }

    fn init(_: Self::Init, root: Self::Root, sender: ComponentSender<Self>) -> ComponentParts<Self> {
        let css = gtk4::CssProvider::new();
        css.load_from_string(include_str!("style.css"));
        gtk4::style_context_add_provider_for_display(
            &gtk4::prelude::WidgetExt::display(&root),
            &css,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );

        let config = SiteConfig::load();
        let client = match SiteClient::new(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(site_url = %config.site_url, error = %e, "site unusable");
                None
            }
        };
        let endpoint = match ContactEndpoint::new(&config) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                tracing::error!(endpoint = %config.contact_endpoint, error = %e, "contact endpoint unusable");
                None
            }
        };

        let mixes = MixList::builder()
            .launch((config.page_size, config.page_step))
            .forward(sender.input_sender(), AppMsg::MixAction);

        let gallery = Gallery::builder().launch(()).detach();

        let contact = Contact::builder()
            .launch(ContactInit {
                endpoint,
                email: config.contact_email.clone(),
                subjects: config.contact_subjects.clone(),
            })
            .forward(sender.input_sender(), AppMsg::ContactAction);

        let player = Player::builder()
            .launch(())
            .forward(sender.input_sender(), AppMsg::PlayerAction);

        let model = Self {
            mixes,
            gallery,
            contact,
            player,
            toast_overlay: adw::ToastOverlay::new(),
            player_idle: Rc::new(Cell::new(true)),
        };

        let toast_overlay = &model.toast_overlay;
        let widgets = view_output!();

        widgets.view_switcher.set_stack(Some(&widgets.content_stack));
        widgets.player_box.append(model.player.widget());

        let narrow_breakpoint = adw::Breakpoint::new(adw::BreakpointCondition::new_length(
            adw::BreakpointConditionLengthType::MaxWidth,
            600.0,
            adw::LengthUnit::Px,
        ));
        narrow_breakpoint.add_setter(
            &widgets.view_switcher,
            "policy",
            Some(&adw::ViewSwitcherPolicy::Narrow.to_value()),
        );
        root.add_breakpoint(narrow_breakpoint);

        // Hidden window: stop the preview, like a backgrounded tab would.
        let s = sender.clone();
        root.connect_suspended_notify(move |window| {
            if window.is_suspended() {
                s.input(AppMsg::Suspended);
            }
        });

        let s = sender.clone();
        let content_stack = widgets.content_stack.clone();
        let idle = model.player_idle.clone();
        let key_ctrl = gtk4::EventControllerKey::new();
        key_ctrl.set_propagation_phase(gtk4::PropagationPhase::Capture);
        key_ctrl.connect_key_pressed(move |_, key, _, modifiers| {
            let ctrl = modifiers.contains(gdk::ModifierType::CONTROL_MASK);
            let focused_on_text = content_stack
                .root()
                .and_then(|r| r.focus())
                .map(|w| w.is::<gtk4::Entry>() || w.is::<gtk4::Text>() || w.is::<gtk4::TextView>())
                .unwrap_or(false);

            match media_shortcut(key, ctrl, focused_on_text, idle.get()) {
                Some(msg) => {
                    s.input(msg);
                    gtk4::glib::Propagation::Stop
                }
                None => gtk4::glib::Propagation::Proceed,
            }
        });
        root.add_controller(key_ctrl);

        if let Some(client) = client {
            sender.oneshot_command(async move { AppCmd::CatalogLoaded(client.load_catalog().await) });
        }

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            AppMsg::MixAction(action) => match action {
                MixListOutput::Play(index) => self.player.emit(PlayerMsg::Select(index)),
                MixListOutput::OpenLink(url) => sender.input(AppMsg::OpenLink(url)),
            },
            AppMsg::PlayerAction(output) => match output {
                PlayerOutput::StateChanged(now) => {
                    self.player_idle.set(now.index.is_none());
                    self.mixes.emit(MixListMsg::NowPlaying(now));
                }
                PlayerOutput::OpenLink(url) => sender.input(AppMsg::OpenLink(url)),
            },
            AppMsg::ContactAction(ContactOutput::Toast(msg)) => {
                sender.input(AppMsg::ShowToast(msg));
            }
            AppMsg::PlayerToggle => self.player.emit(PlayerMsg::Toggle),
            AppMsg::PlayerNext => self.player.emit(PlayerMsg::Next),
            AppMsg::PlayerPrev => self.player.emit(PlayerMsg::Prev),
            AppMsg::Suspended => self.player.emit(PlayerMsg::Pause),
            AppMsg::OpenLink(url) => {
                if url.is_empty() {
                    return;
                }
                if let Err(e) = open::that(&url) {
                    tracing::warn!(%url, error = %e, "failed to open browser");
                    sender.input(AppMsg::ShowToast(format!("Failed to open browser: {}", e)));
                }
            }
            AppMsg::ShowToast(msg) => {
                let toast = adw::Toast::new(&msg);
                toast.set_timeout(TOAST_SECS);
                self.toast_overlay.add_toast(toast);
            }
        }
    }

    fn update_cmd(&mut self, msg: Self::CommandOutput, _sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            AppCmd::CatalogLoaded(Catalog { mixes, gallery }) => {
                self.player.emit(PlayerMsg::SetTracks(mixes.clone()));
                self.mixes.emit(MixListMsg::SetTracks(mixes));
                self.gallery.emit(GalleryMsg::SetItems(gallery));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_toggles_only_with_a_track_loaded() {
        assert!(matches!(
            media_shortcut(gdk::Key::space, false, false, false),
            Some(AppMsg::PlayerToggle)
        ));
        assert!(media_shortcut(gdk::Key::space, false, false, true).is_none());
    }

    #[test]
    fn test_typing_never_reaches_the_player() {
        assert!(media_shortcut(gdk::Key::space, false, true, false).is_none());
        assert!(media_shortcut(gdk::Key::Right, true, true, false).is_none());
        assert!(media_shortcut(gdk::Key::Left, true, true, true).is_none());
    }

    #[test]
    fn test_ctrl_arrows_change_track() {
        assert!(matches!(
            media_shortcut(gdk::Key::Right, true, false, false),
            Some(AppMsg::PlayerNext)
        ));
        assert!(matches!(
            media_shortcut(gdk::Key::Left, true, false, true),
            Some(AppMsg::PlayerPrev)
        ));
        assert!(media_shortcut(gdk::Key::Right, false, false, false).is_none());
        assert!(media_shortcut(gdk::Key::a, true, false, false).is_none());
    }
}
