use gtk4::prelude::*;
use regex::Regex;
use relm4::prelude::*;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::error::SiteError;
use crate::site::ContactEndpoint;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MIN_NAME_CHARS: usize = 2;
const MIN_MESSAGE_CHARS: usize = 10;
const SUBJECT_PLACEHOLDER: &str = "Select a subject";

const SENDING_TEXT: &str = "Sending your message...";
const SENT_TEXT: &str = "Message sent! We'll get back to you soon.";
const FAILED_TEXT: &str = "Something went wrong. Please try again.";

/// The four fields posted to the contact endpoint, form-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid name.")]
    Name,
    #[error("Please enter a valid email address.")]
    Email,
    #[error("Please choose a subject.")]
    Subject,
    #[error("Your message must be at least 10 characters long.")]
    Message,
}

impl ContactForm {
    /// Checks run in field order and stop at the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::Name);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(ValidationError::Email);
        }
        if self.subject.is_empty() {
            return Err(ValidationError::Subject);
        }
        if self.message.trim().chars().count() < MIN_MESSAGE_CHARS {
            return Err(ValidationError::Message);
        }
        Ok(())
    }

    /// Same form with surrounding whitespace removed, as it goes on the wire.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.clone(),
            message: self.message.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

impl NoticeKind {
    /// How long the message stays up. Info stays until replaced.
    pub fn lifetime(self) -> Option<Duration> {
        match self {
            NoticeKind::Info => None,
            NoticeKind::Success => Some(Duration::from_secs(3)),
            NoticeKind::Error => Some(Duration::from_secs(5)),
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            NoticeKind::Info => "accent",
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// The single feedback line under the form. Every `show` hands out a serial;
/// a timer armed for an older serial finds a newer message and leaves it.
#[derive(Debug, Default)]
pub struct NoticeSlot {
    current: Option<Notice>,
    serial: u64,
}

impl NoticeSlot {
    pub fn show(&mut self, kind: NoticeKind, text: impl Into<String>) -> u64 {
        self.serial += 1;
        self.current = Some(Notice {
            kind,
            text: text.into(),
        });
        self.serial
    }

    pub fn dismiss(&mut self, serial: u64) -> bool {
        if serial != self.serial || self.current.is_none() {
            return false;
        }
        self.current = None;
        true
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }
}

pub struct ContactInit {
    /// Missing when `contact_endpoint` is not a usable URL; every send then fails.
    pub endpoint: Option<ContactEndpoint>,
    pub email: String,
    pub subjects: Vec<String>,
}

pub struct Contact {
    endpoint: Option<ContactEndpoint>,
    email: String,
    subjects: Vec<String>,
    notice: NoticeSlot,
    sending: bool,
    name_entry: gtk4::Entry,
    email_entry: gtk4::Entry,
    subject_dropdown: gtk4::DropDown,
    message_view: gtk4::TextView,
    notice_label: gtk4::Label,
}

#[derive(Debug)]
pub enum ContactMsg {
    Submit,
    Dismiss(u64),
    CopyEmail,
}

#[derive(Debug)]
pub enum ContactOutput {
    Toast(String),
}

#[relm4::component(pub)]
impl Component for Contact {
    type Init = ContactInit;
    type Input = ContactMsg;
    type Output = ContactOutput;
    type CommandOutput = Result<(), SiteError>;

    view! {
        gtk4::ScrolledWindow {
            set_hscrollbar_policy: gtk4::PolicyType::Never,
            set_vexpand: true,

            #[wrap(Some)]
            set_child = &gtk4::Box {
                set_orientation: gtk4::Orientation::Vertical,
                set_spacing: 12,
                set_margin_top: 24,
                set_margin_bottom: 24,
                set_margin_start: 24,
                set_margin_end: 24,
                set_width_request: 360,
                set_halign: gtk4::Align::Center,

                gtk4::Label {
                    set_label: "Get in touch",
                    add_css_class: "title-2",
                    set_xalign: 0.0,
                },

                gtk4::Box {
                    set_orientation: gtk4::Orientation::Horizontal,
                    set_spacing: 6,

                    gtk4::Label {
                        add_css_class: "dim-label",
                        set_xalign: 0.0,
                        set_hexpand: true,
                        set_selectable: true,
                        set_label: &model.email,
                    },

                    gtk4::Button {
                        set_icon_name: "edit-copy-symbolic",
                        add_css_class: "flat",
                        set_tooltip_text: Some("Copy email address"),
                        connect_clicked => ContactMsg::CopyEmail,
                    },
                },

                #[local_ref]
                name_entry -> gtk4::Entry {
                    set_placeholder_text: Some("Name"),
                    #[watch]
                    set_sensitive: !model.sending,
                },

                #[local_ref]
                email_entry -> gtk4::Entry {
                    set_placeholder_text: Some("Email"),
                    set_input_purpose: gtk4::InputPurpose::Email,
                    #[watch]
                    set_sensitive: !model.sending,
                },

                #[local_ref]
                subject_dropdown -> gtk4::DropDown {
                    #[watch]
                    set_sensitive: !model.sending,
                },

                gtk4::Frame {
                    gtk4::ScrolledWindow {
                        set_min_content_height: 140,

                        #[local_ref]
                        message_view -> gtk4::TextView {
                            set_wrap_mode: gtk4::WrapMode::WordChar,
                            set_top_margin: 8,
                            set_bottom_margin: 8,
                            set_left_margin: 8,
                            set_right_margin: 8,
                            #[watch]
                            set_sensitive: !model.sending,
                        },
                    },
                },

                #[local_ref]
                notice_label -> gtk4::Label {
                    set_wrap: true,
                    add_css_class: "form-notice",
                    #[watch]
                    set_visible: model.notice.current().is_some(),
                    #[watch]
                    set_label: model.notice.current().map(|n| n.text.as_str()).unwrap_or_default(),
                },

                gtk4::Button {
                    add_css_class: "suggested-action",
                    add_css_class: "pill",
                    set_halign: gtk4::Align::End,
                    #[watch]
                    set_label: if model.sending { "Sending..." } else { "Send" },
                    #[watch]
                    set_sensitive: !model.sending,
                    connect_clicked => ContactMsg::Submit,
                },
            },
        }
    }

    fn init(init: Self::Init, root: Self::Root, sender: ComponentSender<Self>) -> ComponentParts<Self> {
        let mut choices = vec![SUBJECT_PLACEHOLDER];
        choices.extend(init.subjects.iter().map(String::as_str));
        let subject_list = gtk4::StringList::new(&choices);

        let model = Self {
            endpoint: init.endpoint,
            email: init.email,
            subjects: init.subjects,
            notice: NoticeSlot::default(),
            sending: false,
            name_entry: gtk4::Entry::new(),
            email_entry: gtk4::Entry::new(),
            subject_dropdown: gtk4::DropDown::new(Some(subject_list), None::<gtk4::Expression>),
            message_view: gtk4::TextView::new(),
            notice_label: gtk4::Label::new(None),
        };

        let name_entry = &model.name_entry;
        let email_entry = &model.email_entry;
        let subject_dropdown = &model.subject_dropdown;
        let message_view = &model.message_view;
        let notice_label = &model.notice_label;
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            ContactMsg::Submit => {
                if self.sending {
                    return;
                }
                let form = self.read_form();
                if let Err(e) = form.validate() {
                    tracing::debug!(error = ?e, "contact form rejected");
                    self.show_notice(NoticeKind::Error, e.to_string(), &sender);
                    self.sync_notice_style();
                    return;
                }

                let Some(endpoint) = self.endpoint.clone() else {
                    tracing::warn!("no contact endpoint configured");
                    self.show_notice(NoticeKind::Error, FAILED_TEXT, &sender);
                    self.sync_notice_style();
                    return;
                };

                self.sending = true;
                self.show_notice(NoticeKind::Info, SENDING_TEXT, &sender);
                let form = form.trimmed();
                sender.oneshot_command(async move { endpoint.submit(&form).await });
            }
            ContactMsg::Dismiss(serial) => {
                self.notice.dismiss(serial);
            }
            ContactMsg::CopyEmail => {
                if let Some(display) = gtk4::gdk::Display::default() {
                    display.clipboard().set_text(&self.email);
                    sender.output(ContactOutput::Toast(format!("Copied {}", self.email))).ok();
                }
            }
        }
        self.sync_notice_style();
    }

    fn update_cmd(
        &mut self,
        result: Self::CommandOutput,
        sender: ComponentSender<Self>,
        _root: &Self::Root,
    ) {
        self.sending = false;
        match result {
            Ok(()) => {
                self.reset_form();
                self.show_notice(NoticeKind::Success, SENT_TEXT, &sender);
                sender.output(ContactOutput::Toast(SENT_TEXT.to_string())).ok();
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact submission failed");
                self.show_notice(NoticeKind::Error, FAILED_TEXT, &sender);
                sender.output(ContactOutput::Toast(FAILED_TEXT.to_string())).ok();
            }
        }
        self.sync_notice_style();
    }
}

impl Contact {
    fn read_form(&self) -> ContactForm {
        let buffer = self.message_view.buffer();
        let message = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);

        // Position 0 is the placeholder.
        let subject = match self.subject_dropdown.selected() {
            0 | gtk4::INVALID_LIST_POSITION => String::new(),
            n => self
                .subjects
                .get(n as usize - 1)
                .cloned()
                .unwrap_or_default(),
        };

        ContactForm {
            name: self.name_entry.text().to_string(),
            email: self.email_entry.text().to_string(),
            subject,
            message: message.to_string(),
        }
    }

    fn reset_form(&self) {
        self.name_entry.set_text("");
        self.email_entry.set_text("");
        self.subject_dropdown.set_selected(0);
        self.message_view.buffer().set_text("");
    }

    fn show_notice(&mut self, kind: NoticeKind, text: impl Into<String>, sender: &ComponentSender<Self>) {
        let serial = self.notice.show(kind, text);
        if let Some(lifetime) = kind.lifetime() {
            let s = sender.clone();
            gtk4::glib::timeout_add_local_once(lifetime, move || {
                s.input(ContactMsg::Dismiss(serial));
            });
        }
    }

    fn sync_notice_style(&self) {
        for kind in [NoticeKind::Info, NoticeKind::Success, NoticeKind::Error] {
            self.notice_label.remove_css_class(kind.css_class());
        }
        if let Some(notice) = self.notice.current() {
            self.notice_label.add_css_class(notice.kind.css_class());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ContactForm {
        ContactForm {
            name: "Deniz".to_string(),
            email: "deniz@example.com".to_string(),
            subject: "Booking".to_string(),
            message: "Are you free on the 14th?".to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_name_rules() {
        let form = ContactForm { name: String::new(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Name));
        let form = ContactForm { name: "A".to_string(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Name));
        let form = ContactForm { name: "  A  ".to_string(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Name));
        let form = ContactForm { name: "Al".to_string(), ..valid() };
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_email_rules() {
        for bad in ["", "deniz.example.com", "deniz@example", "de niz@example.com", "@example.com"] {
            let form = ContactForm { email: bad.to_string(), ..valid() };
            assert_eq!(form.validate(), Err(ValidationError::Email), "{bad:?}");
        }
        let form = ContactForm { email: "  deniz@example.com ".to_string(), ..valid() };
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_subject_required() {
        let form = ContactForm { subject: String::new(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Subject));
    }

    #[test]
    fn test_message_length() {
        let form = ContactForm { message: "123456789".to_string(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Message));
        let form = ContactForm { message: "   123456789   ".to_string(), ..valid() };
        assert_eq!(form.validate(), Err(ValidationError::Message));
        let form = ContactForm { message: "1234567890".to_string(), ..valid() };
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_first_failure_wins() {
        let form = ContactForm {
            name: "A".to_string(),
            email: "nope".to_string(),
            subject: String::new(),
            message: String::new(),
        };
        assert_eq!(form.validate(), Err(ValidationError::Name));
        let form = ContactForm { name: "Deniz".to_string(), ..form };
        assert_eq!(form.validate(), Err(ValidationError::Email));
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(
            ValidationError::Message.to_string(),
            "Your message must be at least 10 characters long."
        );
    }

    #[test]
    fn test_trimmed_keeps_subject() {
        let form = ContactForm {
            name: " Deniz ".to_string(),
            email: " deniz@example.com".to_string(),
            subject: "Other".to_string(),
            message: "\nHello there, friend\n".to_string(),
        }
        .trimmed();
        assert_eq!(form.name, "Deniz");
        assert_eq!(form.email, "deniz@example.com");
        assert_eq!(form.subject, "Other");
        assert_eq!(form.message, "Hello there, friend");
    }

    #[test]
    fn test_notice_lifetimes() {
        assert_eq!(NoticeKind::Info.lifetime(), None);
        assert_eq!(NoticeKind::Success.lifetime(), Some(Duration::from_secs(3)));
        assert_eq!(NoticeKind::Error.lifetime(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_stale_dismiss_keeps_newer_notice() {
        let mut slot = NoticeSlot::default();
        let first = slot.show(NoticeKind::Error, "bad email");
        let second = slot.show(NoticeKind::Info, SENDING_TEXT);

        assert!(!slot.dismiss(first));
        assert_eq!(slot.current().map(|n| n.kind), Some(NoticeKind::Info));

        assert!(slot.dismiss(second));
        assert!(slot.current().is_none());
        assert!(!slot.dismiss(second));
    }
}
