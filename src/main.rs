mod app;
mod artwork;
mod config;
mod contact;
mod engine;
mod error;
mod format;
mod gallery;
mod lightbox;
mod logging;
mod mix_list;
mod playback;
mod player;
mod site;

use app::App;
use relm4::prelude::*;

fn main() {
    if let Err(e) = logging::init_logging() {
        eprintln!("logging unavailable: {e}");
    }

    // Without GStreamer the site still browses; previews just fail to open.
    if let Err(e) = gstreamer::init() {
        tracing::error!(error = %e, "gstreamer init failed");
    }

    relm4::RELM_THREADS.set(4).ok();
    let app = RelmApp::new("io.github.showreel");
    app.run::<App>(());
}
