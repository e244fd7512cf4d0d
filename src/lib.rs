//! tab-shepherd - Chrome extension core for herding browser tabs into
//! labeled, collapsible groups. Built with Rust + WASM; the popup DOM stays
//! in JavaScript and drives everything through [`PopupSession`].

mod ai;
mod chrome;
mod classify;
mod cluster;
mod collapse;
mod domain;
mod error;
mod host;
mod popup;
mod reconcile;
mod rules;
mod session;
mod settings;
mod tab_data;
mod text;

pub use popup::PopupSession;

use wasm_bindgen::prelude::*;

// Set up panic hook and console logging for the browser
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Grouping-key domain of a URL for JavaScript callers; empty string when
/// the URL has no parsable host.
#[wasm_bindgen]
pub fn extract_domain(url: &str) -> String {
    domain::extract_domain(url).unwrap_or_default()
}
