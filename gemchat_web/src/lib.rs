#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Browser front-end for the chat: cookie-keyed sessions, an HTML page and a
//! small JSON API over the same conversation operations.

mod error;
mod handler;
mod render;
mod server;
mod session;

pub use error::{Error, Result};
pub use render::render_page;
pub use server::{AppState, ChatServer};
pub use session::{SESSION_COOKIE, SessionRegistry, SessionSlot};
