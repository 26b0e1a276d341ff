//! Browser session management and the live-page boundary
//!
//! - [`BrowserSession`]: launch or attach to Chrome/Chromium
//! - [`LivePage`]: what the capture pipeline needs from a rendered page
//! - [`ChromePage`] / [`StaticPage`]: CDP-backed and replayed implementations

pub mod config;
pub mod page;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use page::{ChromePage, GlyphRequest, LivePage, StaticPage};
pub use session::BrowserSession;
