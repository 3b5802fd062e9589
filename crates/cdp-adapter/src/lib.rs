//! Chromium page driver
//!
//! Launches Chromium through `chromiumoxide` and exposes each tab as a
//! [`action_primitives::PageDriver`]. Selectors of every supported form are
//! resolved by an in-page script that tags the matched element with a marker
//! attribute; clicks, fills and read-backs then address the marker.

pub mod errors;
mod page;
pub mod script;
mod session;

pub use errors::CdpError;
pub use page::CdpPage;
pub use session::{detect_chrome_executable, BrowserSettings, ChromiumSession, CHROME_ENV};
