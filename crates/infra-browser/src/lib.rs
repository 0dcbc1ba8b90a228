// Chanscout Infrastructure - Browser Adapter
// Implements: BrowserLauncher, BrowserSession over headless Chromium (CDP)

pub mod launcher;
pub mod session;

pub use launcher::{ChromiumLauncher, LaunchOptions};
pub use session::ChromiumSession;
