pub mod launcher;
pub mod session;

pub use launcher::{acquire_browser, connect_browser, launch_browser, LaunchedBrowser};
pub use session::{BrowserSession, ChromiumSession, ChromiumSessionFactory, CompletionSignal, SessionFactory};
