pub mod assistant;
pub mod channel;
pub mod config;
pub mod controller;
pub mod editor;
pub mod focus;
pub mod host;
pub mod keyboard;
pub mod model;
pub mod overlay;
pub mod page;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod session;
pub mod settings;
pub mod sim;
pub mod terminal;
pub mod timer;
pub mod typo;
