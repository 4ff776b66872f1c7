pub mod config;
pub mod models;
pub mod transcribe;
pub mod ui;

pub use config::*;
pub use models::*;
pub use transcribe::*;
pub use ui::*;
