//! Settings file and command-line parameters

pub mod params;
pub mod settings;

pub use params::Params;
pub use settings::Settings;
