// Wardrobe - local storage for clothing items, outfits and their photos
// Module declarations

pub mod commands;
pub mod config;
pub mod seed;
pub mod state;

pub use commands::{AppState, CommandError, Confirm, Deletion};
pub use config::AppConfig;
