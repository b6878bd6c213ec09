pub mod analysis;
pub mod cache;
pub mod config;
pub mod constants;
pub mod index;
pub mod logging;
pub mod playback;
pub mod utils;
pub mod waveform;
