pub mod config;
pub mod index;
pub mod list;
pub mod meta;
pub mod play;
pub mod wave;
