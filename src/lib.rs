pub mod config;
pub mod decode;
pub mod frames;
pub mod pose;
pub mod protocol;
