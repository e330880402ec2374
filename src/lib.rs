//! Scavenge - trailer downloader for Radarr libraries
//!
//! Polls Radarr for movies, downloads the YouTube trailer of every movie
//! Radarr has not downloaded yet, and stores it as `{slug}.mp4`.

pub mod config;
pub mod jobs;
pub mod services;
