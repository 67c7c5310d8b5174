//! Dawan - news and media publishing backend
//!
//! Core functionality for the Dawan Africa publishing platform: posts with
//! generated spoken audio, podcasts, newsletter subscriptions and media
//! uploads.

pub mod api;
pub mod audio;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;
