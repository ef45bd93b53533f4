//! Collects recent articles from RSS feeds and video transcripts and distils
//! them into a short markdown digest with a language model.

pub mod ai;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod services;
pub mod web;

pub use config::Config;
pub use error::{AppError, Result};
