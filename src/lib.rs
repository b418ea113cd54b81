pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod liability;
pub mod media;
pub mod pages;
pub mod results;
pub mod upload;
pub mod verification;
