//! HTTP handlers for the proxy service.

pub mod generate;
pub mod health;
pub mod rss;
