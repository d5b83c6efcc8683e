//! Publishing collaborators.
//!
//! The stream runner only needs three capabilities from whatever exposes the
//! registry: start before the first line, react after each consumed line,
//! and stop on drain. `ScrapePublisher` serves pulls over HTTP;
//! `PushPublisher` pushes a full snapshot after every line.

pub mod push;
pub mod scrape;

use async_trait::async_trait;

use pmprom_core::error::Result;

pub use push::PushPublisher;
pub use scrape::ScrapePublisher;

#[async_trait]
pub trait Publisher: Send {
    /// Start publishing. Called once, before any input is read.
    async fn start(&mut self) -> Result<()>;

    /// Called after every consumed data line, parsed or not.
    async fn after_line(&mut self) -> Result<()> {
        Ok(())
    }

    /// Stop publishing. Called once when the runner drains.
    async fn stop(&mut self) -> Result<()>;
}
