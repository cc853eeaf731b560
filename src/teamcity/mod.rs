mod client;
pub mod locator;
pub mod types;

pub use client::{ClientSettings, TeamCityClient};
pub use types::MutedTests;
