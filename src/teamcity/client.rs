mod core;
mod resources;

pub use self::core::{ClientSettings, TeamCityClient};
