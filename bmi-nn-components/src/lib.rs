pub mod components;
pub mod config;
pub mod python;

pub use components::{Activation, BmiModel, FeedForward};
pub use config::Config;
