mod bmi_model;
mod feed_forward;

pub use bmi_model::BmiModel;
pub use feed_forward::{Activation, FeedForward};
