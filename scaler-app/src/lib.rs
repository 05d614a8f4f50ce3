pub mod app;
pub mod blueprint;
pub mod wrapper;

pub use app::{AppState, ScalableApp, COOLDOWN_MIN, LEARNING_MULTIPLIER_MIN, SCALING_INTERVAL_MULTIPLIER_MIN};
pub use blueprint::AppBlueprint;
pub use wrapper::{ComponentWrapper, Dimension};
