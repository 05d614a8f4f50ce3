pub mod checker;
pub mod client;
pub mod scaler_loop;

pub use checker::choose_scaling_action;
pub use client::ScalingEngineClient;
pub use scaler_loop::Scaler;
