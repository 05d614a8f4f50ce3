pub mod aggregator;
pub mod consumers;

pub use aggregator::Aggregator;
pub use consumers::MetricConsumer;
