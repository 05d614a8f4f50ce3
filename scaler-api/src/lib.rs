pub mod rest;

pub use rest::RestServer;
