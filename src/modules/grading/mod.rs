pub mod service;

pub use service::GradingService;
