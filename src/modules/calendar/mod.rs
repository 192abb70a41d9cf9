pub mod service;

pub use service::CalendarService;
