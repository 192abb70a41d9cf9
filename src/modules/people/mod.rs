pub mod service;

pub use service::PeopleService;
