pub mod calendar;
pub mod classes;
pub mod curriculum;
pub mod enrollments;
pub mod grading;
pub mod people;
pub mod subjects;

pub use calendar::CalendarService;
pub use classes::ClassService;
pub use curriculum::CurriculumService;
pub use enrollments::EnrollmentService;
pub use grading::GradingService;
pub use people::PeopleService;
pub use subjects::SubjectService;
