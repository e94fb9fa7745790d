pub mod course;
pub mod lap;
pub mod session;

pub use course::{Course, CourseRef};
pub use lap::Lap;
pub use session::{BikeRef, Session, SessionSummary};
