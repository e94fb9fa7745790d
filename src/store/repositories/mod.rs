pub mod courses;
pub mod presets;
pub mod sessions;

pub use courses::CourseRegistry;
pub use presets::preset_courses;
pub use sessions::SessionRepository;
