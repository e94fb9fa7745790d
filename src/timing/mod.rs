pub mod controller;
pub mod detector;
pub mod engine;
pub mod events;
pub mod loop_worker;
pub mod recorder;
pub mod state;

pub use controller::SessionController;
pub use detector::LapDetector;
pub use engine::{RecordOutcome, TimingEngine, TimingSnapshot};
pub use events::TimingEvent;
pub use recorder::TrackRecorder;
pub use state::{TimingState, TimingStatus};
