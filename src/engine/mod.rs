pub mod attendance;
pub mod task;

pub use attendance::AttendanceEngine;
pub use task::TaskLifecycle;
