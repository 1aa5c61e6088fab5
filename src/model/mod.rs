pub mod attendance;
pub mod holiday;
pub mod intern;
pub mod task;
