pub mod authorization_state;
pub mod frame_result;
pub mod result_cache;
pub mod sampling_scheduler;
pub mod session_snapshot;
pub mod session_state;
