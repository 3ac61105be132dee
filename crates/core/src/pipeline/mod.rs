pub mod detect_and_match_use_case;
pub mod enroll_use_case;
pub mod pipeline_logger;
pub mod session_config;
pub mod session_controller;
