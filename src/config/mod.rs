pub mod motion_config;

pub use motion_config::{load_motion_config, HealthConfig, MotionConfig, PollConfig, SimulatorConfig};
