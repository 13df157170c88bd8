pub mod controller;
pub mod enrollment;
pub mod polling;
pub mod session_logger;
pub mod state;
