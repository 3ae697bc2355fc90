pub mod fetch;
pub mod process_control;
pub mod startup_self_check;
pub mod subtitle;
pub mod video;
