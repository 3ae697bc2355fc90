mod misc;
mod simple_queue_actor;

pub use simple_queue_actor::TaskError;
pub mod transcoding;
