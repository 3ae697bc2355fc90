pub mod repository;

mod id_types;
mod job;
mod profile;
mod rendition;
mod segment;
mod stored_file;
mod subtitle;
mod video;
pub use id_types::*;
pub use job::*;
pub use profile::*;
pub use rendition::*;
pub use segment::*;
pub use stored_file::*;
pub use subtitle::*;
pub use video::*;

mod util;
