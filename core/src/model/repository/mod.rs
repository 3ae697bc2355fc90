pub mod db;
pub mod db_entity;
pub mod profile;
pub mod queue;
pub mod rendition;
#[allow(non_snake_case)]
mod schema;
pub mod segment;
pub mod stored_file;
pub mod subtitle;
#[cfg(test)]
mod test;
pub mod video;

#[macro_export]
macro_rules! interact {
    ($conn:ident, $block:expr) => {
        tracing::Instrument::in_current_span(<_ as futures::TryFutureExt>::map_err(
            $conn.interact::<_, eyre::Result<_>>($block),
            |err| match err {
                deadpool_diesel::InteractError::Panic(_) => {
                    eyre::eyre!("database interaction panicked")
                }
                deadpool_diesel::InteractError::Aborted => {
                    eyre::eyre!("database interaction was aborted")
                }
            },
        ))
    };
}
