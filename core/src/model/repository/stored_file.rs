use diesel::prelude::*;
use eyre::{Context, Result};
use tracing::instrument;

use crate::model::{repository::db_entity::DbStoredFile, StoredFile, StoredFileId};

use super::db::DbConn;
use super::schema;

#[instrument(skip(conn), level = "trace")]
pub fn get_stored_file(conn: &mut DbConn, file_id: StoredFileId) -> Result<StoredFile> {
    use schema::StoredFile;
    let db_file: DbStoredFile = StoredFile::table
        .find(file_id.0)
        .first(conn)
        .wrap_err("error querying table StoredFile")?;
    db_file.try_into()
}

#[instrument(skip(conn, file), level = "trace")]
pub fn insert_stored_file(conn: &mut DbConn, file: &StoredFile) -> Result<StoredFileId> {
    use schema::StoredFile;
    assert!(file.id.0 == 0);
    let (cipher_name, cipher_key_version, cipher_iv, cipher_tag) = match &file.cipher {
        Some(cipher) => (
            Some(cipher.name.as_str()),
            Some(cipher.key_version),
            Some(cipher.iv.as_str()),
            Some(cipher.tag.as_str()),
        ),
        None => (None, None, None, None),
    };
    let id = diesel::insert_into(StoredFile::table)
        .values((
            StoredFile::bucket_id.eq(file.bucket_id.0),
            StoredFile::path.eq(&file.path),
            StoredFile::mime_type.eq(&file.mime_type),
            StoredFile::size.eq(file.size),
            StoredFile::compression.eq(file.compression.to_string()),
            StoredFile::cipher_name.eq(cipher_name),
            StoredFile::cipher_key_version.eq(cipher_key_version),
            StoredFile::cipher_iv.eq(cipher_iv),
            StoredFile::cipher_tag.eq(cipher_tag),
        ))
        .returning(StoredFile::stored_file_id)
        .get_result(conn)
        .wrap_err("error inserting into table StoredFile")?;
    Ok(StoredFileId(id))
}
