use std::str::FromStr;

use diesel::{Queryable, Selectable};
use eyre::{eyre, Context};

use crate::model::{BucketId, Compression, FileCipher, StoredFile, StoredFileId};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = super::super::schema::StoredFile)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbStoredFile {
    pub stored_file_id: i64,
    pub bucket_id: i64,
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub compression: String,
    pub cipher_name: Option<String>,
    pub cipher_key_version: Option<i32>,
    pub cipher_iv: Option<String>,
    pub cipher_tag: Option<String>,
}

impl TryFrom<DbStoredFile> for StoredFile {
    type Error = eyre::Report;

    fn try_from(value: DbStoredFile) -> Result<Self, Self::Error> {
        let cipher = match value.cipher_name {
            None => None,
            Some(name) => Some(FileCipher {
                name,
                key_version: value
                    .cipher_key_version
                    .ok_or_else(|| eyre!("StoredFile row has cipher but no key version"))?,
                iv: value
                    .cipher_iv
                    .ok_or_else(|| eyre!("StoredFile row has cipher but no IV"))?,
                tag: value
                    .cipher_tag
                    .ok_or_else(|| eyre!("StoredFile row has cipher but no tag"))?,
            }),
        };
        Ok(StoredFile {
            id: StoredFileId(value.stored_file_id),
            bucket_id: BucketId(value.bucket_id),
            path: value.path,
            mime_type: value.mime_type,
            size: value.size,
            compression: Compression::from_str(&value.compression)
                .wrap_err("invalid compression in StoredFile row")?,
            cipher,
        })
    }
}
