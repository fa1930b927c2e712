use std::cmp::Ordering;

use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FilePage, FileQuery, FileRecord, FileUpdate, SortField, SortOrder};
use super::tables::*;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and index its storage path
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(!file.file_path.is_empty(), "file path must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;

            let mut path_table = write_txn.open_table(FILE_PATHS)?;
            path_table.insert(file.file_path.as_str(), file.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by its UUID
    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get a file by its storage path (resolves path -> uuid -> file)
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let path_table = read_txn.open_table(FILE_PATHS)?;

        let id = match path_table.get(path)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let files_table = read_txn.open_table(FILES)?;
        match files_table.get(id.as_str())? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Check if a storage path is already recorded
    pub fn path_exists(&self, path: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILE_PATHS)?;
        Ok(table.get(path)?.is_some())
    }

    /// Delete a file by its UUID and clean up the path index
    pub fn delete_file(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let file_path: Option<String> = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file.file_path)
                }
                None => None,
            };
            result
        };

        let deleted = match file_path {
            Some(path) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }
                {
                    let mut path_table = write_txn.open_table(FILE_PATHS)?;
                    path_table.remove(path.as_str())?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Apply a partial update to a file's catalog fields.
    /// Returns the updated record, or `None` if the file does not exist.
    pub fn update_file(
        &self,
        id: &str,
        update: &FileUpdate,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file)
                }
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut file) => {
                if let Some(ref title) = update.title {
                    file.title = title.clone();
                }
                if let Some(ref description) = update.description {
                    file.description = description.clone();
                }
                if let Some(ref category) = update.category {
                    file.category = category.clone();
                }
                if let Some(ref language) = update.language {
                    file.language = language.clone();
                }
                if let Some(ref provider) = update.provider {
                    file.provider = provider.clone();
                }
                if let Some(ref roles) = update.roles {
                    file.roles = roles.clone();
                }
                file.updated_at = chrono::Utc::now();

                let serialized = rmp_serde::to_vec_named(&file)?;
                let mut table = write_txn.open_table(FILES)?;
                table.insert(id, serialized.as_slice())?;
                Some(file)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Get all files, in storage order
    pub fn get_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }

    /// Search, filter, sort and page the catalog
    pub fn list_files(&self, query: &FileQuery) -> Result<FilePage, DatabaseError> {
        let mut matching: Vec<FileRecord> = self
            .get_all_files()?
            .into_iter()
            .filter(|f| query.matches(f))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort);
            let ordering = match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            // Stable pages regardless of direction
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(FilePage { items, total })
    }
}

fn compare(a: &FileRecord, b: &FileRecord, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::FileName => a
            .file_name
            .to_lowercase()
            .cmp(&b.file_name.to_lowercase()),
        SortField::FileSize => a.file_size.cmp(&b.file_size),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}
