use redb::TableDefinition;

/// File records: uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Storage path index: provider path -> uuid (serve lookups, duplicate keys)
pub const FILE_PATHS: TableDefinition<&str, &str> = TableDefinition::new("file_paths");
