//! Embedded SQL migrations for the two DuckDB files
//!
//! `cartpos.duckdb` holds the local key-value store, `logs.duckdb` the event
//! log. Both track applied migrations in `sys_migrations`, bootstrapped by
//! `000_migrations.sql`.

/// A named migration: (filename, sql_content)
pub type Migration = (&'static str, &'static str);

/// Local store schema, applied in order
pub const STORE_MIGRATIONS: &[Migration] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_kv_store.sql", include_str!("001_kv_store.sql")),
];

/// Event log schema, applied in order
pub const LOG_MIGRATIONS: &[Migration] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_sys_logs.sql", include_str!("001_sys_logs.sql")),
];
