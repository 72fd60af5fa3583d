use anyhow::Result;

#[derive(Clone)]
pub struct Database {
    pub pool: r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>,
}

impl Database {
    pub fn connect_default() -> Result<Self> {
        std::fs::create_dir_all("data")?;
        Self::connect(r2d2_sqlite::SqliteConnectionManager::file("data/blogsmith.db"))
    }

    /// An in-memory database, for tests.
    pub fn connect_in_memory() -> Result<Self> {
        // A single connection, so every query sees the same memory database.
        Self::connect_with_pool_size(r2d2_sqlite::SqliteConnectionManager::memory(), 1)
    }

    pub fn connect(manager: r2d2_sqlite::SqliteConnectionManager) -> Result<Self> {
        let pool = r2d2::Pool::new(manager)?;
        let me = Self { pool };
        me.migrate()?;
        Ok(me)
    }

    fn connect_with_pool_size(
        manager: r2d2_sqlite::SqliteConnectionManager,
        size: u32,
    ) -> Result<Self> {
        let pool = r2d2::Pool::builder().max_size(size).build(manager)?;
        let me = Self { pool };
        me.migrate()?;
        Ok(me)
    }

    /// Migrate the database to the latest version.
    fn migrate(&self) -> Result<()> {
        let migrations = [include_str!("migrations/01-initial.sql")];
        // Find the current migration version. If it fails, we need to run all the migrations.
        let conn = self.pool.get()?;
        let current_version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                rusqlite::params![],
                |row| row.get(0),
            )
            .unwrap_or("0".to_string());
        let current_version = current_version.parse::<u32>().unwrap_or(0);
        tracing::info!("Current schema version: {}", current_version);
        for migration in &migrations[current_version as usize..] {
            tracing::info!("Applying migration: {}", migration);
            conn.execute_batch(migration)?;
        }
        Ok(())
    }

    /// Convenience method to collect rows from a query into a Vec.
    pub fn collect_rows<T: FromRow, P: rusqlite::Params>(
        &self,
        sql: &str,
        parameters: P,
    ) -> Result<Vec<T>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query(parameters)?;
        rows.mapped(T::from_row)
            .map(|r| r.map_err(Into::into))
            .collect::<Result<_>>()
    }

    /// Count rows for a query whose first column is `COUNT(*)`.
    pub fn count_rows<P: rusqlite::Params>(&self, sql: &str, parameters: P) -> Result<i64> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let count: i64 = stmt.query_row(parameters, |row| row.get(0))?;
        Ok(count)
    }
}

pub trait FromRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>
    where
        Self: Sized;
}
