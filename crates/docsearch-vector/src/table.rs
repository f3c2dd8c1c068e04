//! LanceDB connection helpers.

use anyhow::Result;
use lancedb::{connect, Connection, Table};
use std::path::Path;

pub async fn open_db(dir: &Path) -> Result<Connection> {
	std::fs::create_dir_all(dir)?;
	Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// `None` when the table has never been created.
pub async fn open_if_exists(conn: &Connection, name: &str) -> Result<Option<Table>> {
	if !table_exists(conn, name).await? { return Ok(None); }
	Ok(Some(conn.open_table(name).execute().await?))
}
