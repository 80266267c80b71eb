//! Database schema definitions
//!
//! The input and output tables usually already exist. Creating them is only
//! needed for a fresh database, so every statement uses `IF NOT EXISTS` and
//! leaves an existing table untouched.

use crate::config::{InputConfig, OutputConfig};
use rusqlite::Connection;

/// Builds the CREATE TABLE statements for the configured tables
///
/// When input and output share a table, one table holds the id, URL and
/// e-mail columns. Otherwise the input table holds id and URL and the output
/// table holds id and e-mails.
pub fn schema_sql(input: &InputConfig, output: &OutputConfig) -> String {
    if input.table == output.table {
        let mut names = vec![&input.id_field];
        for column in [&input.url_field, &output.id_field, &output.emails_field] {
            if !names.contains(&column) {
                names.push(column);
            }
        }

        let columns: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, name)| match i {
                0 => format!("{} TEXT PRIMARY KEY", name),
                _ => format!("{} TEXT", name),
            })
            .collect();

        return format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            input.table,
            columns.join(",\n    ")
        );
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {} TEXT PRIMARY KEY,\n    {} TEXT\n);\n\
         CREATE TABLE IF NOT EXISTS {} (\n    {} TEXT PRIMARY KEY,\n    {} TEXT\n);\n",
        input.table,
        input.id_field,
        input.url_field,
        output.table,
        output.id_field,
        output.emails_field
    )
}

/// Initializes the database schema
///
/// Identifiers must already have been validated by the config loader.
pub fn initialize_schema(
    conn: &Connection,
    input: &InputConfig,
    output: &OutputConfig,
) -> rusqlite::Result<()> {
    conn.execute_batch(&schema_sql(input, output))
}
