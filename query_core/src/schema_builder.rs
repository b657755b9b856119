//! Table enumeration and removal
//!
//! Only the schema operations the driver needs for `clear_database`; creating
//! or altering tables is left to migration tooling.

use crate::driver::Driver;
use crate::errors::Result;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    driver: Arc<dyn Driver>,
}

impl SchemaBuilder {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Tables of the active schema, in the order the database reports them
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let dialect = self.driver.dialect();
        let (sql, values) = dialect.list_tables_query(self.driver.options());
        let result = self.driver.query_with_params(&sql, &values).await?;
        Ok(result.first_column_strings())
    }

    pub async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables().await?.iter().any(|name| name == table))
    }

    /// `DROP TABLE IF EXISTS`, a missing table is not an error
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = self.driver.dialect().drop_table_sql(table);
        self.driver.query(&sql).await?;
        Ok(())
    }
}
