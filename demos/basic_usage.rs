//! # Basic Usage Example
//!
//! Walks through the core QueryMill workflow against an in-memory SQLite
//! database:
//! - Opening a connection and running literal SQL
//! - Inserting, updating and deleting rows by column values
//! - Building SELECT statements with grouped conditions, joins and subqueries
//! - Transactions and clearing the schema

use anyhow::Context;
use chrono::Utc;
use querymill::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct Customer {
    id: i64,
    name: String,
    tier: String,
}

#[derive(Debug, Deserialize)]
struct Spending {
    name: String,
    spent: f64,
}

fn columns(value: Value) -> anyhow::Result<ColumnValues> {
    value
        .as_object()
        .cloned()
        .context("column values must be a JSON object")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🚀 QueryMill Basic Usage Example");
    println!("================================");

    // 1. Connect
    let connection = Connection::open(ConnectionOptions::new_sqlite(":memory:")).await?;
    println!("✅ Connected to {}", connection.options().display_string());

    connection.clear_database().await?;
    connection
        .query(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, \
             tier TEXT NOT NULL, external_ref TEXT, created_at TEXT)",
        )
        .await?;
    connection
        .query("CREATE TABLE purchases (id INTEGER PRIMARY KEY, customer_id INTEGER, amount REAL)")
        .await?;

    // 2. Insert
    println!("\n📝 Inserting rows");
    for (name, tier) in [("Ada", "gold"), ("Brook", "silver"), ("Cyd", "silver")] {
        let result = connection
            .insert(
                "customers",
                columns(json!({
                    "name": name,
                    "tier": tier,
                    "external_ref": Uuid::new_v4().to_string(),
                    "created_at": Utc::now().to_rfc3339(),
                }))?,
            )
            .await?;
        println!("   {} -> id {:?}", name, result.last_insert_id);
    }
    for (customer_id, amount) in [(1, 120.0), (1, 35.5), (2, 80.0), (3, 12.25)] {
        connection
            .insert(
                "purchases",
                columns(json!({"customer_id": customer_id, "amount": amount}))?,
            )
            .await?;
    }

    // 3. Update and delete
    let promoted = connection
        .update(
            "customers",
            columns(json!({"tier": "gold"}))?,
            columns(json!({"name": "Brook"}))?,
        )
        .await?;
    println!("✅ Promoted {} customer(s)", promoted.rows_affected);

    // 4. Query builder
    println!("\n🔍 Querying");
    let gold: Vec<Customer> = connection
        .create_query_builder()
        .select(&["id", "name", "tier"])
        .from("customers")
        .and_where("tier = :tier", [("tier", json!("gold"))])
        .and_where_group(|group| {
            group
                .and_where("name LIKE :prefix", [("prefix", json!("A%"))])
                .or_where("name LIKE :prefix", [("prefix", json!("B%"))])
        })
        .order_by("name", SortOrder::Asc)
        .fetch_all()
        .await?;
    for customer in &gold {
        println!("   #{} {} ({})", customer.id, customer.name, customer.tier);
    }

    let spending: Vec<Spending> = connection
        .create_query_builder()
        .select(&["c.name"])
        .select_raw("SUM(p.amount) AS spent")
        .from_as("customers", "c")
        .inner_join("purchases", Some("p"), Condition::raw("p.customer_id = c.id"))
        .group_by(&["c.name"])
        .and_having("SUM(p.amount) > :min", [("min", json!(50))])
        .order_by("spent", SortOrder::Desc)
        .fetch_all()
        .await?;
    for row in &spending {
        println!("   {} spent {:.2}", row.name, row.spent);
    }

    let big_spenders = connection
        .create_query_builder()
        .select(&["customer_id"])
        .from("purchases")
        .and_where("amount >= :amount", [("amount", json!(100))]);
    let compiled = connection
        .create_query_builder()
        .select(&["name"])
        .from("customers")
        .filter(Condition::in_subquery("id", big_spenders))
        .compile()?;
    println!("   SQL: {}", compiled.sql());
    println!("   parameters: {:?}", compiled.values());

    // 5. Transactions
    println!("\n🔄 Transactions");
    connection.begin_transaction().await?;
    connection
        .delete("purchases", columns(json!({"customer_id": 3}))?)
        .await?;
    connection.rollback_transaction().await?;
    let remaining = connection.query("SELECT id FROM purchases").await?;
    println!("✅ Rolled back, {} purchases remain", remaining.rows.len());

    // 6. Cleanup
    connection.clear_database().await?;
    let tables = connection.create_schema_builder().list_tables().await?;
    println!("\n🧹 Cleared database, {} tables left", tables.len());

    connection.close().await?;
    Ok(())
}
