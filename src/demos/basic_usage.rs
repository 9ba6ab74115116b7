//! Basic Client Example
//!
//! Walks through the client API against an in-process mock server:
//! - Creating a database
//! - Inserting, reading, updating and deleting documents
//! - Querying a view by key range
//!
//! Run with: cargo run --example basic_usage

use serde::{Deserialize, Serialize};
use sofa_mock::{store::field_view, MockServer, MockStore};
use sofa_rs::{Client, ViewRow};

#[derive(Debug, Serialize, Deserialize)]
struct Fruit {
    name: String,
    color: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Basic sofa client example\n");

    let mut store = MockStore::new();
    store.register_view("fruit", "by_name", field_view("name"));
    let server = MockServer::start(store)?;
    println!("Mock server at {}\n", server.url());

    let client = Client::new(server.url());
    let db = client.get_or_create_database("fruit").await?;
    println!("Using database '{}'", db.name());

    let rev = db
        .put(
            "apple",
            &Fruit {
                name: "apple".to_string(),
                color: "red".to_string(),
            },
        )
        .await?;
    println!("Inserted apple at {}", rev);

    for (name, color) in [("banana", "yellow"), ("cherry", "red"), ("grape", "purple")] {
        let (id, rev) = db
            .put_new(&Fruit {
                name: name.to_string(),
                color: color.to_string(),
            })
            .await?;
        println!("Inserted {} as {} at {}", name, id, rev);
    }

    let fetched = db.get::<Fruit>("apple").await?;
    println!("\nFetched {:?} at {}", fetched.doc, fetched.rev);

    let rev = db
        .update(
            "apple",
            &fetched.rev,
            &Fruit {
                name: "apple".to_string(),
                color: "green".to_string(),
            },
        )
        .await?;
    println!("Updated apple to {}", rev);

    let rows: Vec<ViewRow<String, Fruit>> = db
        .view("fruit", "by_name")
        .range(Some("b"), Some("d"))
        .await?;
    println!("\nFruit named b..d:");
    for row in &rows {
        println!("  {} ({})", row.key, row.value.color);
    }

    db.delete("apple", &rev).await?;
    println!("\nDeleted apple; {} documents left", db.all_ids().await?.len());

    client.delete_database(&db).await?;
    server.stop().await;
    Ok(())
}
