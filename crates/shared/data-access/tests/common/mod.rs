//! Shared fixtures: a `widgets` table in an in-memory SQLite database.

#![allow(dead_code)]

use std::path::PathBuf;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};

use data_access::{DbContext, Repository, UnitOfWork};

pub mod widget {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "widgets")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
        pub in_stock: bool,
        pub quantity: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Fresh database with an empty `widgets` table.
///
/// A single pooled connection keeps the in-memory database alive for the
/// whole test.
pub async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    connect_with_widgets(options).await
}

/// File-backed database with two pooled connections, so one connection can
/// hold the write lock while the other waits on it.
pub async fn setup_file(name: &str) -> (DatabaseConnection, PathBuf) {
    let path = std::env::temp_dir().join(format!(
        "data-access-{}-{}.db",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(2).sqlx_logging(false);

    (connect_with_widgets(options).await, path)
}

async fn connect_with_widgets(options: ConnectOptions) -> DatabaseConnection {
    let db = Database::connect(options)
        .await
        .expect("sqlite should open");

    let schema = Schema::new(DbBackend::Sqlite);
    let create = schema.create_table_from_entity(widget::Entity);
    db.execute(db.get_database_backend().build(&create))
        .await
        .expect("widgets table should be created");

    db
}

pub fn widget(id: i32, name: &str, in_stock: bool, quantity: i32) -> widget::Model {
    widget::Model {
        id,
        name: name.to_string(),
        in_stock,
        quantity,
    }
}

/// Insert `widgets` through a throwaway context.
pub async fn seed(db: &DatabaseConnection, widgets: Vec<widget::Model>) {
    let ctx = DbContext::new(db.clone());
    Repository::<widget::Entity>::new(&ctx).add_range(widgets);
    ctx.save_changes().await.expect("seed should commit");
}

/// Five widgets, three of them in stock.
pub fn catalogue() -> Vec<widget::Model> {
    vec![
        widget(1, "bolt", true, 10),
        widget(2, "nut", true, 25),
        widget(3, "washer", false, 0),
        widget(4, "gear", true, 3),
        widget(5, "spring", false, 0),
    ]
}
