//! Shared fixture: an in-memory SQLite tracker with tasks and labels

#![allow(dead_code)]

use std::sync::Arc;
use tracker_graphql::{
    Attribute, CancelToken, ConnectionEngine, Dialect, EngineConfig, GraphQLResult, Page,
    QueryDescriptor, Relation, Schema, SchemaBuilder, SqliteExecutor, Table, ValueCodec,
};

pub type Engine = ConnectionEngine<SqliteExecutor>;

const DDL: &str = "
    create table task (
        id integer primary key,
        col text not null,
        priority integer,
        done integer not null default 0
    );
    create table label (
        id integer primary key,
        task_id integer not null references task(id),
        name text not null,
        weight integer
    );
    create table doc (
        id integer primary key,
        meta text
    );
";

pub fn schema() -> Schema {
    SchemaBuilder::new()
        .table(
            Table::new("task")
                .attribute(Attribute::new("id", "id", ValueCodec::Integer))
                .attribute(Attribute::new("col", "col", ValueCodec::Text))
                .attribute(Attribute::new("priority", "priority", ValueCodec::Integer).nullable())
                .attribute(Attribute::new("done", "done", ValueCodec::Boolean))
                .primary_key(&["id"])
                .relation(Relation::new("labels", "label").join("id", "taskId")),
        )
        .table(
            Table::new("label")
                .attribute(Attribute::new("id", "id", ValueCodec::Integer))
                .attribute(Attribute::new("taskId", "task_id", ValueCodec::Integer))
                .attribute(Attribute::new("name", "name", ValueCodec::Text))
                .attribute(Attribute::new("weight", "weight", ValueCodec::Integer).nullable())
                .primary_key(&["id"])
                .relation(Relation::new("task", "task").join("taskId", "id").unique()),
        )
        .table(
            Table::new("doc")
                .attribute(Attribute::new("id", "id", ValueCodec::Integer))
                .attribute(Attribute::new("meta", "meta", ValueCodec::Json).nullable())
                .primary_key(&["id"]),
        )
        .build()
        .expect("fixture schema is valid")
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
        .with_dialect(Dialect::Sqlite)
        .with_max_rows(100)
}

pub fn engine() -> Engine {
    engine_with(config())
}

pub fn engine_with(config: EngineConfig) -> Engine {
    let executor = SqliteExecutor::open_in_memory().unwrap();
    executor.connection().execute_batch(DDL).unwrap();
    ConnectionEngine::new(Arc::new(schema()), config, executor)
}

/// An engine whose database has no tables at all: any statement that
/// reaches it fails with a backend error.
pub fn engine_without_tables() -> Engine {
    let executor = SqliteExecutor::open_in_memory().unwrap();
    ConnectionEngine::new(Arc::new(schema()), config(), executor)
}

pub fn insert_task(engine: &Engine, id: i64, col: &str, priority: Option<i64>, done: bool) {
    engine
        .executor()
        .connection()
        .execute(
            "insert into task (id, col, priority, done) values (?1, ?2, ?3, ?4)",
            rusqlite::params![id, col, priority, done],
        )
        .unwrap();
}

pub fn insert_label(engine: &Engine, id: i64, task_id: i64, name: &str, weight: Option<i64>) {
    engine
        .executor()
        .connection()
        .execute(
            "insert into label (id, task_id, name, weight) values (?1, ?2, ?3, ?4)",
            rusqlite::params![id, task_id, name, weight],
        )
        .unwrap();
}

/// `meta` is stored verbatim, whitespace and key order included
pub fn insert_doc(engine: &Engine, id: i64, meta: Option<&str>) {
    engine
        .executor()
        .connection()
        .execute(
            "insert into doc (id, meta) values (?1, ?2)",
            rusqlite::params![id, meta],
        )
        .unwrap();
}

pub fn delete_task(engine: &Engine, id: i64) {
    engine
        .executor()
        .connection()
        .execute("delete from task where id = ?1", [id])
        .unwrap();
}

pub fn fetch(engine: &Engine, table: &str, descriptor: &QueryDescriptor) -> GraphQLResult<Page> {
    engine.plan_and_execute(table, descriptor, &CancelToken::new())
}

pub fn ids(page: &Page) -> Vec<i64> {
    page.nodes
        .iter()
        .map(|n| n["id"].as_i64().expect("every node has an integer id"))
        .collect()
}
