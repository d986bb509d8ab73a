//! JSON attributes on SQLite, where documents are stored as text

mod common;

use common::{engine, fetch, ids, insert_doc, Engine};
use serde_json::{json, Value};
use tracker_graphql::QueryDescriptor;

/// Three spellings of `{"a":1}`, one other document and a null
fn seeded() -> Engine {
    let engine = engine();
    insert_doc(&engine, 1, Some(r#"{"a": 1}"#));
    insert_doc(&engine, 2, Some(r#"{"b":2,"a":1}"#));
    insert_doc(&engine, 3, Some(r#"{"a":1}"#));
    insert_doc(&engine, 4, Some(r#"{ "a" : 1 }"#));
    insert_doc(&engine, 5, None);
    engine
}

fn matching(engine: &Engine, filter: Value) -> Vec<i64> {
    let page = fetch(engine, "doc", &QueryDescriptor::new().with_filter(filter)).unwrap();
    ids(&page)
}

/// Every id reached by following `endCursor` `k` rows at a time
fn walk_forward(engine: &Engine, order_by: &[&str], k: i64) -> Vec<i64> {
    let mut seen = vec![];
    let mut after: Option<String> = None;
    for _ in 0..20 {
        let mut desc = QueryDescriptor::new().with_order_by(order_by).with_first(k);
        desc.after = after.clone();
        let page = fetch(engine, "doc", &desc).unwrap();
        seen.extend(ids(&page));
        if !page.page_info.has_next_page {
            return seen;
        }
        after = page.page_info.end_cursor.clone();
    }
    panic!("pagination did not terminate, saw {:?}", seen);
}

fn walk_backward(engine: &Engine, order_by: &[&str], k: i64) -> Vec<i64> {
    let mut pages = vec![];
    let mut before: Option<String> = None;
    for _ in 0..20 {
        let mut desc = QueryDescriptor::new().with_order_by(order_by).with_last(k);
        desc.before = before.clone();
        let page = fetch(engine, "doc", &desc).unwrap();
        pages.push(ids(&page));
        if !page.page_info.has_previous_page {
            pages.reverse();
            return pages.concat();
        }
        before = page.page_info.start_cursor.clone();
    }
    panic!("pagination did not terminate, saw {:?}", pages);
}

#[test]
fn test_equality_ignores_whitespace() {
    let engine = seeded();
    assert_eq!(matching(&engine, json!({"meta": {"equalTo": {"a": 1}}})), vec![1, 3, 4]);
    assert_eq!(matching(&engine, json!({"meta": {"notEqualTo": {"a": 1}}})), vec![2]);
    assert_eq!(matching(&engine, json!({"meta": {"distinctFrom": {"a": 1}}})), vec![2, 5]);
    assert_eq!(
        matching(&engine, json!({"meta": {"notDistinctFrom": {"a": 1}}})),
        vec![1, 3, 4]
    );
    assert_eq!(matching(&engine, json!({"meta": {"isNull": true}})), vec![5]);
}

#[test]
fn test_key_order_of_operand_is_kept() {
    let engine = seeded();
    assert_eq!(matching(&engine, json!({"meta": {"equalTo": {"b": 2, "a": 1}}})), vec![2]);
}

#[test]
fn test_condition_on_json() {
    let engine = seeded();
    let page = fetch(
        &engine,
        "doc",
        &QueryDescriptor::new().with_condition(json!({"meta": {"a": 1}})),
    )
    .unwrap();
    assert_eq!(ids(&page), vec![1, 3, 4]);
}

#[test]
fn test_nodes_carry_parsed_documents() {
    let engine = seeded();
    let page = fetch(&engine, "doc", &QueryDescriptor::new()).unwrap();
    assert_eq!(page.nodes[1]["meta"], json!({"b": 2, "a": 1}));
    assert_eq!(page.nodes[3]["meta"], json!({"a": 1}));
    assert_eq!(page.nodes[4]["meta"], Value::Null);
}

#[test]
fn test_walk_over_json_sort_key() {
    let engine = seeded();

    // ties on the document are broken by the primary key
    let asc = vec![1, 3, 4, 2, 5];
    let full = fetch(&engine, "doc", &QueryDescriptor::new().with_order_by(&["META_ASC"])).unwrap();
    assert_eq!(ids(&full), asc);
    for k in [1, 2, 5] {
        assert_eq!(walk_forward(&engine, &["META_ASC"], k), asc, "first {}", k);
        assert_eq!(walk_backward(&engine, &["META_ASC"], k), asc, "last {}", k);
    }

    let desc = vec![5, 2, 1, 3, 4];
    assert_eq!(walk_forward(&engine, &["META_DESC"], 1), desc);
    assert_eq!(walk_backward(&engine, &["META_DESC"], 2), desc);
}

#[test]
fn test_total_count_with_json_cursor() {
    let engine = seeded();
    let first = fetch(
        &engine,
        "doc",
        &QueryDescriptor::new().with_order_by(&["META_ASC"]).with_first(2),
    )
    .unwrap();
    assert_eq!(ids(&first), vec![1, 3]);

    let cursor = first.page_info.end_cursor.clone().unwrap();
    let next = fetch(
        &engine,
        "doc",
        &QueryDescriptor::new()
            .with_order_by(&["META_ASC"])
            .with_first(2)
            .with_after(cursor),
    )
    .unwrap();
    assert_eq!(ids(&next), vec![4, 2]);
    assert!(next.page_info.has_previous_page);
    assert!(next.page_info.has_next_page);
    assert_eq!(next.total_count, 5);
}
