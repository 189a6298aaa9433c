use crate::ast::{Datum, Document, document};
use crate::config::Mode;
use crate::eval::{Eval, FieldRef};
use crate::query::{FieldQuery, Query};
use crate::schema::{FieldDef, FieldType, Model, ModelConfig, ModelError};
use crate::selection::{Cursor, Direction, Filter, Projection, Row, Selection};
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

fn model(config: ModelConfig) -> Arc<Model> {
    let mut model = Model::new("item");
    model
        .extend(
            [
                ("id", FieldDef::from(FieldType::Integer)),
                ("x", FieldDef::from(FieldType::Integer)),
                ("y", FieldDef::from(FieldType::Integer)),
                ("name", FieldDef::from(FieldType::String)),
                ("price.amount", FieldDef::from(FieldType::Double)),
            ],
            config,
        )
        .unwrap();
    Arc::new(model)
}

fn select(filter: Filter) -> Selection {
    Selection::new(model(ModelConfig::new()), filter, Mode::Lenient).unwrap()
}

fn rows(values: serde_json::Value) -> Vec<Document> {
    match Datum::from(values) {
        Datum::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

#[test]
fn test_order_limit_offset() {
    let selection = select(Filter::All)
        .order_by("x", Direction::Asc)
        .limit(2)
        .offset(1);
    let out = selection
        .truncate(rows(json!([{"x": 3}, {"x": 1}, {"x": 2}])))
        .unwrap();
    assert_eq!(out, rows(json!([{"x": 2}, {"x": 3}])));
}

#[test]
fn test_multi_key_sort_is_stable() {
    let selection = select(Filter::All)
        .order_by("x", Direction::Desc)
        .order_by("y", Direction::Asc);
    let input = rows(json!([
        {"x": 1, "y": 2, "n": "a"},
        {"x": 2, "y": 9, "n": "b"},
        {"x": 1, "y": 1, "n": "c"},
        {"x": 2, "y": 9, "n": "d"},
        {"y": 0, "n": "e"}
    ]));
    let order = selection
        .truncate(input)
        .unwrap()
        .iter()
        .map(|row| row["n"].to_string())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["b", "d", "c", "a", "e"]);
}

#[test]
fn test_offset_past_end() {
    let selection = select(Filter::All).offset(10);
    assert!(selection.truncate(rows(json!([{"x": 1}]))).unwrap().is_empty());
}

#[test]
fn test_order_by_computed_key() {
    let selection = select(Filter::All).order_by_with(
        |row| Eval::subtract(Eval::lit(0), row.field("x")),
        Direction::Asc,
    );
    let out = selection
        .truncate(rows(json!([{"x": 1}, {"x": 3}, {"x": 2}])))
        .unwrap();
    assert_eq!(out, rows(json!([{"x": 3}, {"x": 2}, {"x": 1}])));
}

#[test]
fn test_key_shorthand_targets_primary_key() {
    let record = document(json!({"id": 5, "x": 1}));
    let by_key = select(Filter::from(5_i64));
    let by_query = select(Filter::Query(Query::field("id", FieldQuery::equal(5))));
    assert!(by_key.filter(&record).unwrap());
    assert_eq!(
        by_key.filter(&record).unwrap(),
        by_query.filter(&record).unwrap()
    );
    assert!(!select(Filter::from(6_i64)).filter(&record).unwrap());
    assert!(!select(Filter::Key(Datum::Null)).filter(&document(json!({"x": 1}))).unwrap());

    let keys = select(Filter::Keys(vec![Datum::Int(4), Datum::Int(5)]));
    assert!(keys.filter(&record).unwrap());
}

#[test]
fn test_key_shorthand_rejects_composite_key() {
    let composite = model(ModelConfig::new().composite(&["id", "x"]));
    let err = Selection::new(composite.clone(), Filter::from(5_i64), Mode::Lenient).unwrap_err();
    assert_eq!(err, ModelError::CompositePrimaryKey("item".to_string()));

    let pattern = Filter::Pattern(Regex::new("^a").unwrap());
    assert!(Selection::new(composite.clone(), pattern, Mode::Lenient).is_err());
    assert!(Selection::new(composite, Filter::All, Mode::Lenient).is_ok());
}

#[test]
fn test_callback_filter_uses_row_reference() {
    let selection = select(Filter::callback(|row| {
        Eval::gt(row.field("price.amount"), Eval::lit(10))
    }));
    assert!(selection.filter(&document(json!({"price": {"amount": 12.5}}))).unwrap());
    assert!(!selection.filter(&document(json!({"price": {"amount": 2}}))).unwrap());
}

#[test]
fn test_row_references_are_unique() {
    let a = select(Filter::All);
    let b = select(Filter::All);
    assert_ne!(a.plan().reference, b.plan().reference);
    assert_eq!(a.plan().reference.len(), 8);
    assert_eq!(
        a.row().field("x"),
        Eval::Field(FieldRef::new(Some(&a.plan().reference), "x"))
    );
}

#[test]
fn test_foreign_row_reference_is_undefined() {
    let selection = select(Filter::All);
    let other = Row::new("elsewhere");
    let selection = selection.project_with(|_| [("x", other.field("x"))]);
    let shaped = selection.reshape(&document(json!({"x": 1}))).unwrap();
    assert_eq!(shaped, document(json!({"x": null})));
}

#[test]
fn test_project_fields() {
    let selection = select(Filter::All).project(&["name", "price.amount"]).unwrap();
    assert_eq!(
        selection.plan().projection,
        Some(Projection::Fields(vec![
            "name".to_string(),
            "price.amount".to_string()
        ]))
    );
    let shaped = selection
        .reshape(&document(json!({"id": 1, "name": "pen", "price": {"amount": 2.0}})))
        .unwrap();
    assert_eq!(shaped, document(json!({"name": "pen", "price": {"amount": 2.0}})));
}

#[test]
fn test_project_rejects_unknown_field() {
    let err = select(Filter::All).project(&["nope"]).unwrap_err();
    assert!(matches!(err, ModelError::UnknownField { path, .. } if path == "nope"));
}

#[test]
fn test_project_with_computed_values() {
    let selection = select(Filter::All).project_with(|row| {
        vec![
            ("label", Eval::concat(vec![row.field("name"), Eval::lit("!")])),
            ("total.twice", Eval::multiply(vec![row.field("x"), Eval::lit(2)])),
        ]
    });
    let shaped = selection
        .reshape(&document(json!({"name": "pen", "x": 4})))
        .unwrap();
    assert_eq!(shaped, document(json!({"label": "pen!", "total": {"twice": 8}})));
}

#[test]
fn test_evaluate_aggregates_rows() {
    let evaluation = select(Filter::All).evaluate(|row| Eval::sum(row.field("x")));
    let data = rows(json!([{"x": 1}, {"x": 2}, {"x": 4}]));
    assert_eq!(evaluation.aggregate(&data), Ok(Datum::Int(7)));
}

#[test]
fn test_strict_filter_surfaces_errors() {
    let model = model(ModelConfig::new());
    let query = Query::parse(&Datum::from(json!({"x": {"$gt": 1}}))).unwrap();
    let strict = Selection::new(model, Filter::Query(query), Mode::Strict).unwrap();
    assert!(strict.filter(&document(json!({"x": "one"}))).is_err());
    assert_eq!(strict.filter(&document(json!({"y": 1}))), Ok(false));
}

#[test]
fn test_direction_from_str() {
    assert_eq!("DESC".parse::<Direction>(), Ok(Direction::Desc));
    assert_eq!("asc".parse::<Direction>(), Ok(Direction::Asc));
    assert!("up".parse::<Direction>().is_err());
}

#[test]
fn test_cursor_apply() {
    let cursor = Cursor::new()
        .fields(&["x"])
        .sort("x", Direction::Desc)
        .limit(1)
        .offset(1);
    let selection = cursor.apply(select(Filter::All)).unwrap();
    let modifier = &selection.plan().modifier;
    assert_eq!((modifier.limit, modifier.offset, modifier.sort.len()), (Some(1), 1, 1));

    let from_fields = Cursor::from(vec!["x", "y"]);
    assert_eq!(
        from_fields.fields,
        Some(vec!["x".to_string(), "y".to_string()])
    );
    assert!(Cursor::from(vec!["ghost"]).apply(select(Filter::All)).is_err());
}
