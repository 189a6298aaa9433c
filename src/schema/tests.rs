use crate::ast::{Datum, Document, document};
use crate::schema::{
    Field, FieldDef, FieldType, Internal, Model, ModelConfig, ModelError, Primary, Registry,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

fn user_fields() -> Vec<(&'static str, FieldDef)> {
    vec![
        ("id", FieldType::Integer.into()),
        ("name", "string(64)".parse::<Field>().unwrap().into()),
        ("email", FieldType::String.into()),
        ("profile.age", FieldType::Integer.into()),
        ("profile.bio", Field::new(FieldType::Text).nullable().into()),
        ("meta", FieldType::Json.into()),
        ("tags", FieldType::List.into()),
        ("opens", FieldType::Time.into()),
        (
            "profile.label",
            Internal::getter(|profile| {
                Datum::String(format!(
                    "{} years",
                    profile.get("age").cloned().unwrap_or_default()
                ))
            })
            .with_setter(|profile, value| {
                profile.insert("age".to_string(), value);
            })
            .into(),
        ),
    ]
}

fn user_model() -> Model {
    let mut model = Model::new("user");
    model
        .extend(user_fields(), ModelConfig::new().unique(&["email"]))
        .unwrap();
    model
}

#[test]
fn test_field_shorthand() {
    let field: Field = "string(64)".parse().unwrap();
    assert_eq!(field.ty, FieldType::String);
    assert_eq!(field.length, Some(64));
    assert_eq!(field.initial, Some(Datum::from("")));

    let field: Field = " decimal(10, 2) ".parse().unwrap();
    assert_eq!((field.precision, field.scale), (Some(10), Some(2)));
    assert_eq!(field.initial, Some(Datum::Decimal(Decimal::ZERO)));

    let field: Field = "list".parse().unwrap();
    assert_eq!(field.initial, Some(Datum::Array(vec![])));
}

#[test]
fn test_field_shorthand_rejects_garbage() {
    for source in ["blob", "string(", "string(x)", "string(1,2)", "decimal(1,2,3)", ""] {
        let err = source.parse::<Field>().unwrap_err();
        assert!(matches!(err, ModelError::InvalidField(_)), "{source}");
    }
}

#[test]
fn test_field_descriptor() {
    let field = Field::parse(&Datum::from(json!({
        "type": "integer",
        "nullable": true
    })))
    .unwrap();
    assert!(field.nullable);
    assert_eq!(field.initial, Some(Datum::Null));

    let field = Field::parse(&Datum::from(json!({"type": "boolean", "initial": true}))).unwrap();
    assert_eq!(field.initial_value(), Datum::Bool(true));

    assert!(Field::parse(&Datum::from(json!({"length": 3}))).is_err());
    assert!(Field::parse(&Datum::Int(1)).is_err());
}

#[test]
fn test_field_def_from_declarations() {
    let FieldDef::Field(field) = FieldDef::try_from("decimal(10,2)").unwrap() else {
        panic!("expected a field");
    };
    assert_eq!((field.ty, field.precision, field.scale), (FieldType::Decimal, Some(10), Some(2)));

    let descriptor = Datum::from(json!({"type": "text", "nullable": true}));
    let FieldDef::Field(field) = FieldDef::try_from(&descriptor).unwrap() else {
        panic!("expected a field");
    };
    assert_eq!(field.ty, FieldType::Text);
    assert_eq!(field.initial_value(), Datum::Null);

    assert!(matches!(FieldDef::try_from("blob"), Err(ModelError::InvalidField(_))));

    let mut model = Model::new("item");
    model
        .extend(
            [
                ("id", FieldDef::try_from("integer").unwrap()),
                ("label", FieldDef::try_from("string(16)").unwrap()),
            ],
            ModelConfig::new(),
        )
        .unwrap();
    assert_eq!(model.field("label").and_then(|f| f.length), Some(16));
    assert_eq!(
        model.create(&Document::new()).unwrap(),
        document(json!({"label": ""}))
    );
}

#[test]
fn test_type_defaults() {
    assert_eq!(Field::new(FieldType::Double).initial_value(), Datum::Float(0.0));
    assert_eq!(Field::new(FieldType::Boolean).initial_value(), Datum::Bool(false));
    assert_eq!(
        Field::new(FieldType::Json).initial_value(),
        Datum::Object(Document::new())
    );
    assert_eq!(Field::new(FieldType::Timestamp).initial_value(), Datum::Null);
}

#[test]
fn test_extend_requires_index_fields() {
    let mut model = Model::new("post");
    let err = model
        .extend([("title", FieldDef::from(FieldType::String))], ModelConfig::new())
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::MissingIndexField {
            table: "post".to_string(),
            key: "id".to_string()
        }
    );

    let err = model
        .extend(
            [("slug", FieldDef::from(FieldType::String))],
            ModelConfig::new().primary("slug").unique(&["missing"]),
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::MissingIndexField { key, .. } if key == "missing"));
}

#[test]
fn test_extend_merges_and_overrides() {
    let mut model = user_model();
    model
        .extend(
            [
                ("name", FieldDef::from(Field::new(FieldType::Text))),
                ("score", FieldDef::from(FieldType::Float)),
            ],
            ModelConfig::new().unique(&["email"]).composite(&["id", "email"]),
        )
        .unwrap();
    assert_eq!(model.field("name").map(|f| f.ty), Some(FieldType::Text));
    assert!(model.field("score").is_some());
    assert_eq!(model.unique().len(), 1);
    assert_eq!(
        model.primary(),
        &Primary::Composite(vec!["id".to_string(), "email".to_string()])
    );
}

#[test]
fn test_format_flattens_declared_paths() {
    let model = user_model();
    let flat = model
        .format(&document(json!({
            "name": "Ada",
            "profile": {"age": 36},
            "meta": {"anything": {"goes": true}}
        })))
        .unwrap();
    assert_eq!(
        flat,
        document(json!({
            "name": "Ada",
            "profile.age": 36,
            "meta": {"anything": {"goes": true}}
        }))
    );
}

#[test]
fn test_format_rejects_unknown_field() {
    let model = user_model();
    let err = model.format(&document(json!({"unknownField": 1}))).unwrap_err();
    assert!(err.to_string().contains("unknown field \"unknownField\""));

    let err = model
        .format(&document(json!({"profile": {"height": 1}})))
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::UnknownField {
            table: "user".to_string(),
            path: "profile.height".to_string()
        }
    );
}

#[test]
fn test_format_lenient_keeps_unknown_paths() {
    let model = user_model();
    let flat = model.format_lenient(&document(json!({"name": "x", "extra": 1})));
    assert_eq!(flat, document(json!({"name": "x", "extra": 1})));
}

#[test]
fn test_json_sub_paths_resolve() {
    let model = user_model();
    assert_eq!(
        model.resolve_path("meta.a.b").map(|f| f.ty),
        Some(FieldType::Json)
    );
    assert!(model.resolve_path("name.first").is_none());
    assert!(model.check_path("nope").is_err());
}

#[test]
fn test_create_fills_defaults() {
    let model = user_model();
    let record = model
        .create(&document(json!({"id": 7, "name": "Ada"})))
        .unwrap();
    assert_eq!(
        record,
        document(json!({
            "id": 7,
            "name": "Ada",
            "email": "",
            "profile": {"age": 0, "bio": null},
            "meta": {},
            "tags": [],
            "opens": null
        }))
    );
}

#[test]
fn test_create_without_key_leaves_it_out() {
    let model = user_model();
    let record = model.create(&Document::new()).unwrap();
    assert!(!record.contains_key("id"));
}

#[test]
fn test_parse_normalizes_time_of_day() {
    let model = user_model();
    let at = Utc.with_ymd_and_hms(2023, 9, 14, 8, 30, 15).unwrap();
    let mut flat = Document::new();
    flat.insert("opens".to_string(), Datum::Date(at));
    let record = model.parse(&flat);
    assert_eq!(
        record.get("opens"),
        Some(&Datum::Date(Utc.with_ymd_and_hms(1970, 1, 1, 8, 30, 15).unwrap()))
    );

    let record = model.parse(&document(json!({"opens": "17:05:00"})));
    assert_eq!(
        record.get("opens"),
        Some(&Datum::Date(Utc.with_ymd_and_hms(1970, 1, 1, 17, 5, 0).unwrap()))
    );
}

#[test]
fn test_format_parse_roundtrip() {
    let model = user_model();
    let record = document(json!({
        "id": 1,
        "name": "Grace",
        "email": "grace@example.com",
        "profile": {"age": 85, "bio": "admiral"},
        "meta": {"k": [1, 2]},
        "tags": ["cobol"],
        "opens": null
    }));
    let flat = model.format(&record).unwrap();
    assert_eq!(model.parse(&flat), model.create(&record).unwrap());
    assert_eq!(model.parse(&flat), record);
}

#[test]
fn test_resolve_data_fills_missing_with_null() {
    let model = user_model();
    let record = model.resolve_data(&document(json!({"id": 1, "name": "x"})), None);
    assert_eq!(record.get("email"), Some(&Datum::Null));
    assert_eq!(
        record.get("profile"),
        Some(&Datum::from(json!({"age": null, "bio": null})))
    );

    let projected = model.resolve_data(
        &document(json!({"id": 1, "profile": {"age": 3, "bio": "b"}})),
        Some(&["profile.age".to_string(), "email".to_string()]),
    );
    assert_eq!(
        projected,
        document(json!({"profile": {"age": 3}, "email": null}))
    );
}

#[test]
fn test_computed_accessors() {
    let model = user_model();
    let mut record = document(json!({"profile": {"age": 40}}));
    assert_eq!(
        model.get_computed(&record, "profile.label"),
        Ok(Datum::from("40 years"))
    );

    model
        .set_computed(&mut record, "profile.label", Datum::Int(41))
        .unwrap();
    assert_eq!(record, document(json!({"profile": {"age": 41}})));

    let err = model.get_computed(&record, "profile.nope").unwrap_err();
    assert!(matches!(err, ModelError::UnknownField { .. }));
}

#[test]
fn test_computed_fields_are_not_persisted() {
    let model = user_model();
    let flat = model
        .format(&document(json!({"profile": {"age": 1, "label": "ignored"}})))
        .unwrap();
    assert_eq!(flat, document(json!({"profile.age": 1})));
}

#[test]
fn test_read_only_computed_field() {
    let mut model = user_model();
    model
        .extend(
            [("display", FieldDef::from(Internal::getter(|_| Datum::from("user"))))],
            ModelConfig::new(),
        )
        .unwrap();
    let mut record = Document::new();
    assert_eq!(model.get_computed(&record, "display"), Ok(Datum::from("user")));
    assert_eq!(
        model.set_computed(&mut record, "display", Datum::Null),
        Err(ModelError::ReadOnlyField {
            table: "user".to_string(),
            path: "display".to_string()
        })
    );
}

#[test]
fn test_registry() {
    let mut registry = Registry::new();
    registry
        .extend("user", user_fields(), ModelConfig::new())
        .unwrap();
    registry
        .extend(
            "user",
            [("nickname", FieldDef::from(FieldType::String))],
            ModelConfig::new(),
        )
        .unwrap();
    let model = registry.resolve("user").unwrap();
    assert!(model.field("nickname").is_some());
    assert!(model.field("name").is_some());

    assert!(
        registry
            .extend(
                "user",
                [("x", FieldDef::from(FieldType::String))],
                ModelConfig::new().primary("missing"),
            )
            .is_err()
    );
    assert_eq!(registry.resolve("user").unwrap().primary_keys(), vec!["id"]);
    assert!(registry.resolve("user").unwrap().field("x").is_none());

    assert_eq!(
        registry.resolve("ghost").unwrap_err(),
        ModelError::UnknownTable("ghost".to_string())
    );
    assert_eq!(registry.tables().collect::<Vec<_>>(), vec!["user"]);
}
