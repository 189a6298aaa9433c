use serde_json::json;
use std::sync::Once;
use tabula::{
    Config, Datum, Document, FieldDef, FieldType, MemoryDriver, ModelConfig, Registry, document,
};

static INIT: Once = Once::new();

/// Route `log` output through the test harness once per binary.
#[allow(dead_code)]
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// `user` keyed by an auto-incremented id with a unique email, and `order`
/// keyed by `(user, number)`.
#[allow(dead_code)]
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .extend(
            "user",
            [
                ("id", FieldDef::from(FieldType::Integer)),
                ("name", FieldDef::try_from("string(64)").expect("name")),
                ("email", FieldDef::try_from("varchar(255)").expect("email")),
                ("age", FieldDef::try_from("int").expect("age")),
                (
                    "address.city",
                    FieldDef::try_from(&Datum::from(json!({"type": "string", "length": 32})))
                        .expect("city"),
                ),
            ],
            ModelConfig::new().auto_inc().unique(&["email"]),
        )
        .expect("user model");
    registry
        .extend(
            "order",
            [
                ("user", FieldDef::from(FieldType::Integer)),
                ("number", FieldDef::from(FieldType::Integer)),
                ("total", FieldDef::from(FieldType::Double)),
            ],
            ModelConfig::new()
                .composite(&["user", "number"])
                .foreign("user", "user", "id"),
        )
        .expect("order model");
    registry
}

#[allow(dead_code)]
pub fn driver() -> MemoryDriver {
    init_logging();
    MemoryDriver::new(registry(), Config::default())
}

#[allow(dead_code)]
pub fn strict_driver() -> MemoryDriver {
    init_logging();
    MemoryDriver::new(registry(), Config::strict())
}

#[allow(dead_code)]
pub fn user(name: &str, age: i64, city: &str) -> Document {
    document(json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "age": age,
        "address": {"city": city},
    }))
}

/// Users with random ages and distinct names.
#[allow(dead_code)]
pub fn random_users(count: usize) -> Vec<Document> {
    let cities = ["Oslo", "Lima", "Pune", "Kyiv"];
    (0..count)
        .map(|i| {
            let city = cities[fastrand::usize(..cities.len())];
            user(&format!("user{i}"), fastrand::i64(18..90), city)
        })
        .collect()
}

/// Insert every document into `table`, returning the stored records.
#[allow(dead_code)]
pub async fn seed(driver: &MemoryDriver, table: &str, rows: Vec<Document>) -> Vec<Document> {
    use tabula::Driver;

    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        created.push(driver.create(table, row).await.expect("create"));
    }
    created
}
