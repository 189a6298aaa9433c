use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use tabula::{
    Config, Datum, Direction, Document, Driver, Eval, FieldDef, FieldType, Filter, MemoryDriver,
    Mode, ModelConfig, Query, Registry, document, execute_aggr, execute_eval, execute_query,
};
use tokio::runtime::Runtime;

fn random_rows(count: usize) -> Vec<Document> {
    let cities = ["Oslo", "Lima", "Pune"];
    (0..count)
        .map(|i| {
            let city = cities[fastrand::usize(..cities.len())];
            document(json!({
                "id": i,
                "name": format!("user{i}"),
                "age": fastrand::i64(18..90),
                "address": {"city": city},
            }))
        })
        .collect()
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .extend(
            "user",
            [
                ("id", FieldDef::from(FieldType::Integer)),
                ("name", FieldDef::from(FieldType::String)),
                ("age", FieldDef::from(FieldType::Integer)),
                ("address.city", FieldDef::from(FieldType::String)),
            ],
            ModelConfig::new(),
        )
        .unwrap();
    registry
}

fn bench_query(c: &mut Criterion) {
    let rows = random_rows(1000);
    let query = Query::parse(&Datum::from(json!({
        "address": {"city": {"$in": ["Oslo", "Pune"]}},
        "age": {"$gte": 30, "$lt": 60},
        "name": {"$regex": "^user1"},
    })))
    .unwrap();

    c.bench_function("query_match_1000_rows", |b| {
        b.iter(|| {
            let mut matched = 0;
            for row in &rows {
                if execute_query(row, black_box(&query), None, Mode::Lenient).unwrap() {
                    matched += 1;
                }
            }
            black_box(matched)
        });
    });
}

fn bench_eval(c: &mut Criterion) {
    let rows = random_rows(1000);
    let expr = Eval::if_else(
        Eval::gt(Eval::field("age"), Eval::lit(40)),
        Eval::concat(vec![Eval::field("name"), Eval::lit("-senior")]),
        Eval::multiply(vec![Eval::field("age"), Eval::lit(2)]),
    );

    c.bench_function("eval_row_expression", |b| {
        b.iter(|| {
            for row in &rows {
                black_box(execute_eval(row, black_box(&expr)).unwrap());
            }
        });
    });

    let sum = Eval::sum(Eval::field("age"));
    c.bench_function("eval_aggregate_sum", |b| {
        b.iter(|| black_box(execute_aggr(&rows, black_box(&sum)).unwrap()));
    });

    let count = Eval::count(Eval::field("address.city"));
    c.bench_function("eval_aggregate_distinct_count", |b| {
        b.iter(|| black_box(execute_aggr(&rows, black_box(&count)).unwrap()));
    });
}

fn bench_selection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let driver = MemoryDriver::new(registry(), Config::default());
    rt.block_on(async {
        for row in random_rows(500) {
            driver.create("user", row).await.unwrap();
        }
    });

    c.bench_function("selection_sort_page", |b| {
        b.iter(|| {
            rt.block_on(async {
                let rows = driver
                    .select("user", Filter::All)
                    .unwrap()
                    .order_by("age", Direction::Desc)
                    .order_by("name", Direction::Asc)
                    .offset(20)
                    .limit(10)
                    .execute(&driver)
                    .await;
                black_box(rows).unwrap();
            });
        });
    });

    c.bench_function("selection_evaluate_avg", |b| {
        b.iter(|| {
            rt.block_on(async {
                let value = driver
                    .select("user", Filter::All)
                    .unwrap()
                    .evaluate(|row| Eval::avg(row.field("age")))
                    .execute(&driver)
                    .await;
                black_box(value).unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_query, bench_eval, bench_selection);
criterion_main!(benches);
