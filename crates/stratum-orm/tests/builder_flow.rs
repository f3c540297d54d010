//! Builder terminals, global scopes, and mutation flows against the
//! scripted driver.

mod common;

use common::{row, FakeDriver};
use futures::executor::block_on;
use stratum_orm::{Database, OrmError, RecordType, Row, SetValue};
use stratum_sql::{BuildError, Grammar, QueryPlan, SqliteGrammar, Value};

fn user_type() -> RecordType {
    RecordType::new("User", "users")
}

fn database(driver: FakeDriver, record_type: RecordType) -> Database {
    let mut db = Database::new(driver, SqliteGrammar::new());
    db.register(record_type);
    db
}

#[test]
fn global_scope_applies_to_every_terminal() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![row(&[("aggregate", Value::Int(3))])]);
    driver.push_rows(vec![]);

    let db = database(
        driver.clone(),
        user_type().with_scope_fn("active", |q| q.where_eq("active", true)),
    );
    let query = db.query("User").unwrap();

    // The same builder serves count then get; both see the scoped plan.
    let count = block_on(query.count()).unwrap();
    let records = block_on(query.get()).unwrap();

    assert_eq!(count, 3);
    assert!(records.is_empty());

    let log = driver.log();
    assert_eq!(
        log[0].0,
        "select count(*) as \"aggregate\" from \"users\" where \"active\" = ?"
    );
    assert_eq!(log[1].0, "select * from \"users\" where \"active\" = ?");
}

#[test]
fn removed_scope_compiles_as_if_never_applied() {
    let driver = FakeDriver::new();
    let db = database(
        driver,
        user_type()
            .with_scope_fn("active", |q| q.where_eq("active", true))
            .with_scope_fn("recent", |q| q.where_op("id", stratum_sql::Operator::Gt, 100_i64)),
    );

    let grammar = SqliteGrammar::new();
    let scoped = db
        .query("User")
        .unwrap()
        .without_global_scope("active")
        .apply_scopes();
    let never_had = grammar.compile_select(
        &QueryPlan::new("users").where_op("id", stratum_sql::Operator::Gt, 100_i64),
    );

    assert_eq!(grammar.compile_select(&scoped), never_had);
}

#[test]
fn without_global_scopes_removes_everything() {
    let driver = FakeDriver::new();
    let db = database(
        driver,
        user_type().with_scope_fn("active", |q| q.where_eq("active", true)),
    );

    let grammar = SqliteGrammar::new();
    let scoped = db.query("User").unwrap().without_global_scopes().apply_scopes();
    assert_eq!(
        grammar.compile_select(&scoped),
        grammar.compile_select(&QueryPlan::new("users"))
    );
}

#[test]
fn scope_application_leaves_builder_reusable() {
    let driver = FakeDriver::new();
    let db = database(
        driver.clone(),
        user_type().with_scope_fn("active", |q| q.where_eq("active", true)),
    );
    let query = db.query("User").unwrap();

    let first = query.apply_scopes();
    let second = query.apply_scopes();
    // Applying twice never stacks the scope.
    assert_eq!(first, second);
    assert!(query.plan().wheres.is_empty());
}

#[test]
fn first_applies_limit_one() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![row(&[("id", Value::Int(1))])]);

    let db = database(driver.clone(), user_type());
    let record = block_on(db.query("User").unwrap().first()).unwrap();

    assert!(record.is_some());
    assert_eq!(driver.log()[0].0, "select * from \"users\" limit 1");
}

#[test]
fn find_constrains_on_primary_key() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![]);

    let db = database(driver.clone(), user_type().primary_key("uid"));
    let record = block_on(db.query("User").unwrap().find(9_i64)).unwrap();

    assert!(record.is_none());
    assert_eq!(
        driver.log()[0].0,
        "select * from \"users\" where \"uid\" = ? limit 1"
    );
}

#[test]
fn find_or_fail_reports_record_not_found() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![]);

    let db = database(driver, user_type());
    let err = block_on(db.query("User").unwrap().find_or_fail(9_i64)).unwrap_err();
    assert!(matches!(err, OrmError::RecordNotFound { .. }));
}

#[test]
fn find_many_with_empty_ids_never_queries() {
    let driver = FakeDriver::new();
    let db = database(driver.clone(), user_type());

    let records = block_on(db.query("User").unwrap().find_many(Vec::new())).unwrap();
    assert!(records.is_empty());
    assert!(driver.log().is_empty());
}

#[test]
fn try_where_rejects_unsupported_operator_at_build_time() {
    let driver = FakeDriver::new();
    let db = database(driver.clone(), user_type());

    let err = db.query("User").unwrap().try_where("age", "=>", 10_i64);
    match err {
        Err(OrmError::Build(BuildError::InvalidOperator(op))) => assert_eq!(op, "=>"),
        other => panic!("expected invalid operator, got {:?}", other.map(|_| ())),
    }
    // Nothing reached the driver.
    assert!(driver.log().is_empty());
}

#[test]
fn empty_insert_is_a_no_op() {
    let driver = FakeDriver::new();
    let db = database(driver.clone(), user_type());

    let affected = block_on(db.query("User").unwrap().insert(Vec::new())).unwrap();
    assert_eq!(affected, 0);
    assert!(driver.log().is_empty());
}

#[test]
fn batch_insert_compiles_and_executes() {
    let driver = FakeDriver::new();
    driver.set_affected(2);

    let db = database(driver.clone(), user_type());
    let rows: Vec<Row> = vec![
        row(&[("name", Value::Text(String::from("Ada")))]),
        row(&[("name", Value::Text(String::from("Brian")))]),
    ];
    let affected = block_on(db.query("User").unwrap().insert(rows)).unwrap();

    assert_eq!(affected, 2);
    let log = driver.log();
    assert_eq!(
        log[0].0,
        "insert into \"users\" (\"name\") values (?), (?)"
    );
}

#[test]
fn inconsistent_batch_columns_fail_before_the_driver() {
    let driver = FakeDriver::new();
    let db = database(driver.clone(), user_type());

    let rows: Vec<Row> = vec![
        row(&[("name", Value::Text(String::from("Ada")))]),
        row(&[("email", Value::Text(String::from("b@x")))]),
    ];
    let err = block_on(db.query("User").unwrap().insert(rows)).unwrap_err();

    assert!(matches!(
        err,
        OrmError::Build(BuildError::InconsistentBatchColumns { .. })
    ));
    assert!(driver.log().is_empty());
}

#[test]
fn insert_get_id_returns_generated_id() {
    let driver = FakeDriver::new();
    driver.set_affected(1);
    driver.set_last_insert_id(Value::Int(42));

    let db = database(driver, user_type());
    let id = block_on(
        db.query("User")
            .unwrap()
            .insert_get_id(row(&[("name", Value::Text(String::from("Ada")))])),
    )
    .unwrap();

    assert_eq!(id, Value::Int(42));
}

#[test]
fn update_emits_value_bindings_before_where_bindings() {
    let driver = FakeDriver::new();
    driver.set_affected(1);

    let db = database(driver.clone(), user_type());
    block_on(
        db.query("User")
            .unwrap()
            .where_eq("id", 7_i64)
            .update(vec![(
                String::from("name"),
                SetValue::value("Ada"),
            )]),
    )
    .unwrap();

    let log = driver.log();
    assert_eq!(
        log[0].0,
        "update \"users\" set \"name\" = ? where \"id\" = ?"
    );
    assert_eq!(
        log[0].1,
        vec![Value::Text(String::from("Ada")), Value::Int(7)]
    );
}

#[test]
fn timestamped_type_stamps_inserts_and_updates() {
    let driver = FakeDriver::new();
    driver.set_affected(1);

    let db = database(driver.clone(), user_type().with_timestamps());
    block_on(
        db.query("User")
            .unwrap()
            .insert(vec![row(&[("name", Value::Text(String::from("Ada")))])]),
    )
    .unwrap();
    block_on(
        db.query("User")
            .unwrap()
            .where_eq("id", 1_i64)
            .update(vec![(String::from("name"), SetValue::value("Ada"))]),
    )
    .unwrap();

    let log = driver.log();
    assert_eq!(
        log[0].0,
        "insert into \"users\" (\"created_at\", \"name\", \"updated_at\") values (?, ?, ?)"
    );
    assert!(log[1].0.starts_with("update \"users\" set \"updated_at\" = ?, \"name\" = ?"));
}

#[test]
fn increment_uses_a_raw_assignment() {
    let driver = FakeDriver::new();
    driver.set_affected(1);

    let db = database(driver.clone(), user_type());
    block_on(
        db.query("User")
            .unwrap()
            .where_eq("id", 1_i64)
            .increment("votes", 1),
    )
    .unwrap();

    let log = driver.log();
    assert_eq!(
        log[0].0,
        "update \"users\" set \"votes\" = \"votes\" + 1 where \"id\" = ?"
    );
    assert_eq!(log[0].1, vec![Value::Int(1)]);
}

#[test]
fn delete_compiles_with_scopes() {
    let driver = FakeDriver::new();
    driver.set_affected(4);

    let db = database(
        driver.clone(),
        user_type().with_scope_fn("active", |q| q.where_eq("active", true)),
    );
    let affected = block_on(db.query("User").unwrap().delete()).unwrap();

    assert_eq!(affected, 4);
    assert_eq!(
        driver.log()[0].0,
        "delete from \"users\" where \"active\" = ?"
    );
}

#[test]
fn driver_failure_surfaces_sql_and_bindings() {
    let driver = FakeDriver::new();
    driver.fail_next("no such table: users");

    let db = database(driver, user_type());
    let err = block_on(db.query("User").unwrap().where_eq("id", 1_i64).get()).unwrap_err();

    match err {
        OrmError::QueryExecution { sql, bindings, source } => {
            assert_eq!(sql, "select * from \"users\" where \"id\" = ?");
            assert_eq!(bindings, vec![Value::Int(1)]);
            assert_eq!(source.message, "no such table: users");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn exists_reads_the_probe_column() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![row(&[("exists", Value::Int(1))])]);

    let db = database(driver.clone(), user_type());
    let exists = block_on(db.query("User").unwrap().exists()).unwrap();

    assert!(exists);
    assert_eq!(
        driver.log()[0].0,
        "select exists(select * from \"users\") as \"exists\""
    );
}

#[test]
fn aggregates_read_the_aggregate_column() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![row(&[("aggregate", Value::Int(97))])]);
    driver.push_rows(vec![row(&[("aggregate", Value::Null)])]);

    let db = database(driver.clone(), user_type());
    let max = block_on(db.query("User").unwrap().max("age")).unwrap();
    let min = block_on(db.query("User").unwrap().min("age")).unwrap();

    assert_eq!(max, Some(Value::Int(97)));
    assert_eq!(min, None);
    assert_eq!(
        driver.log()[0].0,
        "select max(\"age\") as \"aggregate\" from \"users\""
    );
}

#[test]
fn paginate_returns_the_envelope() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![row(&[("aggregate", Value::Int(31))])]);
    driver.push_rows(vec![row(&[("id", Value::Int(16))])]);

    let db = database(driver.clone(), user_type());
    let page = block_on(db.query("User").unwrap().paginate(2, 15)).unwrap();

    assert_eq!(page.total, 31);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.last_page, 3);
    assert_eq!(page.records.len(), 1);
    assert_eq!(
        driver.log()[1].0,
        "select * from \"users\" limit 15 offset 15"
    );
}

#[test]
fn pluck_and_value_project_one_column() {
    let driver = FakeDriver::new();
    driver.push_rows(vec![
        row(&[("name", Value::Text(String::from("Ada")))]),
        row(&[("name", Value::Text(String::from("Brian")))]),
    ]);
    driver.push_rows(vec![row(&[("name", Value::Text(String::from("Ada")))])]);

    let db = database(driver.clone(), user_type());
    let names = block_on(db.query("User").unwrap().pluck("name")).unwrap();
    let first = block_on(db.query("User").unwrap().value("name")).unwrap();

    assert_eq!(
        names,
        vec![
            Value::Text(String::from("Ada")),
            Value::Text(String::from("Brian"))
        ]
    );
    assert_eq!(first, Some(Value::Text(String::from("Ada"))));
    assert_eq!(driver.log()[0].0, "select \"name\" from \"users\"");
}

#[test]
fn unknown_record_type_fails_at_query_build() {
    let driver = FakeDriver::new();
    let db = database(driver, user_type());
    assert!(matches!(
        db.query("Ghost").map(|_| ()),
        Err(OrmError::UnknownRecordType(_))
    ));
}
