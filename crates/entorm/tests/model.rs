mod common;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::{MockExecutor, as_text, row};
use entorm::{Entity, Model, OperationKind, OrmError, Value};

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct User {
    #[orm(tag = "autoPk")]
    pub id: i64,
    pub name: String,
    pub age: i32,
    #[orm(tag = "dateTime")]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Entity)]
pub struct LogLine {
    pub level: String,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Sample {
    #[orm(tag = "autoPk")]
    pub id: i64,
    pub label: String,
    pub score: i32,
    pub hits: u16,
    pub active: bool,
    pub ratio: f64,
    pub recorded_at: NaiveDateTime,
    #[orm(tag = "date")]
    pub born_on: Option<NaiveDate>,
    #[orm(tag = "time")]
    pub alarm: Option<NaiveTime>,
}

#[derive(Debug, Default, Entity)]
pub struct Secretive {
    pub id: i64,
    token: String,
}

#[derive(Debug, Default, Entity)]
pub struct TwoKeys {
    #[orm(tag = "autoPk")]
    pub id: i64,
    #[orm(tag = "pk")]
    pub code: String,
}

#[derive(Debug, Default, Entity)]
pub struct NameCount {
    pub name: String,
    pub total: i64,
}

fn user_row(id: i64, name: &str, age: i32) -> entorm::RawRow {
    row(
        &["id", "name", "age", "created_at"],
        vec![
            Value::Text(id.to_string()),
            Value::Text(name.into()),
            Value::Text(age.to_string()),
            Value::Text("2021-06-01 08:30:00".into()),
        ],
    )
}

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[tokio::test]
async fn first_without_predicates_limits_to_one_row() {
    let db = MockExecutor::mysql();
    db.push_rows(vec![user_row(1, "tom", 30)]);

    let mut users = Model::new(&db, User::default()).unwrap();
    let user = users.first().await.unwrap().unwrap();

    let stmt = db.last();
    assert_eq!(stmt.sql, "SELECT * FROM `user` LIMIT 1;");
    assert!(stmt.params.is_empty());
    assert_eq!(
        user,
        User {
            id: 1,
            name: "tom".into(),
            age: 30,
            created_at: Some(dt("2021-06-01 08:30:00")),
        }
    );
}

#[tokio::test]
async fn first_returns_none_without_rows() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();
    assert!(users.eq("name", "nobody").first().await.unwrap().is_none());
}

#[tokio::test]
async fn chained_predicates_keep_order_and_bindings() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();

    let cursor = users
        .select(["id", "name"])
        .eq("name", "tom")
        .gt("age", 18)
        .lte("age", 65)
        .neq("id", 3)
        .like("name", "t%")
        .order_by("age")
        .order_by_desc("id")
        .get()
        .await
        .unwrap();
    assert!(cursor.into_vec().await.unwrap().is_empty());

    let stmt = db.last();
    assert_eq!(
        stmt.sql,
        "SELECT `id`, `name` FROM `user` WHERE `name` = ? AND `age` > ? AND `age` <= ? \
         AND `id` != ? AND `name` LIKE ? ORDER BY `age` ASC, `id` DESC;"
    );
    assert_eq!(
        stmt.params,
        vec![
            Value::Text("tom".into()),
            Value::Int(18),
            Value::Int(65),
            Value::Int(3),
            Value::Text("t%".into()),
        ]
    );
}

#[tokio::test]
async fn get_streams_all_rows() {
    let db = MockExecutor::mysql();
    db.push_rows(vec![user_row(1, "a", 20), user_row(2, "b", 21)]);

    let mut users = Model::new(&db, User::default()).unwrap();
    let mut cursor = users.lt("age", 50).get().await.unwrap();

    let mut names = Vec::new();
    while cursor.advance().await {
        names.push(cursor.take_current().unwrap().name);
    }
    assert!(cursor.error().is_none());
    assert_eq!(names, ["a", "b"]);
    assert_eq!(db.last().sql, "SELECT * FROM `user` WHERE `age` < ?;");
}

#[tokio::test]
async fn paginate_counts_then_fetches_page() {
    let db = MockExecutor::mysql();
    db.push_rows(vec![row(&["paginate"], vec![Value::Text("25".into())])]);
    db.push_rows(vec![user_row(11, "k", 40)]);

    let mut users = Model::new(&db, User::default()).unwrap();
    let cursor = users.gte("age", 18).order_by("id").paginate(2, 10).await.unwrap();
    assert_eq!(cursor.total(), 25);

    let statements = db.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].sql,
        "SELECT count(*) AS paginate FROM `user` WHERE `age` >= ?;"
    );
    assert_eq!(
        statements[1].sql,
        "SELECT * FROM `user` WHERE `age` >= ? ORDER BY `id` ASC LIMIT 10 OFFSET 10;"
    );
    assert_eq!(statements[0].params, statements[1].params);

    let page = cursor.into_vec().await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 11);
}

#[tokio::test]
async fn paginate_pair_edge_cases() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();

    let cursor = users.paginate(0, 10).await.unwrap();
    drop(cursor);
    assert_eq!(db.last().sql, "SELECT * FROM `user`;");

    let cursor = users.paginate(3, 0).await.unwrap();
    drop(cursor);
    assert_eq!(db.last().sql, "SELECT * FROM `user` LIMIT 1;");

    let cursor = users.paginate(1, 5).await.unwrap();
    assert_eq!(cursor.total(), 0);
    assert_eq!(db.last().sql, "SELECT * FROM `user` LIMIT 5 OFFSET 0;");

    let _cursor = users.page(2).await.unwrap();
    assert_eq!(db.last().sql, "SELECT * FROM `user` LIMIT 10 OFFSET 10;");
}

#[tokio::test]
async fn insert_skips_auto_key_and_unset_temporal() {
    let db = MockExecutor::mysql();
    db.push_result(1, Some(42));

    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().name = "tom".into();
    users.entity_mut().age = 30;

    assert_eq!(users.insert().await.unwrap(), 42);
    let stmt = db.last();
    assert_eq!(stmt.sql, "INSERT INTO `user` (`name`, `age`) VALUES (?, ?);");
    assert_eq!(stmt.params, vec![Value::Text("tom".into()), Value::Int(30)]);

    users.entity_mut().created_at = Some(dt("2020-02-03 04:05:06"));
    users.insert().await.unwrap();
    let stmt = db.last();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `user` (`name`, `age`, `created_at`) VALUES (?, ?, ?);"
    );
    assert_eq!(stmt.params[2], Value::Text("2020-02-03 04:05:06".into()));
}

#[tokio::test]
async fn insert_on_postgres_returns_generated_key() {
    let db = MockExecutor::postgres();
    db.push_rows(vec![row(&["id"], vec![Value::Int(7)])]);

    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().name = "ann".into();

    assert_eq!(users.insert().await.unwrap(), 7);
    assert_eq!(
        db.last().sql,
        "INSERT INTO \"user\" (\"name\", \"age\") VALUES ($1, $2) RETURNING \"id\";"
    );
}

#[tokio::test]
async fn update_requires_fields() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();

    let err = users.eq("id", 1).update(Vec::<&str>::new()).await.unwrap_err();
    assert!(matches!(err, OrmError::Update(_)));
    assert!(db.statements().is_empty());

    // the failed call still reset the clause state
    let stmt = users.build(OperationKind::Select).unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM `user`;");
}

#[tokio::test]
async fn update_falls_back_to_primary_key() {
    let db = MockExecutor::mysql();
    db.push_result(1, None);

    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().id = 7;
    users.entity_mut().name = "renamed".into();

    assert_eq!(users.update(["name", "unknown_column"]).await.unwrap(), 1);
    let stmt = db.last();
    assert_eq!(stmt.sql, "UPDATE `user` SET `name` = ? WHERE `id` = ?;");
    assert_eq!(stmt.params, vec![Value::Text("renamed".into()), Value::Int(7)]);
}

#[tokio::test]
async fn update_with_explicit_predicates() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().age = 31;

    users.eq("name", "tom").update(["age"]).await.unwrap();
    let stmt = db.last();
    assert_eq!(stmt.sql, "UPDATE `user` SET `age` = ? WHERE `name` = ?;");
    assert_eq!(stmt.params, vec![Value::Int(31), Value::Text("tom".into())]);
}

#[tokio::test]
async fn update_skips_unset_temporal() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().id = 1;

    let err = users.update(["created_at"]).await.unwrap_err();
    assert!(err.is_build_error());
}

#[tokio::test]
async fn delete_by_primary_key() {
    let db = MockExecutor::mysql();
    db.push_result(1, None);

    let mut users = Model::new(&db, User::default()).unwrap();
    users.entity_mut().id = 9;
    assert_eq!(users.delete().await.unwrap(), 1);

    let stmt = db.last();
    assert_eq!(stmt.sql, "DELETE FROM `user` WHERE `id` = ?;");
    assert_eq!(stmt.params, vec![Value::Int(9)]);
}

#[tokio::test]
async fn delete_without_key_or_predicate_is_unconditional() {
    let db = MockExecutor::mysql();
    db.push_result(3, None);

    let mut logs = Model::new(&db, LogLine::default()).unwrap();
    assert_eq!(logs.delete().await.unwrap(), 3);
    assert_eq!(db.last().sql, "DELETE FROM `log_line`;");

    logs.eq("level", "debug").delete().await.unwrap();
    assert_eq!(db.last().sql, "DELETE FROM `log_line` WHERE `level` = ?;");
}

#[tokio::test]
async fn terminals_reset_clause_state() {
    let db = MockExecutor::mysql();
    let mut users = Model::new(&db, User::default()).unwrap();

    users.select(["name"]).eq("age", 1).order_by("id").first().await.unwrap();
    assert_eq!(
        db.last().sql,
        "SELECT `name` FROM `user` WHERE `age` = ? ORDER BY `id` ASC LIMIT 1;"
    );
    assert!(users.statement().sql().is_empty());
    assert_eq!(users.clauses(), &entorm::ClauseBuilder::new());

    let _cursor = users.get().await.unwrap();
    assert_eq!(db.last().sql, "SELECT * FROM `user`;");
    assert!(db.last().params.is_empty());
}

#[tokio::test]
async fn build_inspects_without_executing() {
    let db = MockExecutor::postgres();
    let mut users = Model::new(&db, User::default()).unwrap();

    let stmt = users.eq("name", "tom").build(OperationKind::Count).unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT count(*) AS paginate FROM \"user\" WHERE \"name\" = $1;"
    );
    assert_eq!(stmt.bindings(), [Value::Text("tom".into())]);
    assert!(db.statements().is_empty());
}

#[tokio::test]
async fn build_update_uses_primary_key() {
    let db = MockExecutor::mysql();
    let user = User {
        id: 1,
        name: "x".into(),
        ..User::default()
    };
    let mut users = Model::new(&db, user).unwrap();

    let stmt = users.update_fields(["name"]).build(OperationKind::Update).unwrap();
    assert_eq!(stmt.sql(), "UPDATE `user` SET `name` = ? WHERE `id` = ?;");
    assert_eq!(stmt.bindings(), [Value::Text("x".into()), Value::Int(1)]);
    assert!(db.statements().is_empty());

    // build resets the clauses
    assert!(matches!(
        users.build(OperationKind::Update),
        Err(OrmError::Update(_))
    ));
}

#[tokio::test]
async fn round_trip_every_semantic_type() {
    let db = MockExecutor::mysql();
    db.push_result(1, Some(5));

    let original = Sample {
        id: 0,
        label: "probe".into(),
        score: -12,
        hits: 65_000,
        active: true,
        ratio: 0.25,
        recorded_at: dt("2022-11-30 23:59:58"),
        born_on: NaiveDate::from_ymd_opt(1999, 12, 31),
        alarm: NaiveTime::from_hms_opt(6, 45, 0),
    };
    let mut samples = Model::new(&db, original.clone()).unwrap();
    let id = samples.insert().await.unwrap();

    let insert = db.last();
    assert_eq!(
        insert.sql,
        "INSERT INTO `sample` (`label`, `score`, `hits`, `active`, `ratio`, `recorded_at`, \
         `born_on`, `alarm`) VALUES (?, ?, ?, ?, ?, ?, ?, ?);"
    );
    assert_eq!(insert.params[6], Value::Text("1999-12-31".into()));
    assert_eq!(insert.params[7], Value::Text("06:45:00".into()));

    // feed the stored values back the way a text-protocol driver reports them
    let mut values = vec![Value::Text(id.to_string())];
    values.extend(insert.params.iter().map(as_text));
    db.push_rows(vec![row(
        &[
            "id",
            "label",
            "score",
            "hits",
            "active",
            "ratio",
            "recorded_at",
            "born_on",
            "alarm",
        ],
        values,
    )]);

    let fetched = samples.eq("id", id).first().await.unwrap().unwrap();
    assert_eq!(fetched, Sample { id: 5, ..original });
}

#[tokio::test]
async fn bad_temporal_text_surfaces_as_cursor_error() {
    let db = MockExecutor::mysql();
    db.push_rows(vec![row(
        &["id", "created_at"],
        vec![Value::Int(1), Value::Text("31/12/1999".into())],
    )]);

    let mut users = Model::new(&db, User::default()).unwrap();
    let mut cursor = users.get().await.unwrap();
    assert!(!cursor.advance().await);
    match cursor.error() {
        Some(OrmError::Decode { column, .. }) => assert_eq!(column, "created_at"),
        other => panic!("expected decode error, got {other:?}"),
    }

    db.push_rows(vec![row(&["created_at"], vec![Value::Text("junk".into())])]);
    assert!(users.first().await.is_err());
}

#[tokio::test]
async fn query_cursor_maps_projections() {
    let db = MockExecutor::mysql();
    db.push_rows(vec![
        row(&["name", "total"], vec![Value::Text("tom".into()), Value::Int(3)]),
        row(&["name", "total"], vec![Value::Text("ann".into()), Value::Int(1)]),
    ]);

    let counts = Model::new(&db, NameCount::default()).unwrap();
    let sql = "SELECT name, count(*) AS total FROM user WHERE age > ? GROUP BY name;";
    let rows = counts
        .query_cursor(sql, &[Value::Int(18)])
        .await
        .unwrap()
        .into_vec()
        .await
        .unwrap();

    let pairs: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.total)).collect();
    assert_eq!(pairs, [("tom", 3), ("ann", 1)]);
    assert_eq!(db.last().sql, sql);
    assert_eq!(db.last().params, vec![Value::Int(18)]);
}

#[tokio::test]
async fn raw_exec_passes_through() {
    let db = MockExecutor::mysql();
    db.push_result(2, None);

    let logs = Model::new(&db, LogLine::default()).unwrap();
    let result = logs
        .exec("UPDATE log_line SET level = ?;", &[Value::Text("info".into())])
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 2);
    assert_eq!(db.last().params, vec![Value::Text("info".into())]);
}

#[test]
fn extraction_rejects_private_fields() {
    let db = MockExecutor::mysql();
    let err = Model::new(&db, Secretive::default()).err().unwrap();
    assert!(err.is_entity_shape());
    assert!(err.to_string().contains("token"));
}

#[test]
fn extraction_rejects_second_primary_key() {
    let db = MockExecutor::mysql();
    let err = Model::new(&db, TwoKeys::default()).err().unwrap();
    assert!(err.is_entity_shape());
}

#[test]
fn extraction_names_table_and_columns() {
    let db = MockExecutor::mysql();
    let samples = Model::new(&db, Sample::default()).unwrap();
    let meta = samples.meta();
    assert_eq!(meta.table(), "sample");
    assert_eq!(meta.primary_key().unwrap().column, "id");
    assert_eq!(
        meta.field("born_on").unwrap().temporal,
        entorm::TemporalKind::Date
    );
    assert_eq!(
        meta.field("recorded_at").unwrap().temporal,
        entorm::TemporalKind::DateTime
    );
}
