//! End-to-end table scenarios against the in-process service.
//!
//! Every test builds its own fixture and tears it down explicitly.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use ftable::prelude::*;
use pretty_assertions::assert_eq;

struct Fixture {
    ft: FusionTables<MemoryTransport>,
    id: String,
}

impl Fixture {
    async fn new() -> Self {
        let ft = FusionTables::new(MemoryTransport::new());
        let id = ft
            .create_table("test", schema())
            .await
            .expect("create table")
            .id()
            .to_string();
        Self { ft, id }
    }

    async fn table(&self) -> Table<'_, MemoryTransport> {
        self.ft.table(&self.id).await.expect("open table")
    }

    async fn teardown(self) {
        self.ft.drop_table(&self.id).await.expect("drop table");
        assert_eq!(self.ft.transport().table_count(), 0);
    }
}

fn schema() -> Schema {
    Schema::of(&[
        ("firstname", ColumnType::String),
        ("phone", ColumnType::Number),
        ("dob", ColumnType::Datetime),
        ("house", ColumnType::Location),
    ])
    .unwrap()
}

fn person(i: usize, house: Location) -> Row {
    Row::new()
        .with("firstname", format!("Person-{}", i))
        .with("phone", 12)
        .with("dob", Utc.with_ymd_and_hms(2010, 8, 10, 20, 15, 1).unwrap())
        .with("house", house)
}

fn scattered_house(i: usize) -> Location {
    let x = 180.0 - (i * 37 % 360) as f64;
    let y = 90.0 - (i * 53 % 180) as f64;
    Location::kml(x, y, 0.0)
}

fn people(n: usize) -> Vec<Row> {
    (0..n).map(|i| person(i, scattered_house(i))).collect()
}

#[tokio::test]
async fn formats_data_for_upload() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    let data = table
        .encode(&[Row::new()
            .with("firstname", "\\bob's pizza")
            .with("phone", 12)
            .with("dob", Utc.with_ymd_and_hms(2010, 8, 10, 20, 15, 1).unwrap())
            .with("house", "POINT(1,1)")])
        .unwrap();
    let row = &data[0];

    assert_eq!(row.get("'firstname'"), Some("'\\\\bob''s pizza'"));
    assert_eq!(row.get("'phone'"), Some("12"));
    assert_eq!(row.get("'dob'"), Some("'08-10-2010 20:15:01'"));
    assert_eq!(row.get("'house'"), Some("'POINT(1,1)'"));

    fixture.teardown().await;
}

#[tokio::test]
async fn inserts_one_row() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    let row = Row::new()
        .with("firstname", "\\bob's pizza-0")
        .with("phone", 12)
        .with("dob", Utc.with_ymd_and_hms(2010, 8, 10, 20, 15, 1).unwrap())
        .with("house", "<Point><coordinates>-74.006393,40.714172,0</coordinates></Point>");
    let ids = table.insert(&[row]).await.unwrap();

    assert_eq!(ids.len(), 1);
    let rows = table.select(&[]).await.unwrap();
    assert_eq!(rows[0]["firstname"], "\\bob's pizza-0");
    assert_eq!(
        rows[0]["house"],
        "<Point><coordinates>-74.006393,40.714172,0</coordinates></Point>"
    );

    fixture.teardown().await;
}

#[tokio::test]
async fn inserts_501_rows_in_two_requests() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;
    let before = fixture.ft.transport().request_count();

    let ids = table.insert(&people(501)).await.unwrap();

    assert_eq!(ids.len(), 501);
    assert_eq!(fixture.ft.transport().request_count() - before, 2);
    assert_eq!(table.count().await.unwrap(), 501);

    fixture.teardown().await;
}

#[tokio::test]
async fn counts_rows() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    table.insert(&people(2)).await.unwrap();
    assert_eq!(table.count().await.unwrap(), 2);

    fixture.teardown().await;
}

#[tokio::test]
async fn selects_rows_as_display_text() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    let data: Vec<Row> = (0..2).map(|i| person(i, Location::kml(1.0, 1.0, 0.0))).collect();
    table.insert(&data).await.unwrap();

    let expected: Vec<HashMap<String, String>> = (0..2)
        .map(|i| {
            HashMap::from([
                ("firstname".to_string(), format!("Person-{}", i)),
                ("phone".to_string(), "12".to_string()),
                ("dob".to_string(), "08-10-2010 20:15:01".to_string()),
                (
                    "house".to_string(),
                    "<Point><coordinates>1,1,0</coordinates></Point>".to_string(),
                ),
            ])
        })
        .collect();
    assert_eq!(table.select(&[]).await.unwrap(), expected);

    fixture.teardown().await;
}

#[tokio::test]
async fn truncates_and_starts_again() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;
    let data = people(2);

    table.insert(&data).await.unwrap();
    assert_eq!(table.count().await.unwrap(), 2);
    table.truncate().await.unwrap();
    assert_eq!(table.count().await.unwrap(), 0);
    table.insert(&data).await.unwrap();
    assert_eq!(table.count().await.unwrap(), 2);

    fixture.teardown().await;
}

#[tokio::test]
async fn finds_rowids_by_filter() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    table.insert(&people(2)).await.unwrap();
    assert_eq!(table.count().await.unwrap(), 2);

    let rowids = table.rowids(&[("phone", 12.into())]).await.unwrap();
    assert_eq!(rowids.len(), 2);
    assert!(table.rowids(&[("phone", 13.into())]).await.unwrap().is_empty());

    fixture.teardown().await;
}

#[tokio::test]
async fn updates_by_rowid() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    table.insert(&people(3)).await.unwrap();
    assert_eq!(table.count().await.unwrap(), 3);

    let rowids = table.rowids(&[("phone", 12.into())]).await.unwrap();
    assert_eq!(rowids.len(), 3);

    table.update(&rowids[..2], &[("phone", 99.into())]).await.unwrap();
    assert_eq!(table.count_where(&[("phone", 12.into())]).await.unwrap(), 1);
    assert_eq!(table.count_where(&[("phone", 99.into())]).await.unwrap(), 2);

    fixture.teardown().await;
}

#[tokio::test]
async fn rejects_mismatched_rows_before_sending() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;
    let before = fixture.ft.transport().request_count();

    let mut data = people(3);
    data[2].set("phone", "twelve");
    let err = table.insert(&data).await.unwrap_err();

    assert!(matches!(
        err,
        FtError::TypeMismatch { ref column, expected: ColumnType::Number, .. } if column == "phone"
    ));
    assert_eq!(fixture.ft.transport().request_count(), before);
    assert_eq!(table.count().await.unwrap(), 0);

    fixture.teardown().await;
}

#[tokio::test]
async fn filters_by_string_with_quotes() {
    let fixture = Fixture::new().await;
    let table = fixture.table().await;

    table
        .insert(&[
            Row::new().with("firstname", "bob's"),
            Row::new().with("firstname", "bob"),
        ])
        .await
        .unwrap();
    assert_eq!(table.count_where(&[("firstname", "bob's".into())]).await.unwrap(), 1);

    fixture.teardown().await;
}

#[tokio::test]
async fn tables_survive_a_snapshot() {
    let path = std::env::temp_dir().join(format!("ftable-tables-{}.json", std::process::id()));

    let first = FusionTables::new(MemoryTransport::new());
    let id = first.create_table("test", schema()).await.unwrap().id().to_string();
    first.table(&id).await.unwrap().insert(&people(2)).await.unwrap();
    first.transport().save(&path).unwrap();

    let fixture = Fixture {
        ft: FusionTables::new(MemoryTransport::load(&path).unwrap()),
        id,
    };
    std::fs::remove_file(&path).unwrap();
    let table = fixture.table().await;
    assert_eq!(table.count().await.unwrap(), 2);
    table.insert(&people(1)).await.unwrap();
    assert_eq!(table.rowids(&[]).await.unwrap().last(), Some(&RowId::new("3")));

    fixture.teardown().await;
}
