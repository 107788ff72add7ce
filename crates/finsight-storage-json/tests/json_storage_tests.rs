use std::fs;

use chrono::{TimeZone, Utc};
use finsight_core::{FixedClock, InsightService, LedgerStore};
use finsight_config::InsightSettings;
use finsight_domain::{Category, CategoryKind, Ledger, Transaction, TransactionStatus};
use finsight_storage_json::JsonLedgerStore;
use tempfile::tempdir;
use uuid::Uuid;

#[test]
fn missing_files_read_as_empty_collections() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::new(dir.path().join("data")).expect("create store");

    assert!(store.categories().expect("categories").is_empty());
    assert!(store.transactions().expect("transactions").is_empty());
    assert!(store.insights().expect("insights").is_none());
}

#[test]
fn upserts_are_keyed_by_id_and_atomic() {
    let dir = tempdir().expect("tempdir");
    let mut store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");

    let mut rent = Category::new("Rent", CategoryKind::Expense);
    store.upsert_category(rent.clone()).expect("insert");
    rent.monthly_limit = Some(1400.0);
    store.upsert_category(rent.clone()).expect("update");

    let loaded = store.categories().expect("categories");
    assert_eq!(loaded, vec![rent.clone()]);

    let raw = fs::read_to_string(store.categories_path()).expect("read file");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert!(json.get(rent.id.to_string()).is_some());
    assert!(!store.categories_path().with_extension("json.tmp").exists());

    store.remove_category(rent.id).expect("remove");
    let err = store.remove_category(rent.id).expect_err("already removed");
    assert!(err.is_not_found());
}

#[test]
fn batch_upsert_replaces_the_file_once() {
    let dir = tempdir().expect("tempdir");
    let mut store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");
    let groceries = Uuid::new_v4();
    let day = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();

    store.upsert_transactions(Vec::new()).expect("empty batch");
    assert!(!store.transactions_path().exists());

    let first = Transaction::completed_expense(12.0, groceries, day);
    store.upsert_transaction(first.clone()).expect("single");
    let original = fs::read_to_string(store.transactions_path()).expect("read original");

    let batch = vec![
        Transaction::completed_expense(20.0, groceries, day),
        Transaction::completed_expense(30.0, groceries, day),
    ];
    fs::create_dir_all(store.transactions_path().with_extension("json.tmp")).expect("block tmp");
    store
        .upsert_transactions(batch.clone())
        .expect_err("tmp path is a directory");
    let current = fs::read_to_string(store.transactions_path()).expect("read after failure");
    assert_eq!(original, current, "a failed batch writes nothing");

    fs::remove_dir(store.transactions_path().with_extension("json.tmp")).expect("unblock tmp");
    store.upsert_transactions(batch).expect("batch");
    assert_eq!(store.transactions().expect("transactions").len(), 3);
}

#[test]
fn tolerates_epoch_millis_and_plain_dates() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");
    let id = Uuid::new_v4();
    let category = Uuid::new_v4();
    let other = Uuid::new_v4();
    let raw = format!(
        r#"{{
            "{id}": {{
                "id": "{id}", "amount": 12.5, "type": "EXPENSE", "categoryId": "{category}",
                "createdAt": 1717200000000, "status": "COMPLETED"
            }},
            "{other}": {{
                "id": "{other}", "amount": 3.0, "type": "EXPENSE", "categoryId": "{category}",
                "createdAt": "2024-06-02", "status": "PENDING"
            }}
        }}"#
    );
    fs::write(store.transactions_path(), raw).expect("write");

    let txns = store.transactions().expect("transactions");
    let by_id = |wanted: Uuid| txns.iter().find(|t| t.id == wanted).expect("present");
    assert_eq!(
        by_id(id).created_at,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(
        by_id(other).created_at,
        Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap()
    );
    assert_eq!(by_id(other).status, TransactionStatus::Pending);
}

#[test]
fn mismatched_key_is_a_storage_error() {
    let dir = tempdir().expect("tempdir");
    let store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");
    let category = Category::new("Dining", CategoryKind::Expense);
    let mut keyed = std::collections::BTreeMap::new();
    keyed.insert(Uuid::new_v4().to_string(), category);
    let raw = serde_json::to_string(&keyed).expect("json");
    fs::write(store.categories_path(), raw).expect("write");

    assert!(store.categories().is_err());
}

#[test]
fn insight_update_round_trips_through_files() {
    let dir = tempdir().expect("tempdir");
    let mut store = JsonLedgerStore::new(dir.path().to_path_buf()).expect("create store");

    let mut ledger = Ledger::new();
    let dining = ledger.add_category(Category::new("Dining", CategoryKind::Expense));
    ledger.add_transaction(Transaction::completed_expense(
        42.0,
        dining,
        Utc.with_ymd_and_hms(2024, 6, 3, 19, 0, 0).unwrap(),
    ));
    store.import_ledger(&ledger).expect("import");

    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
    let snapshot = InsightService::update_insights(&mut store, &InsightSettings::default(), &clock)
        .expect("update");

    let stored = store.insights().expect("read").expect("snapshot written");
    assert_eq!(stored, snapshot);
    assert_eq!(stored.monthly_spending_by_category[&dining], 42.0);
    assert_eq!(store.transactions().expect("txns"), ledger.transactions);
}
