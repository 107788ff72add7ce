//! Directory-backed [`LedgerStore`]: one JSON object per collection mapping id to record,
//! plus a singleton insight snapshot file.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use finsight_core::{CoreError, LedgerStore};
use finsight_domain::{Budget, Category, InsightSnapshot, Ledger, SavingsGoal, Transaction};

const CATEGORIES_FILE: &str = "categories.json";
const TRANSACTIONS_FILE: &str = "transactions.json";
const BUDGETS_FILE: &str = "budgets.json";
const GOALS_FILE: &str = "goals.json";
const INSIGHTS_FILE: &str = "insights.json";
const TMP_SUFFIX: &str = "tmp";

/// Persists each ledger collection as `<root>/<collection>.json`.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    root: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn categories_path(&self) -> PathBuf {
        self.root.join(CATEGORIES_FILE)
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.root.join(TRANSACTIONS_FILE)
    }

    pub fn budgets_path(&self) -> PathBuf {
        self.root.join(BUDGETS_FILE)
    }

    pub fn goals_path(&self) -> PathBuf {
        self.root.join(GOALS_FILE)
    }

    pub fn insights_path(&self) -> PathBuf {
        self.root.join(INSIGHTS_FILE)
    }

    /// Overwrites every collection with the contents of `ledger`.
    pub fn import_ledger(&mut self, ledger: &Ledger) -> Result<(), CoreError> {
        write_collection(&self.categories_path(), &ledger.categories, |c| c.id)?;
        write_collection(&self.transactions_path(), &ledger.transactions, |t| t.id)?;
        write_collection(&self.budgets_path(), &ledger.budgets, |b| b.id)?;
        write_collection(&self.goals_path(), &ledger.goals, |g| g.id)?;
        match &ledger.insights {
            Some(snapshot) => save_json(&self.insights_path(), snapshot),
            None => remove_if_exists(&self.insights_path()),
        }
    }
}

impl LedgerStore for JsonLedgerStore {
    fn categories(&self) -> Result<Vec<Category>, CoreError> {
        read_collection(&self.categories_path(), |c: &Category| c.id)
    }

    fn transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        read_collection(&self.transactions_path(), |t: &Transaction| t.id)
    }

    fn budgets(&self) -> Result<Vec<Budget>, CoreError> {
        read_collection(&self.budgets_path(), |b: &Budget| b.id)
    }

    fn goals(&self) -> Result<Vec<SavingsGoal>, CoreError> {
        read_collection(&self.goals_path(), |g: &SavingsGoal| g.id)
    }

    fn insights(&self) -> Result<Option<InsightSnapshot>, CoreError> {
        let path = self.insights_path();
        if !path.exists() {
            return Ok(None);
        }
        load_json(&path).map(Some)
    }

    fn upsert_category(&mut self, category: Category) -> Result<(), CoreError> {
        upsert(&self.categories_path(), category, |c| c.id)
    }

    fn remove_category(&mut self, id: Uuid) -> Result<(), CoreError> {
        if !remove(&self.categories_path(), id, |c: &Category| c.id)? {
            return Err(CoreError::CategoryNotFound(id));
        }
        Ok(())
    }

    fn upsert_transaction(&mut self, transaction: Transaction) -> Result<(), CoreError> {
        upsert(&self.transactions_path(), transaction, |t| t.id)
    }

    fn upsert_budget(&mut self, budget: Budget) -> Result<(), CoreError> {
        upsert(&self.budgets_path(), budget, |b| b.id)
    }

    fn upsert_transactions(&mut self, transactions: Vec<Transaction>) -> Result<(), CoreError> {
        upsert_all(&self.transactions_path(), transactions, |t| t.id)
    }

    fn upsert_budgets(&mut self, budgets: Vec<Budget>) -> Result<(), CoreError> {
        upsert_all(&self.budgets_path(), budgets, |b| b.id)
    }

    fn remove_budget(&mut self, id: Uuid) -> Result<(), CoreError> {
        if !remove(&self.budgets_path(), id, |b: &Budget| b.id)? {
            return Err(CoreError::BudgetNotFound(id));
        }
        Ok(())
    }

    fn upsert_goal(&mut self, goal: SavingsGoal) -> Result<(), CoreError> {
        upsert(&self.goals_path(), goal, |g| g.id)
    }

    fn put_insights(&mut self, snapshot: InsightSnapshot) -> Result<(), CoreError> {
        save_json(&self.insights_path(), &snapshot)
    }
}

fn read_map<T: DeserializeOwned>(
    path: &Path,
    id_of: impl Fn(&T) -> Uuid,
) -> Result<BTreeMap<Uuid, T>, CoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw: BTreeMap<String, T> = load_json(path)?;
    let mut records = BTreeMap::new();
    for (key, record) in raw {
        let id = id_of(&record);
        if key.parse::<Uuid>().ok() != Some(id) {
            return Err(CoreError::Storage(format!(
                "{}: record stored under `{}` has id {}",
                path.display(),
                key,
                id
            )));
        }
        records.insert(id, record);
    }
    Ok(records)
}

fn read_collection<T: DeserializeOwned>(
    path: &Path,
    id_of: impl Fn(&T) -> Uuid,
) -> Result<Vec<T>, CoreError> {
    Ok(read_map(path, id_of)?.into_values().collect())
}

fn write_collection<T: Serialize>(
    path: &Path,
    items: &[T],
    id_of: impl Fn(&T) -> Uuid,
) -> Result<(), CoreError> {
    let keyed: BTreeMap<String, &T> = items
        .iter()
        .map(|item| (id_of(item).to_string(), item))
        .collect();
    save_json(path, &keyed)
}

fn upsert<T>(path: &Path, item: T, id_of: impl Fn(&T) -> Uuid) -> Result<(), CoreError>
where
    T: Serialize + DeserializeOwned,
{
    upsert_all(path, vec![item], id_of)
}

/// Merges `items` into the collection with a single file replacement.
fn upsert_all<T>(path: &Path, items: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> Result<(), CoreError>
where
    T: Serialize + DeserializeOwned,
{
    if items.is_empty() {
        return Ok(());
    }
    let mut records = read_map(path, &id_of)?;
    for item in items {
        records.insert(id_of(&item), item);
    }
    save_keyed(path, &records)
}

fn remove<T>(path: &Path, id: Uuid, id_of: impl Fn(&T) -> Uuid) -> Result<bool, CoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut records = read_map(path, id_of)?;
    if records.remove(&id).is_none() {
        return Ok(false);
    }
    save_keyed(path, &records)?;
    Ok(true)
}

fn save_keyed<T: Serialize>(path: &Path, records: &BTreeMap<Uuid, T>) -> Result<(), CoreError> {
    let keyed: BTreeMap<String, &T> = records
        .iter()
        .map(|(id, record)| (id.to_string(), record))
        .collect();
    save_json(path, &keyed)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| CoreError::Serde(format!("{}: {}", path.display(), err)))
}

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| CoreError::Serde(err.to_string()))?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
