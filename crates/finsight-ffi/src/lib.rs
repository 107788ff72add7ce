//! finsight-ffi
//!
//! JSON-in, JSON-out C ABI for mobile hosts. Every returned string is owned by the
//! caller and must be released with [`finsight_string_free`].

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_longlong},
    ptr,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use finsight_config::InsightSettings;
use finsight_core::{
    ActivationConfirmation, BudgetService, ComplianceEvaluator, CoreError, FixedClock,
    InMemoryLedgerStore, InsightService,
};
use finsight_domain::{timestamp::from_epoch_millis, Ledger};

/// Rebuilds the insight snapshot for a JSON ledger and returns it as JSON.
/// `settings_json` may be null to use the defaults.
#[no_mangle]
pub extern "C" fn finsight_update_insights(
    ledger_json: *const c_char,
    settings_json: *const c_char,
    now_ms: c_longlong,
    out_error: *mut *mut c_char,
) -> *mut c_char {
    clear_error(out_error);
    let result = (|| -> Result<String, CoreError> {
        let ledger = unsafe { ledger_argument(ledger_json) }?;
        let settings = unsafe { settings_argument(settings_json) }?;
        let clock = FixedClock(timestamp_argument(now_ms)?);
        let mut store = InMemoryLedgerStore::from_ledger(ledger);
        let snapshot = InsightService::update_insights(&mut store, &settings, &clock)?;
        to_json(&snapshot)
    })();
    unsafe { respond(result, out_error) }
}

/// Compliance of one category under one budget of the ledger, as JSON.
#[no_mangle]
pub extern "C" fn finsight_evaluate_category(
    ledger_json: *const c_char,
    budget_id: *const c_char,
    category_id: *const c_char,
    as_of_ms: c_longlong,
    out_error: *mut *mut c_char,
) -> *mut c_char {
    clear_error(out_error);
    let result = (|| -> Result<String, CoreError> {
        let ledger = unsafe { ledger_argument(ledger_json) }?;
        let budget_id = unsafe { uuid_argument(budget_id) }?;
        let category_id = unsafe { uuid_argument(category_id) }?;
        let as_of = timestamp_argument(as_of_ms)?;
        let budget = ledger
            .budget(budget_id)
            .ok_or(CoreError::BudgetNotFound(budget_id))?;
        let result = ComplianceEvaluator::evaluate(category_id, budget, &ledger.transactions, as_of);
        to_json(&result)
    })();
    unsafe { respond(result, out_error) }
}

/// Activates a budget and returns the updated budget list as JSON.
/// `confirm_replace` must be non-zero to replace a currently active budget.
#[no_mangle]
pub extern "C" fn finsight_activate_budget(
    ledger_json: *const c_char,
    budget_id: *const c_char,
    confirm_replace: c_int,
    now_ms: c_longlong,
    out_error: *mut *mut c_char,
) -> *mut c_char {
    clear_error(out_error);
    let result = (|| -> Result<String, CoreError> {
        let mut ledger = unsafe { ledger_argument(ledger_json) }?;
        let budget_id = unsafe { uuid_argument(budget_id) }?;
        let now = timestamp_argument(now_ms)?;
        let confirmation = if confirm_replace != 0 {
            ActivationConfirmation::ReplaceActive
        } else {
            ActivationConfirmation::NotConfirmed
        };
        BudgetService::activate(&mut ledger.budgets, budget_id, confirmation, now)?;
        to_json(&ledger.budgets)
    })();
    unsafe { respond(result, out_error) }
}

#[no_mangle]
pub extern "C" fn finsight_string_free(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(value));
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string(value).map_err(|err| CoreError::Serde(err.to_string()))
}

fn timestamp_argument(millis: c_longlong) -> Result<DateTime<Utc>, CoreError> {
    from_epoch_millis(millis)
        .ok_or_else(|| CoreError::Validation(format!("timestamp {} is out of range", millis)))
}

unsafe fn respond(result: Result<String, CoreError>, out_error: *mut *mut c_char) -> *mut c_char {
    match result {
        Ok(json) => match CString::new(json) {
            Ok(cstring) => cstring.into_raw(),
            Err(err) => {
                write_error(out_error, &err.to_string());
                ptr::null_mut()
            }
        },
        Err(err) => {
            write_core_error(out_error, err);
            ptr::null_mut()
        }
    }
}

fn clear_error(out_error: *mut *mut c_char) {
    if out_error.is_null() {
        return;
    }
    unsafe {
        *out_error = ptr::null_mut();
    }
}

unsafe fn write_error(out_error: *mut *mut c_char, message: &str) {
    if out_error.is_null() {
        return;
    }
    if let Ok(cstring) = CString::new(message) {
        *out_error = cstring.into_raw();
    }
}

unsafe fn write_core_error(out_error: *mut *mut c_char, err: CoreError) {
    write_error(out_error, &err.to_string());
}

unsafe fn c_string_argument(ptr: *const c_char) -> Result<String, CoreError> {
    if ptr.is_null() {
        return Err(CoreError::Validation("null string pointer received".into()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(|s| s.to_string())
        .map_err(|err| CoreError::Validation(err.to_string()))
}

unsafe fn ledger_argument(ptr: *const c_char) -> Result<Ledger, CoreError> {
    let raw = c_string_argument(ptr)?;
    serde_json::from_str(&raw).map_err(|err| CoreError::Serde(format!("ledger: {err}")))
}

unsafe fn settings_argument(ptr: *const c_char) -> Result<InsightSettings, CoreError> {
    if ptr.is_null() {
        return Ok(InsightSettings::default());
    }
    let raw = c_string_argument(ptr)?;
    let settings: InsightSettings = serde_json::from_str(&raw)
        .map_err(|err| CoreError::Serde(format!("settings: {err}")))?;
    settings
        .validate()
        .map_err(|err| CoreError::Validation(err.to_string()))?;
    Ok(settings)
}

unsafe fn uuid_argument(ptr: *const c_char) -> Result<Uuid, CoreError> {
    let raw = c_string_argument(ptr)?;
    Uuid::parse_str(raw.trim()).map_err(|err| CoreError::Validation(format!("invalid UUID: {err}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use finsight_domain::{
        Budget, BudgetPeriodType, BudgetRule, BudgetStatus, Category, CategoryKind, DateRange,
        FixedRule, Transaction,
    };

    use super::*;

    fn call_update(ledger: &str, settings: Option<&str>) -> (Option<String>, Option<String>) {
        let ledger = CString::new(ledger).unwrap();
        let settings = settings.map(|raw| CString::new(raw).unwrap());
        let settings_ptr = settings.as_ref().map_or(ptr::null(), |s| s.as_ptr());
        let mut error: *mut c_char = ptr::null_mut();
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap().timestamp_millis();

        let output = finsight_update_insights(ledger.as_ptr(), settings_ptr, now, &mut error);
        let take = |raw: *mut c_char| {
            if raw.is_null() {
                return None;
            }
            let value = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
            finsight_string_free(raw);
            Some(value)
        };
        (take(output), take(error))
    }

    #[test]
    fn update_returns_snapshot_json() {
        let mut ledger = Ledger::new();
        let dining = ledger.add_category(Category::new("Dining", CategoryKind::Expense));
        ledger.add_transaction(Transaction::completed_expense(
            12.0,
            dining,
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
        ));
        let json = serde_json::to_string(&ledger).unwrap();

        let (output, error) = call_update(&json, None);
        assert!(error.is_none());
        let snapshot: serde_json::Value = serde_json::from_str(&output.unwrap()).unwrap();
        assert_eq!(snapshot["monthlySpendingByCategory"][dining.to_string()], 12.0);
    }

    #[test]
    fn malformed_input_reports_error() {
        let (output, error) = call_update("{not json", None);
        assert!(output.is_none());
        assert!(error.unwrap().contains("ledger"));

        let (output, error) = call_update("{}", Some(r#"{"trend_window_months":0}"#));
        assert!(output.is_none());
        assert!(error.unwrap().contains("trend_window_months"));
    }

    fn take(raw: *mut c_char) -> Option<String> {
        if raw.is_null() {
            return None;
        }
        let value = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        finsight_string_free(raw);
        Some(value)
    }

    fn budgeted_ledger() -> (Ledger, Uuid, Uuid) {
        let mut ledger = Ledger::new();
        let rent = ledger.add_category(Category::new("Rent", CategoryKind::Expense));
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let mut budget = BudgetService::create(
            "Main",
            2000.0,
            range,
            BudgetPeriodType::Month,
            BudgetRule::fixed(FixedRule::FiftyThirtyTwenty),
        )
        .unwrap();
        budget.category_allocations[0].categories.insert(rent);
        let budget_id = ledger.add_budget(budget);
        ledger.add_transaction(Transaction::completed_expense(
            500.0,
            rent,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        ));
        (ledger, budget_id, rent)
    }

    #[test]
    fn evaluate_category_reports_compliance() {
        let (ledger, budget_id, rent) = budgeted_ledger();
        let ledger = CString::new(serde_json::to_string(&ledger).unwrap()).unwrap();
        let budget = CString::new(budget_id.to_string()).unwrap();
        let category = CString::new(rent.to_string()).unwrap();
        let as_of = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap().timestamp_millis();
        let mut error: *mut c_char = ptr::null_mut();

        let output = finsight_evaluate_category(
            ledger.as_ptr(),
            budget.as_ptr(),
            category.as_ptr(),
            as_of,
            &mut error,
        );
        assert!(take(error).is_none());
        let result: serde_json::Value = serde_json::from_str(&take(output).unwrap()).unwrap();
        assert_eq!(result["currentSpending"], 500.0);
        assert_eq!(result["budgetLimit"], 1000.0);
        assert_eq!(result["spendingPercentage"], 50.0);
    }

    #[test]
    fn activation_requires_confirmation_across_the_boundary() {
        let (mut ledger, first, _) = budgeted_ledger();
        ledger.budgets[0].status = BudgetStatus::Active;
        let mut second: Budget = ledger.budgets[0].clone();
        second.id = Uuid::new_v4();
        second.status = BudgetStatus::Draft;
        second.category_allocations.iter_mut().for_each(|g| g.categories.clear());
        let second_id = ledger.add_budget(second);

        let json = CString::new(serde_json::to_string(&ledger).unwrap()).unwrap();
        let target = CString::new(second_id.to_string()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp_millis();

        let mut error: *mut c_char = ptr::null_mut();
        let output = finsight_activate_budget(json.as_ptr(), target.as_ptr(), 0, now, &mut error);
        assert!(take(output).is_none());
        assert!(take(error).unwrap().contains("confirmation required"));

        let mut error: *mut c_char = ptr::null_mut();
        let output = finsight_activate_budget(json.as_ptr(), target.as_ptr(), 1, now, &mut error);
        assert!(take(error).is_none());
        let budgets: Vec<Budget> = serde_json::from_str(&take(output).unwrap()).unwrap();
        let status_of = |id: Uuid| budgets.iter().find(|b| b.id == id).unwrap().status;
        assert_eq!(status_of(first), BudgetStatus::Expired);
        assert_eq!(status_of(second_id), BudgetStatus::Active);
    }
}
