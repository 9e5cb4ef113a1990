//! Range partitioning: one split per API-sized date window.

use std::cmp::Ordering;

use serde::Serialize;
use time::{Date, Duration};
use tracing::debug;

use crate::catalog::TableDefinition;
use crate::config::ConnectorConfig;
use crate::datetime::format_date;
use crate::pushdown::{EffectiveWindow, TableHandle};

/// Bounded sub-window fetched by exactly one API call. Splits order by start
/// date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Split {
    pub endpoint: String,
    #[serde(serialize_with = "serialize_date")]
    pub start_date: Date,
    #[serde(serialize_with = "serialize_date")]
    pub end_date: Date,
}

impl Split {
    /// Inclusive length in days.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).whole_days() + 1
    }
}

impl Ord for Split {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_date
            .cmp(&other.start_date)
            .then_with(|| self.end_date.cmp(&other.end_date))
            .then_with(|| self.endpoint.cmp(&other.endpoint))
    }
}

impl PartialOrd for Split {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_date(*date))
}

/// Cuts `[start, end]` into contiguous windows of at most `max_days` days.
///
/// An inverted range yields no splits. `max_days` below one is treated as one.
pub fn build_splits_for_range(
    endpoint: &str,
    start: Date,
    end: Date,
    max_days: u32,
) -> Vec<Split> {
    let step = Duration::days(i64::from(max_days.max(1)) - 1);
    let mut splits = Vec::new();
    let mut current = start;

    while current <= end {
        let split_end = current
            .checked_add(step)
            .map_or(end, |candidate| candidate.min(end));
        splits.push(Split {
            endpoint: endpoint.to_owned(),
            start_date: current,
            end_date: split_end,
        });

        match split_end.next_day() {
            Some(next) => current = next,
            None => break,
        }
    }

    splits
}

/// Fills the open sides of `window` from configuration: the end falls back to
/// the configured default, then `today`; the start to the configured default,
/// then `end - (lookback - 1)`.
pub fn resolve_window(
    window: &EffectiveWindow,
    config: &ConnectorConfig,
    today: Date,
) -> (Date, Date) {
    let end = window
        .end()
        .or(config.default_end_date)
        .unwrap_or(today);
    let start = window
        .start()
        .or(config.default_start_date)
        .unwrap_or_else(|| {
            let lookback = i64::from(config.default_lookback_days.max(1)) - 1;
            end.checked_sub(Duration::days(lookback)).unwrap_or(Date::MIN)
        });
    (start, end)
}

/// Splits for reading `handle`, empty when the handle cannot produce rows.
pub fn plan_splits(
    handle: &TableHandle,
    table: &TableDefinition,
    config: &ConnectorConfig,
    today: Date,
) -> Vec<Split> {
    if handle.is_empty() {
        debug!(table = %table.table_name, "handle is empty, no splits");
        return Vec::new();
    }

    let (start, end) = resolve_window(&handle.window, config, today);
    let splits =
        build_splits_for_range(&table.endpoint_name, start, end, config.max_days_per_request);
    debug!(
        table = %table.table_name,
        start = %format_date(start),
        end = %format_date(end),
        splits = splits.len(),
        "planned splits"
    );
    splits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use time::macros::date;

    fn config() -> ConnectorConfig {
        ConnectorConfig {
            auth_code: Some(String::from("code")),
            ..ConnectorConfig::default()
        }
    }

    fn bounds(splits: &[Split]) -> Vec<(Date, Date)> {
        splits
            .iter()
            .map(|split| (split.start_date, split.end_date))
            .collect()
    }

    #[test]
    fn lista_lead_six_weeks_become_two_splits() {
        let splits =
            build_splits_for_range("lista-lead", date!(2025 - 01 - 01), date!(2025 - 02 - 15), 31);

        assert_eq!(
            bounds(&splits),
            [
                (date!(2025 - 01 - 01), date!(2025 - 01 - 31)),
                (date!(2025 - 02 - 01), date!(2025 - 02 - 15)),
            ]
        );
        assert!(splits.iter().all(|split| split.endpoint == "lista-lead"));
    }

    #[test]
    fn single_day_and_inverted_ranges() {
        let one = build_splits_for_range("x", date!(2025 - 03 - 01), date!(2025 - 03 - 01), 31);
        assert_eq!(bounds(&one), [(date!(2025 - 03 - 01), date!(2025 - 03 - 01))]);

        let none = build_splits_for_range("x", date!(2025 - 03 - 02), date!(2025 - 03 - 01), 31);
        assert!(none.is_empty());
    }

    #[test]
    fn one_day_windows() {
        let splits = build_splits_for_range("x", date!(2024 - 02 - 28), date!(2024 - 03 - 01), 1);
        assert_eq!(splits.len(), 3);
        assert!(splits.iter().all(|split| split.days() == 1));
    }

    #[test]
    fn range_ending_at_the_last_representable_date_terminates() {
        let eve = Date::MAX.previous_day().expect("day");
        let splits = build_splits_for_range("x", eve, Date::MAX, 31);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].end_date, Date::MAX);
    }

    #[test]
    fn resolve_window_falls_back_to_today_and_lookback() {
        let today = date!(2025 - 06 - 30);

        let (start, end) = resolve_window(&EffectiveWindow::unbounded(), &config(), today);
        assert_eq!((start, end), (date!(2025 - 06 - 24), today));

        let configured = ConnectorConfig {
            default_start_date: Some(date!(2025 - 01 - 01)),
            default_end_date: Some(date!(2025 - 01 - 31)),
            ..config()
        };
        let (start, end) = resolve_window(&EffectiveWindow::unbounded(), &configured, today);
        assert_eq!((start, end), (date!(2025 - 01 - 01), date!(2025 - 01 - 31)));

        let filtered = EffectiveWindow::new(None, Some(date!(2025 - 01 - 10))).expect("window");
        let (start, end) = resolve_window(&filtered, &config(), today);
        assert_eq!((start, end), (date!(2025 - 01 - 04), date!(2025 - 01 - 10)));
    }

    #[test]
    fn plan_splits_skips_empty_handles_and_inverted_resolved_windows() {
        let catalog = Catalog::builtin();
        let table = catalog.get("lista_lead").expect("table");
        let today = date!(2025 - 06 - 30);

        let mut handle = TableHandle::new("univesp", "lista_lead");
        assert_eq!(plan_splits(&handle, table, &config(), today).len(), 1);

        handle.empty = true;
        assert!(plan_splits(&handle, table, &config(), today).is_empty());

        // filtered start after the configured default end
        let handle = TableHandle {
            window: EffectiveWindow::new(Some(date!(2025 - 02 - 01)), None).expect("window"),
            ..TableHandle::new("univesp", "lista_lead")
        };
        let configured = ConnectorConfig {
            default_end_date: Some(date!(2025 - 01 - 31)),
            ..config()
        };
        assert!(plan_splits(&handle, table, &configured, today).is_empty());
    }

    #[test]
    fn splits_sort_by_start_date() {
        let mut splits =
            build_splits_for_range("x", date!(2025 - 01 - 01), date!(2025 - 03 - 31), 10);
        let expected = splits.clone();
        splits.reverse();
        splits.sort();
        assert_eq!(splits, expected);
    }
}
