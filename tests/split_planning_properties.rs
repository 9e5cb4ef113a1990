//! Property-based tests for predicate pushdown and split planning.
//!
//! These properties hold for every window and request size: splits tile the
//! requested range exactly, narrowing never widens a window, and epoch numbers
//! in any unit normalize to the same instant.

use apix_core::{
    build_splits_for_range, format_date, merge_date_constraint, normalize_epoch_number, parse_date,
    resolve_window, ConnectorConfig, Constraint, DateBound, Domain, EffectiveWindow, ValueRange,
};
use proptest::prelude::*;
use time::{Date, Duration};

const ENDPOINT: &str = "lista-lead";

// ── Strategies ──────────────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = Date> {
    (2000i32..2100, 1u16..=365).prop_map(|(year, ordinal)| {
        Date::from_ordinal_date(year, ordinal).expect("ordinal within every year")
    })
}

/// Ordered pair `(start, end)` at most `max_span` days apart.
fn arb_range(max_span: i64) -> impl Strategy<Value = (Date, Date)> {
    (arb_date(), 0..=max_span).prop_map(|(start, span)| (start, start + Duration::days(span)))
}

fn arb_max_days() -> impl Strategy<Value = u32> {
    1u32..=31
}

fn arb_window() -> impl Strategy<Value = EffectiveWindow> {
    (proptest::option::of(arb_date()), proptest::option::of(arb_date())).prop_map(|(start, end)| {
        match (start, end) {
            (Some(start), Some(end)) if start > end => {
                EffectiveWindow::new(Some(end), Some(start)).expect("ordered")
            }
            _ => EffectiveWindow::new(start, end).expect("ordered"),
        }
    })
}

fn date_predicate(low: Date, high: Date) -> Constraint {
    Constraint::all().with_domain(
        "dt_criacao",
        Domain::single(ValueRange::between(DateBound::Date(low), DateBound::Date(high))),
    )
}

// ── Split tiling ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_splits_cover_the_range_without_gaps_or_overlap(
        (start, end) in arb_range(400),
        max_days in arb_max_days(),
    ) {
        let splits = build_splits_for_range(ENDPOINT, start, end, max_days);

        prop_assert!(!splits.is_empty());
        prop_assert_eq!(splits[0].start_date, start);
        prop_assert_eq!(splits[splits.len() - 1].end_date, end);

        for pair in splits.windows(2) {
            prop_assert_eq!(pair[0].end_date.next_day(), Some(pair[1].start_date));
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prop_every_split_respects_the_request_size(
        (start, end) in arb_range(400),
        max_days in arb_max_days(),
    ) {
        let splits = build_splits_for_range(ENDPOINT, start, end, max_days);

        for split in &splits {
            prop_assert!(split.days() >= 1);
            prop_assert!(split.days() <= i64::from(max_days));
            prop_assert_eq!(split.endpoint.as_str(), ENDPOINT);
        }

        // Only the last split may be short.
        let total = (end - start).whole_days() + 1;
        let expected = (total + i64::from(max_days) - 1) / i64::from(max_days);
        prop_assert_eq!(splits.len() as i64, expected);
    }

    #[test]
    fn prop_inverted_range_yields_no_splits(
        start in arb_date(),
        gap in 1i64..=365,
        max_days in arb_max_days(),
    ) {
        let end = start - Duration::days(gap);

        prop_assert!(build_splits_for_range(ENDPOINT, start, end, max_days).is_empty());
    }
}

// ── Window resolution ───────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_open_start_resolves_to_lookback_window(
        end in arb_date(),
        lookback in 1u32..=90,
    ) {
        let config = ConnectorConfig {
            default_lookback_days: lookback,
            ..ConnectorConfig::default()
        };
        let window = EffectiveWindow::new(None, Some(end)).expect("window");

        let (start, resolved_end) = resolve_window(&window, &config, end + Duration::days(30));

        prop_assert_eq!(resolved_end, end);
        prop_assert_eq!((resolved_end - start).whole_days() + 1, i64::from(lookback));
    }
}

// ── Predicate merging ───────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_narrowing_never_widens_either_window(
        existing in arb_window(),
        observed in arb_window(),
    ) {
        let narrowed = existing.narrow(&observed);

        for window in [existing, observed] {
            if let Some(start) = window.start() {
                prop_assert!(narrowed.start().is_some_and(|narrow| narrow >= start));
            }
            if let Some(end) = window.end() {
                prop_assert!(narrowed.end().is_some_and(|narrow| narrow <= end));
            }
        }
    }

    #[test]
    fn prop_merging_a_predicate_is_idempotent(
        existing in arb_window(),
        (low, high) in arb_range(120),
    ) {
        let constraint = date_predicate(low, high);

        let once = merge_date_constraint(existing, &constraint, "dt_criacao").expect("merged");
        let twice = merge_date_constraint(once, &constraint, "dt_criacao").expect("merged");

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_predicate_on_unbounded_window_becomes_the_window(
        (low, high) in arb_range(120),
    ) {
        let merged = merge_date_constraint(
            EffectiveWindow::unbounded(),
            &date_predicate(low, high),
            "DT_CRIACAO",
        )
        .expect("merged");

        prop_assert_eq!(merged.start(), Some(low));
        prop_assert_eq!(merged.end(), Some(high));
        prop_assert!(!merged.is_empty());
    }

    #[test]
    fn prop_disjoint_predicates_leave_an_empty_window(
        (low, high) in arb_range(60),
        gap in 1i64..=60,
        span in 0i64..=60,
    ) {
        let later_low = high + Duration::days(gap);
        let first = merge_date_constraint(
            EffectiveWindow::unbounded(),
            &date_predicate(low, high),
            "dt_criacao",
        )
        .expect("first");

        let second = merge_date_constraint(
            first,
            &date_predicate(later_low, later_low + Duration::days(span)),
            "dt_criacao",
        )
        .expect("second");

        prop_assert!(second.is_empty());
        prop_assert!(build_splits_for_range(
            ENDPOINT,
            second.start().expect("start"),
            second.end().expect("end"),
            31,
        )
        .is_empty());
    }

    #[test]
    fn prop_inverted_predicate_is_rejected(
        (low, high) in arb_range(120),
        gap in 1i64..=30,
    ) {
        let error = merge_date_constraint(
            EffectiveWindow::unbounded(),
            &date_predicate(high + Duration::days(gap), low),
            "dt_criacao",
        )
        .expect_err("inverted range");

        prop_assert_eq!(error.kind(), apix_core::ErrorKind::InvalidDateRange);
    }
}

// ── Dates and epochs ────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_epoch_units_normalize_to_the_same_instant(seconds in 1_000_000_000i64..10_000_000_000) {
        let expected = seconds * 1_000_000;

        prop_assert_eq!(normalize_epoch_number(seconds), expected);
        prop_assert_eq!(normalize_epoch_number(seconds * 1_000), expected);
        prop_assert_eq!(normalize_epoch_number(seconds * 1_000_000), expected);
    }

    #[test]
    fn prop_wire_dates_parse_back(date in arb_date()) {
        let text = format_date(date);

        prop_assert_eq!(text.len(), 10);
        prop_assert_eq!(parse_date(&text).expect("parses"), date);
    }
}
