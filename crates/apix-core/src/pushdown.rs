//! Date predicate pushdown.
//!
//! Query predicates on a table's date column are folded into an
//! [`EffectiveWindow`] that only ever narrows. Predicates on other columns are
//! left to the query engine.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use time::Date;
use tracing::{debug, warn};

use crate::catalog::TableDefinition;
use crate::datetime::{format_date, DateBound};
use crate::ConnectorError;

/// Inclusive date window sent to the API for a table. Either side may be
/// open, in which case configured defaults apply at split time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectiveWindow {
    start: Option<Date>,
    end: Option<Date>,
}

impl EffectiveWindow {
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Rejects a window whose start is after its end.
    pub fn new(start: Option<Date>, end: Option<Date>) -> Result<Self, ConnectorError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ConnectorError::InvalidDateRange {
                    start: format_date(start),
                    end: format_date(end),
                });
            }
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> Option<Date> {
        self.start
    }

    pub const fn end(&self) -> Option<Date> {
        self.end
    }

    /// True when merging disjoint predicates left no date in the window.
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    /// Intersection with `observed`: the later start and the earlier end win,
    /// an open side never restricts.
    pub fn narrow(&self, observed: &Self) -> Self {
        Self {
            start: later(self.start, observed.start),
            end: earlier(self.end, observed.end),
        }
    }
}

impl Display for EffectiveWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let side = |date: Option<Date>| date.map_or_else(|| String::from("<default>"), format_date);
        write!(f, "{}..{}", side(self.start), side(self.end))
    }
}

fn later(current: Option<Date>, incoming: Option<Date>) -> Option<Date> {
    match (current, incoming) {
        (Some(current), Some(incoming)) => Some(current.max(incoming)),
        (current, incoming) => current.or(incoming),
    }
}

fn earlier(current: Option<Date>, incoming: Option<Date>) -> Option<Date> {
    match (current, incoming) {
        (Some(current), Some(incoming)) => Some(current.min(incoming)),
        (current, incoming) => current.or(incoming),
    }
}

/// One contiguous range of a column domain. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub low: Option<DateBound>,
    pub high: Option<DateBound>,
}

impl ValueRange {
    pub const fn all() -> Self {
        Self {
            low: None,
            high: None,
        }
    }

    pub fn between(low: DateBound, high: DateBound) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    pub fn at_least(low: DateBound) -> Self {
        Self {
            low: Some(low),
            high: None,
        }
    }

    pub fn at_most(high: DateBound) -> Self {
        Self {
            low: None,
            high: Some(high),
        }
    }
}

/// Values a column may take under a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    /// No value satisfies the predicate.
    None,
    Ranges(Vec<ValueRange>),
}

impl Domain {
    pub fn single(range: ValueRange) -> Self {
        Self::Ranges(vec![range])
    }

    /// An empty range list admits no value either.
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Ranges(ranges) => ranges.is_empty(),
        }
    }

    /// Smallest window covering every range, or `None` when the domain is
    /// empty.
    pub fn date_span(&self) -> Result<Option<EffectiveWindow>, ConnectorError> {
        let ranges = match self {
            Self::Ranges(ranges) if !ranges.is_empty() => ranges,
            _ => return Ok(None),
        };

        let mut span: Option<(Option<Date>, Option<Date>)> = None;
        for range in ranges {
            let low = range.low.as_ref().map(DateBound::to_date).transpose()?;
            let high = range.high.as_ref().map(DateBound::to_date).transpose()?;
            span = Some(match span {
                None => (low, high),
                Some((span_low, span_high)) => (
                    span_low.zip(low).map(|(a, b)| a.min(b)),
                    span_high.zip(high).map(|(a, b)| a.max(b)),
                ),
            });
        }

        match span {
            Some((start, end)) => EffectiveWindow::new(start, end).map(Some),
            None => Ok(None),
        }
    }
}

/// Predicate summary handed over by the query engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Provably unsatisfiable.
    None,
    /// Conjunction of per-column domains; an empty map accepts every row.
    Domains(BTreeMap<String, Domain>),
}

impl Constraint {
    pub fn all() -> Self {
        Self::Domains(BTreeMap::new())
    }

    pub fn with_domain(self, column: impl Into<String>, domain: Domain) -> Self {
        match self {
            Self::None => Self::None,
            Self::Domains(mut domains) => {
                domains.insert(column.into(), domain);
                Self::Domains(domains)
            }
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Domains(domains) => domains.values().any(Domain::is_none),
        }
    }

    fn domain_for(&self, column: &str) -> Option<&Domain> {
        match self {
            Self::None => None,
            Self::Domains(domains) => domains
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, domain)| domain),
        }
    }
}

/// Narrows `existing` with the predicate observed on `date_column`.
///
/// The window is returned unchanged when the constraint does not reference the
/// date column, is unsatisfiable, or carries bounds that cannot be resolved to
/// dates. A date range whose own start is after its end is rejected.
pub fn merge_date_constraint(
    existing: EffectiveWindow,
    constraint: &Constraint,
    date_column: &str,
) -> Result<EffectiveWindow, ConnectorError> {
    if constraint.is_none() {
        return Ok(existing);
    }
    let Some(domain) = constraint.domain_for(date_column) else {
        return Ok(existing);
    };

    match domain.date_span() {
        Ok(Some(observed)) => Ok(existing.narrow(&observed)),
        Ok(None) => Ok(existing),
        Err(error @ ConnectorError::InvalidDateRange { .. }) => Err(error),
        Err(error) => {
            warn!(
                column = date_column,
                error = %error,
                "ignoring date predicate with unresolvable bounds"
            );
            Ok(existing)
        }
    }
}

/// Reference to a catalog table plus everything pushed down into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub schema_name: String,
    pub table_name: String,
    pub window: EffectiveWindow,
    /// Set once an unsatisfiable predicate was applied; such a handle reads
    /// no rows.
    pub empty: bool,
}

impl TableHandle {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            window: EffectiveWindow::unbounded(),
            empty: false,
        }
    }

    /// Folds `constraint` into the handle. Returns `Ok(None)` when the handle
    /// would not change.
    pub fn apply_filter(
        &self,
        constraint: &Constraint,
        table: &TableDefinition,
    ) -> Result<Option<Self>, ConnectorError> {
        let updated = if constraint.is_none() {
            Self {
                empty: true,
                ..self.clone()
            }
        } else {
            Self {
                window: merge_date_constraint(self.window, constraint, &table.date_column_name)?,
                ..self.clone()
            }
        };

        if updated == *self {
            return Ok(None);
        }

        debug!(
            table = %self.table_name,
            window = %updated.window,
            empty = updated.empty,
            "pushed down date predicate"
        );
        Ok(Some(updated))
    }

    /// True when no split can produce rows.
    pub fn is_empty(&self) -> bool {
        self.empty || self.window.is_empty()
    }
}

impl Display for TableHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} window={}", self.schema_name, self.table_name, self.window)
    }
}
