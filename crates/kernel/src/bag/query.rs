//! Compiled query: predicate, ordering, limit and extra joins.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;
use crate::error::{BagError, ErrorCode};
use crate::models::{Record, Relation};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// What a sort key orders by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTarget {
    /// A column of the queried table.
    Column(&'static str),
    /// A column of the event a registration belongs to.
    EventColumn(&'static str),
    /// The mm `sorting` value linking the record to one of `events`.
    RelationOrder {
        relation: Relation,
        events: BTreeSet<u32>,
    },
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub target: SortTarget,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(target: SortTarget) -> Self {
        Self {
            target,
            direction: SortDirection::Asc,
        }
    }

    /// Ascending uid, appended to every ordering so ties are deterministic.
    pub fn tie_breaker() -> Self {
        Self::asc(SortTarget::Column("uid"))
    }
}

/// Row window applied after ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: u64,
}

/// Tables joined in addition to the queried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Join {
    /// Parent topic of a date (`LEFT JOIN seminars AS topic`).
    Topic,
    /// Event of a registration (`LEFT JOIN seminars AS event`).
    Event,
}

impl Join {
    /// Alias the joined table is known by.
    pub fn alias(self) -> &'static str {
        match self {
            Join::Topic => "topic",
            Join::Event => "event",
        }
    }
}

/// Everything a store needs to run one bag query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub table: &'static str,
    pub predicate: Predicate,
    pub order: Vec<SortKey>,
    pub limit: Option<Limit>,
    pub joins: BTreeSet<Join>,
}

/// Parse `"column [ASC|DESC], ..."` against the sortable columns of `R`.
///
/// An empty expression yields no keys.
pub fn parse_order_by<R: Record>(expression: &str) -> Result<Vec<SortKey>, BagError> {
    parse_sort_terms(expression, R::sortable_column, SortTarget::Column)
}

/// Like [`parse_order_by`], for columns of a related table.
pub fn parse_related_order_by<R: Record>(
    expression: &str,
    target: fn(&'static str) -> SortTarget,
) -> Result<Vec<SortKey>, BagError> {
    parse_sort_terms(expression, R::sortable_column, target)
}

fn parse_sort_terms(
    expression: &str,
    resolve: fn(&str) -> Option<&'static str>,
    target: fn(&'static str) -> SortTarget,
) -> Result<Vec<SortKey>, BagError> {
    let mut keys = Vec::new();
    for term in expression.split(',').map(str::trim) {
        if term.is_empty() {
            continue;
        }
        let mut words = term.split_whitespace();
        let column = words.next().unwrap_or_default();
        let direction = match words.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(BagError::invalid_argument(
                    ErrorCode::UnknownSortColumn,
                    format!("\"{other}\" is not a sort direction, expected ASC or DESC"),
                ));
            }
        };
        if words.next().is_some() {
            return Err(BagError::invalid_argument(
                ErrorCode::UnknownSortColumn,
                format!("\"{term}\" is not of the form \"column [ASC|DESC]\""),
            ));
        }
        let column = resolve(column).ok_or_else(|| {
            BagError::invalid_argument(
                ErrorCode::UnknownSortColumn,
                format!("cannot sort by unknown column \"{column}\""),
            )
        })?;
        keys.push(SortKey {
            target: target(column),
            direction,
        });
    }
    Ok(keys)
}

/// Parse `"count"` or `"offset,count"`. An empty spec means no limit.
pub fn parse_limit(spec: &str) -> Result<Option<Limit>, BagError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(None);
    }

    let malformed = || {
        BagError::invalid_argument(
            ErrorCode::MalformedLimit,
            format!("\"{spec}\" is not a limit, expected \"count\" or \"offset,count\""),
        )
    };
    let number = |part: &str| part.trim().parse::<u64>().map_err(|_| malformed());

    let limit = match spec.split_once(',') {
        Some((offset, count)) => Limit {
            offset: number(offset)?,
            count: number(count)?,
        },
        None => Limit {
            offset: 0,
            count: number(spec)?,
        },
    };
    Ok(Some(limit))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{Event, Registration};

    #[test]
    fn order_by_parses_directions() {
        let keys = parse_order_by::<Event>("begin_date DESC, title").unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey {
                    target: SortTarget::Column("begin_date"),
                    direction: SortDirection::Desc,
                },
                SortKey::asc(SortTarget::Column("title")),
            ]
        );
    }

    #[test]
    fn empty_order_by_is_no_keys() {
        assert!(parse_order_by::<Event>("  ").unwrap().is_empty());
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = parse_order_by::<Event>("title; DROP TABLE seminars").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UnknownSortColumn));

        assert!(parse_order_by::<Registration>("begin_date").is_err());
        assert!(parse_order_by::<Event>("title sideways").is_err());
    }

    #[test]
    fn related_columns_use_the_related_table() {
        let keys =
            parse_related_order_by::<Event>("begin_date desc", SortTarget::EventColumn).unwrap();
        assert_eq!(keys[0].target, SortTarget::EventColumn("begin_date"));
    }

    #[test]
    fn limit_forms() {
        assert_eq!(parse_limit("").unwrap(), None);
        assert_eq!(
            parse_limit("5").unwrap(),
            Some(Limit {
                offset: 0,
                count: 5
            })
        );
        assert_eq!(
            parse_limit("10, 5").unwrap(),
            Some(Limit {
                offset: 10,
                count: 5
            })
        );
    }

    #[test]
    fn malformed_limits_are_rejected() {
        for spec in ["x", "1,", "-1", "1,2,3"] {
            let err = parse_limit(spec).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::MalformedLimit), "{spec}");
        }
    }
}
