//! Generic bag builder.
//!
//! A [`BagBuilder`] owns one [`PredicateComposer`] plus ordering, limit and
//! visibility state. Entity-specific filters live in `impl BagBuilder<X>`
//! blocks next to this module; everything here applies to every record type.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use super::containers::resolve_containers;
use super::cursor::Bag;
use super::predicate::{Predicate, PredicateComposer, fragment};
use super::query::{CompiledQuery, Join, Limit, SortKey, SortTarget, parse_limit, parse_order_by};
use super::tokens::{Policy, parse_positive_integer_list, parse_uid_list};
use crate::clock::{SharedClock, system_clock};
use crate::error::{BagError, BagResult};
use crate::models::{Record, Relation};
use crate::store::{ContainerHierarchy, RecordStore};

/// Events a relation-scoped builder is limited to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelationScope {
    pub relation: Relation,
    pub events: BTreeSet<u32>,
}

/// Accumulates filters for records of type `R` and builds [`Bag`]s.
pub struct BagBuilder<R: Record> {
    pub(crate) composer: PredicateComposer,
    pub(crate) clock: SharedClock,
    order: Vec<SortKey>,
    limit: Option<Limit>,
    show_hidden: bool,
    back_end_mode: bool,
    additional_tables: BTreeSet<Join>,
    pub(crate) relation_scope: Option<RelationScope>,
    pub(crate) sort_by_relation: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Default for BagBuilder<R> {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl<R: Record> BagBuilder<R> {
    /// A builder evaluating time-dependent filters against the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder evaluating time-dependent filters against `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            composer: PredicateComposer::new(),
            clock,
            order: Vec::new(),
            limit: None,
            show_hidden: false,
            back_end_mode: false,
            additional_tables: BTreeSet::new(),
            relation_scope: None,
            sort_by_relation: false,
            _record: PhantomData,
        }
    }

    // -------------------------------------------------------------------------
    // Scoping
    // -------------------------------------------------------------------------

    /// Limit to records stored in the given containers and up to
    /// `recursion` levels of their sub-containers.
    ///
    /// Empty input removes the restriction. Input with any malformed token
    /// matches nothing.
    pub fn set_containers(&mut self, raw: &str, recursion: u32) -> &mut Self {
        let list = parse_positive_integer_list(raw);
        let fragment = if list.is_empty() {
            None
        } else if !list.all_valid {
            tracing::warn!(raw = %raw, "malformed container list, matching nothing");
            Some(Predicate::Nothing)
        } else {
            Some(Predicate::ContainerTree {
                roots: list.ids,
                depth: recursion,
            })
        };
        self.composer.set_or_remove(fragment::CONTAINERS, fragment);
        self
    }

    /// Whether a container restriction is set.
    pub fn has_containers(&self) -> bool {
        self.composer.contains(fragment::CONTAINERS)
    }

    /// Limit to the given uids (strictly validated). Empty input removes the limit.
    pub fn limit_to_uids(&mut self, raw: &str) -> BagResult<&mut Self> {
        let uids = parse_uid_list(raw, Policy::Strict)?;
        let fragment = (!uids.is_empty()).then_some(Predicate::UidIn(uids));
        self.composer.set_or_remove(fragment::UIDS, fragment);
        Ok(self)
    }

    /// Exclude the given uids. Malformed tokens are dropped.
    ///
    /// Unlike the inclusive relation filters, a list without any valid uid
    /// does not fail closed: nothing is excluded and the filter is removed.
    pub fn exclude_uids(&mut self, raw: &str) -> BagResult<&mut Self> {
        let uids = parse_uid_list(raw, Policy::Permissive)?;
        let fragment = (!uids.is_empty()).then_some(Predicate::UidNotIn(uids));
        self.composer.set_or_remove(fragment::EXCLUDED_UIDS, fragment);
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// Include hidden records and records outside their visibility window.
    /// Deleted records stay excluded.
    pub fn show_hidden_records(&mut self) -> &mut Self {
        self.show_hidden = true;
        self
    }

    /// Back-end mode: only the soft-delete flag restricts visibility.
    pub fn set_back_end_mode(&mut self) -> &mut Self {
        self.back_end_mode = true;
        self
    }

    fn includes_hidden(&self) -> bool {
        self.show_hidden || self.back_end_mode
    }

    // -------------------------------------------------------------------------
    // Ordering and paging
    // -------------------------------------------------------------------------

    /// Replace the sort order with `"column [ASC|DESC], ..."`.
    ///
    /// An empty expression restores the default order (ascending uid).
    pub fn set_order_by(&mut self, expression: &str) -> BagResult<&mut Self> {
        self.order = parse_order_by::<R>(expression)?;
        self.sort_by_relation = false;
        Ok(self)
    }

    pub(crate) fn set_order(&mut self, order: Vec<SortKey>) {
        self.order = order;
        self.sort_by_relation = false;
    }

    /// Limit the bag to `"count"` or `"offset,count"` rows. Empty clears the limit.
    pub fn set_limit(&mut self, spec: &str) -> BagResult<&mut Self> {
        self.limit = parse_limit(spec)?;
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Joins
    // -------------------------------------------------------------------------

    /// Require an extra joined table in the compiled query.
    pub fn add_additional_table(&mut self, join: Join) -> &mut Self {
        self.additional_tables.insert(join);
        self
    }

    pub fn remove_additional_table(&mut self, join: Join) -> &mut Self {
        self.additional_tables.remove(&join);
        self
    }

    // -------------------------------------------------------------------------
    // Introspection and compilation
    // -------------------------------------------------------------------------

    /// The fragment currently stored under `name`.
    pub fn fragment(&self, name: &str) -> Option<&Predicate> {
        self.composer.get(name)
    }

    /// Compile the current state into a query.
    ///
    /// Container trees are left unresolved; [`BagBuilder::build`] resolves
    /// them against the store's hierarchy.
    pub fn compile(&self) -> CompiledQuery {
        let visibility = Predicate::Visible {
            now: self.clock.now(),
            show_hidden: self.includes_hidden(),
        };
        let predicate = self.composer.compile(visibility);

        let mut order = Vec::new();
        if self.sort_by_relation
            && let Some(scope) = &self.relation_scope
        {
            order.push(SortKey::asc(SortTarget::RelationOrder {
                relation: scope.relation,
                events: scope.events.clone(),
            }));
        }
        order.extend(self.order.iter().cloned());
        if order.last() != Some(&SortKey::tie_breaker()) {
            order.push(SortKey::tie_breaker());
        }

        let mut joins = self.additional_tables.clone();
        if predicate.reads_topic() {
            joins.insert(Join::Topic);
        }

        CompiledQuery {
            table: R::TABLE,
            predicate,
            order,
            limit: self.limit,
            joins,
        }
    }

    /// Run the query against `store` and wrap the result in a [`Bag`].
    ///
    /// The builder is left untouched and may be built again after further
    /// changes.
    pub async fn build<S>(&self, store: &S) -> BagResult<Bag<R>>
    where
        S: RecordStore<R> + ContainerHierarchy + ?Sized,
    {
        let mut query = self.compile();

        let mut resolved = Vec::new();
        for (roots, depth) in query.predicate.container_trees() {
            resolved.push(resolve_containers(store, roots, depth).await?);
        }
        if !resolved.is_empty() {
            let mut resolved = resolved.into_iter();
            let predicate = std::mem::replace(&mut query.predicate, Predicate::Nothing);
            query.predicate = predicate.map_container_trees(&mut |_, _| {
                resolved
                    .next()
                    .map_or(Predicate::Nothing, Predicate::ContainerIn)
            });
        }

        tracing::debug!(
            table = R::TABLE,
            fragments = self.composer.len(),
            limit = ?query.limit,
            "building bag"
        );

        let selection = store.select(&query).await.map_err(BagError::from)?;
        Ok(Bag::new(selection))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorCode;
    use crate::models::Category;
    use std::sync::Arc;

    fn builder() -> BagBuilder<Category> {
        BagBuilder::with_clock(Arc::new(FixedClock::at_timestamp(1_700_000_000)))
    }

    #[test]
    fn containers_empty_input_removes_scope() {
        let mut b = builder();
        b.set_containers("4,5", 2);
        assert!(b.has_containers());
        b.set_containers("", 0);
        assert!(!b.has_containers());
    }

    #[test]
    fn containers_malformed_input_fails_closed() {
        let mut b = builder();
        b.set_containers("4, 5; DELETE FROM pages", 0);
        assert_eq!(b.fragment(fragment::CONTAINERS), Some(&Predicate::Nothing));
    }

    #[test]
    fn exclusion_without_valid_uids_excludes_nothing() {
        let mut b = builder();
        b.exclude_uids("3,x").unwrap();
        assert_eq!(
            b.fragment(fragment::EXCLUDED_UIDS),
            Some(&Predicate::UidNotIn(BTreeSet::from([3])))
        );
        b.exclude_uids("abc").unwrap();
        assert!(b.fragment(fragment::EXCLUDED_UIDS).is_none());
    }

    #[test]
    fn containers_store_roots_and_depth() {
        let mut b = builder();
        b.set_containers("4,5", 3);
        assert_eq!(
            b.fragment(fragment::CONTAINERS),
            Some(&Predicate::ContainerTree {
                roots: BTreeSet::from([4, 5]),
                depth: 3,
            })
        );
    }

    #[test]
    fn order_always_ends_with_uid() {
        let mut b = builder();
        b.set_order_by("title DESC").unwrap();
        let order = b.compile().order;
        assert_eq!(order.len(), 2);
        assert_eq!(order[1], SortKey::tie_breaker());

        b.set_order_by("").unwrap();
        assert_eq!(b.compile().order, vec![SortKey::tie_breaker()]);
    }

    #[test]
    fn bad_order_is_rejected_immediately() {
        let mut b = builder();
        let err = b.set_order_by("secret_column").err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::UnknownSortColumn));
    }

    #[test]
    fn visibility_follows_mode() {
        let mut b = builder();
        let hidden_flag = |b: &BagBuilder<Category>| match &b.compile().predicate.conjuncts()[0] {
            Predicate::Visible { show_hidden, .. } => *show_hidden,
            other => panic!("unexpected first conjunct {other:?}"),
        };
        assert!(!hidden_flag(&b));
        b.set_back_end_mode();
        assert!(hidden_flag(&b));
    }

    #[test]
    fn strict_uid_limit() {
        let mut b = builder();
        assert!(b.limit_to_uids("1,x").is_err());
        b.limit_to_uids("1,2").unwrap();
        assert_eq!(
            b.fragment(fragment::UIDS),
            Some(&Predicate::UidIn(BTreeSet::from([1, 2])))
        );
        b.limit_to_uids("").unwrap();
        assert!(b.fragment(fragment::UIDS).is_none());
    }
}
