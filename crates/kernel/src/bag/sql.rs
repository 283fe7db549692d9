//! PostgreSQL rendering of compiled bag queries using SeaQuery.
//!
//! Generates the row query and the matching COUNT query for a
//! [`CompiledQuery`]:
//! - visibility and scalar filters as plain column conditions
//! - mm relations as `EXISTS` subqueries, with topic fallback for dates
//! - unresolved container trees as a bounded recursive CTE over `pages`
//! - free text as SeaQuery values, quoted by the query builder
//!
//! Time columns hold Unix timestamps (seconds).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_query::{
    Alias, Asterisk, Cond, Expr, JoinType, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};

use super::predicate::Predicate;
use super::query::{CompiledQuery, Join, SortDirection, SortTarget};
use super::timeframe::{TimeFrame, day_bounds};
use crate::models::{Event, EventKind, Record, Relation};

/// Table holding the container hierarchy.
pub const PAGES_TABLE: &str = "pages";

/// Build the row query, ordered and limited.
pub fn select_sql(query: &CompiledQuery) -> String {
    let mut select = Query::select();
    select.column((Alias::new(query.table), Asterisk));
    ordered(select, query)
}

/// Build the row query with each row rendered as one JSON object.
///
/// The projection sits in the ordered statement itself, so the row order is
/// the ORDER BY of this query.
pub fn select_json_sql(query: &CompiledQuery) -> String {
    let mut select = Query::select();
    select.expr(Expr::cust(format!("row_to_json({}.*)", query.table)));
    ordered(select, query)
}

fn ordered(mut select: SelectStatement, query: &CompiledQuery) -> String {
    let renderer = Renderer::new(query.table);
    select.from(Alias::new(query.table));
    renderer.add_joins(&mut select, &query.joins);
    select.and_where(renderer.condition(&query.predicate));

    for key in &query.order {
        let order = match key.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        match &key.target {
            SortTarget::Column(column) => {
                select.order_by((Alias::new(query.table), Alias::new(*column)), order);
            }
            SortTarget::EventColumn(column) => {
                select.order_by((Alias::new(Join::Event.alias()), Alias::new(*column)), order);
            }
            SortTarget::RelationOrder { relation, events } => {
                select.order_by_expr(renderer.relation_position(*relation, events), order);
            }
        }
    }

    if let Some(limit) = query.limit {
        select.limit(limit.count);
        select.offset(limit.offset);
    }

    select.to_string(PostgresQueryBuilder)
}

/// Build the COUNT query over the same rows, ignoring order and limit.
pub fn count_sql(query: &CompiledQuery) -> String {
    let renderer = Renderer::new(query.table);
    let mut select = Query::select();

    select.expr(Expr::col(Asterisk).count());
    select.from(Alias::new(query.table));
    renderer.add_joins(&mut select, &query.joins);
    select.and_where(renderer.condition(&query.predicate));

    select.to_string(PostgresQueryBuilder)
}

/// Immediate, non-deleted children of a container.
pub fn children_sql() -> &'static str {
    "SELECT uid::bigint FROM pages WHERE pid = $1 AND deleted = FALSE ORDER BY uid"
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn id_list(ids: &BTreeSet<u32>) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders predicates against one base table.
struct Renderer {
    table: &'static str,
}

impl Renderer {
    fn new(table: &'static str) -> Self {
        Self { table }
    }

    fn col(&self, column: &'static str) -> (Alias, Alias) {
        (Alias::new(self.table), Alias::new(column))
    }

    fn add_joins(&self, select: &mut SelectStatement, joins: &BTreeSet<Join>) {
        for join in joins {
            let alias = join.alias();
            let on = match join {
                Join::Topic => Cond::all()
                    .add(
                        Expr::col((Alias::new(alias), Alias::new("uid")))
                            .equals(self.col("topic")),
                    )
                    .add(Expr::col(self.col("object_type")).eq(EventKind::Date.code())),
                Join::Event => Cond::all().add(
                    Expr::col((Alias::new(alias), Alias::new("uid"))).equals(self.col("seminar")),
                ),
            };
            select.join_as(
                JoinType::LeftJoin,
                Alias::new(Event::TABLE),
                Alias::new(alias),
                on,
            );
        }
    }

    fn condition(&self, predicate: &Predicate) -> SimpleExpr {
        let t = self.table;
        match predicate {
            Predicate::Nothing => Expr::cust("FALSE"),
            Predicate::All(children) => {
                if children.is_empty() {
                    return Expr::cust("TRUE");
                }
                children
                    .iter()
                    .fold(Cond::all(), |cond, child| cond.add(self.condition(child)))
                    .into()
            }

            Predicate::Visible { now, show_hidden } => {
                let not_deleted = Expr::col(self.col("deleted")).eq(false);
                if *show_hidden {
                    return not_deleted;
                }
                let now = now.timestamp();
                Cond::all()
                    .add(not_deleted)
                    .add(Expr::col(self.col("hidden")).eq(false))
                    .add(
                        Cond::any()
                            .add(Expr::col(self.col("starttime")).is_null())
                            .add(Expr::col(self.col("starttime")).lte(now)),
                    )
                    .add(
                        Cond::any()
                            .add(Expr::col(self.col("endtime")).is_null())
                            .add(Expr::col(self.col("endtime")).gt(now)),
                    )
                    .into()
            }
            Predicate::UidIn(ids) => Expr::col(self.col("uid")).is_in(ids.iter().copied()),
            Predicate::UidNotIn(ids) => Expr::col(self.col("uid")).is_not_in(ids.iter().copied()),
            Predicate::ContainerTree { roots, depth } => Expr::cust(format!(
                "{t}.pid IN (WITH RECURSIVE tree (uid, depth) AS (\
                 SELECT root, 0 FROM unnest(ARRAY[{roots}]::integer[]) AS root \
                 UNION SELECT {PAGES_TABLE}.uid, tree.depth + 1 FROM {PAGES_TABLE} \
                 INNER JOIN tree ON {PAGES_TABLE}.pid = tree.uid \
                 WHERE tree.depth < {depth} AND {PAGES_TABLE}.deleted = FALSE\
                 ) SELECT uid FROM tree)",
                roots = id_list(roots),
            )),
            Predicate::ContainerIn(ids) => Expr::col(self.col("pid")).is_in(ids.iter().copied()),

            Predicate::KindIn(kinds) => {
                Expr::col(self.col("object_type")).is_in(kinds.iter().map(|kind| kind.code()))
            }
            Predicate::TimeFrame { frame, now } => self.time_frame(*frame, *now),
            Predicate::Related { relation, ids } => {
                let mm = relation.table();
                let owner = self.relation_owner(*relation);
                Expr::cust(format!(
                    "EXISTS (SELECT 1 FROM {mm} AS rel WHERE rel.uid_local = {owner} \
                     AND rel.uid_foreign IN ({ids}))",
                    ids = id_list(ids),
                ))
            }
            Predicate::EventTypeIn(ids) => Expr::cust(format!(
                "{event_type} IN ({ids})",
                event_type = self.effective_event_type(),
                ids = id_list(ids),
            )),
            Predicate::PlaceAttributeIn { attribute, values } => {
                let mm = Relation::Places.table();
                let column = attribute.column();
                Expr::cust_with_values(
                    format!(
                        "EXISTS (SELECT 1 FROM {mm} AS rel \
                         INNER JOIN places ON places.uid = rel.uid_foreign \
                         WHERE rel.uid_local = {t}.uid AND places.deleted = FALSE \
                         AND places.{column} IN ({values}))",
                        values = placeholders(values.len()),
                    ),
                    values.iter().cloned(),
                )
            }
            Predicate::LanguageIn(languages) => {
                Expr::col(self.col("language")).is_in(languages.iter().cloned())
            }
            Predicate::FullText(tokens) => {
                if tokens.is_empty() {
                    return Expr::cust("TRUE");
                }
                tokens
                    .iter()
                    .fold(Cond::all(), |cond, token| cond.add(self.search_token(token)))
                    .into()
            }
            Predicate::PriceAtMost { bound, now } => {
                let (regular, special) = self.resolved_prices(*now);
                Expr::cust(format!(
                    "({regular} <= {bound} OR ({special} > 0 AND {special} <= {bound}))"
                ))
            }
            Predicate::PriceAtLeast { bound, now } => {
                let (regular, special) = self.resolved_prices(*now);
                Expr::cust(format!(
                    "({regular} >= {bound} OR ({special} > 0 AND {special} >= {bound}))"
                ))
            }
            Predicate::HasVacancy => Expr::cust(format!(
                "({t}.needs_registration = FALSE OR {t}.attendees_max = 0 \
                 OR {t}.offline_attendees + COALESCE((SELECT SUM(GREATEST(registrations.seats, 1)) \
                 FROM registrations WHERE registrations.seminar = {t}.uid \
                 AND registrations.deleted = FALSE \
                 AND registrations.registration_queue = FALSE), 0) < {t}.attendees_max)"
            )),
            Predicate::AgeWithin(age) => {
                let mm = Relation::TargetGroups.table();
                let owner = self.relation_owner(Relation::TargetGroups);
                Expr::cust(format!(
                    "(NOT EXISTS (SELECT 1 FROM {mm} AS rel \
                     INNER JOIN target_groups ON target_groups.uid = rel.uid_foreign \
                     WHERE rel.uid_local = {owner} AND target_groups.deleted = FALSE) \
                     OR EXISTS (SELECT 1 FROM {mm} AS rel \
                     INNER JOIN target_groups ON target_groups.uid = rel.uid_foreign \
                     WHERE rel.uid_local = {owner} AND target_groups.deleted = FALSE \
                     AND (target_groups.minimum_age = 0 OR target_groups.minimum_age <= {age}) \
                     AND (target_groups.maximum_age = 0 OR target_groups.maximum_age >= {age})))"
                ))
            }
            Predicate::StatusIn(statuses) => {
                Expr::col(self.col("cancelled")).is_in(statuses.iter().map(|status| status.code()))
            }
            Predicate::Owner(user) => Expr::col(self.col("owner_feuser")).eq(*user),
            Predicate::DatesOfTopic(topic) => Cond::all()
                .add(Expr::col(self.col("object_type")).eq(EventKind::Date.code()))
                .add(Expr::col(self.col("topic")).eq(*topic))
                .into(),
            Predicate::RequiredBy(anchor) => {
                let mm = Relation::Requirements.table();
                Expr::cust(format!(
                    "{t}.uid IN (SELECT rel.uid_foreign FROM {mm} AS rel WHERE rel.uid_local = {anchor})"
                ))
            }
            Predicate::DependingOn(anchor) => {
                let mm = Relation::Requirements.table();
                Expr::cust(format!(
                    "({t}.uid IN (SELECT rel.uid_local FROM {mm} AS rel WHERE rel.uid_foreign = {anchor}) \
                     AND {t}.uid NOT IN (SELECT rel.uid_foreign FROM {mm} AS rel WHERE rel.uid_local = {anchor}) \
                     AND {t}.uid <> {anchor})"
                ))
            }
            Predicate::BeginOrEndAtLeast(at) => {
                let at = at.timestamp();
                Expr::cust(format!("({t}.begin_date >= {at} OR {t}.end_date >= {at})"))
            }
            Predicate::BeginOrEndAtMost(at) => {
                let at = at.timestamp();
                Expr::cust(format!("({t}.begin_date <= {at} OR {t}.end_date <= {at})"))
            }
            Predicate::BeginWithin { from, to } => Expr::col(self.col("begin_date"))
                .between(from.timestamp(), to.timestamp()),

            Predicate::ForEvents(events) => {
                Expr::col(self.col("seminar")).is_in(events.iter().copied())
            }
            Predicate::Paid(paid) => Expr::col(self.col("paid")).eq(*paid),
            Predicate::OnQueue(queued) => Expr::col(self.col("registration_queue")).eq(*queued),
            Predicate::SeatsAtMost(seats) => Expr::col(self.col("seats")).lte(*seats),
            Predicate::Attendee(user) => {
                let mm = Relation::AdditionalPersons.table();
                Cond::any()
                    .add(Expr::col(self.col("user")).eq(*user))
                    .add(Expr::cust(format!(
                        "EXISTS (SELECT 1 FROM {mm} AS rel WHERE rel.uid_local = {t}.uid \
                         AND rel.uid_foreign = {user})"
                    )))
                    .into()
            }
            Predicate::HasUser => Expr::col(self.col("user")).is_not_null(),

            Predicate::RelatedToEvents { relation, events } => {
                let mm = relation.table();
                Expr::cust(format!(
                    "EXISTS (SELECT 1 FROM {mm} AS rel WHERE rel.uid_foreign = {t}.uid \
                     AND rel.uid_local IN ({events}))",
                    events = id_list(events),
                ))
            }
        }
    }

    fn time_frame(&self, frame: TimeFrame, now: DateTime<Utc>) -> SimpleExpr {
        let t = self.table;
        let begin = format!("{t}.begin_date");
        let end = format!("{t}.end_date");
        let deadline = format!("{t}.deadline_registration");
        let at = now.timestamp();

        let past = format!("({end} IS NOT NULL AND {end} < {at})");
        let current =
            format!("({begin} IS NOT NULL AND {begin} <= {at} AND ({end} IS NULL OR {end} >= {at}))");
        let upcoming = format!("({begin} IS NULL OR {begin} > {at})");

        let sql = match frame {
            TimeFrame::Past => past,
            TimeFrame::PastAndCurrent => format!("({past} OR {current})"),
            TimeFrame::Current => current,
            TimeFrame::CurrentAndUpcoming => format!("({current} OR {upcoming})"),
            TimeFrame::Upcoming => upcoming,
            TimeFrame::UpcomingWithBeginDate => format!("({begin} IS NOT NULL AND {begin} > {at})"),
            TimeFrame::DeadlineNotOver => format!(
                "(({deadline} IS NOT NULL AND {deadline} > {at}) OR ({deadline} IS NULL AND {upcoming}))"
            ),
            TimeFrame::Today => {
                let (start_of_day, end_of_day) = day_bounds(now);
                format!(
                    "({begin} IS NOT NULL AND {begin} <= {end_of_day} AND ({end} IS NULL OR {end} >= {start_of_day}))",
                    end_of_day = end_of_day.timestamp(),
                    start_of_day = start_of_day.timestamp(),
                )
            }
            TimeFrame::All => "TRUE".to_string(),
        };
        Expr::cust(sql)
    }

    /// Uid whose mm rows count for `relation`: a date without own rows of an
    /// inheriting relation uses its topic's rows.
    fn relation_owner(&self, relation: Relation) -> String {
        let t = self.table;
        if t != Event::TABLE || !relation.inherits_from_topic() {
            return format!("{t}.uid");
        }
        let mm = relation.table();
        format!(
            "(CASE WHEN {t}.object_type = {date} \
             AND NOT EXISTS (SELECT 1 FROM {mm} AS own WHERE own.uid_local = {t}.uid) \
             THEN {t}.topic ELSE {t}.uid END)",
            date = EventKind::Date.code(),
        )
    }

    fn effective_text(&self, column: &str) -> String {
        let t = self.table;
        let topic = Join::Topic.alias();
        format!("COALESCE(NULLIF({t}.{column}, ''), {topic}.{column}, '')")
    }

    fn effective_price(&self, column: &str) -> String {
        let t = self.table;
        let topic = Join::Topic.alias();
        format!("COALESCE(NULLIF({t}.{column}, 0), {topic}.{column}, 0)")
    }

    fn effective_event_type(&self) -> String {
        let t = self.table;
        let topic = Join::Topic.alias();
        format!("COALESCE({t}.event_type, {topic}.event_type)")
    }

    /// Regular and special price applicable at `now`, as SQL expressions.
    fn resolved_prices(&self, now: DateTime<Utc>) -> (String, String) {
        let t = self.table;
        let topic = Join::Topic.alias();
        let deadline = format!("COALESCE({t}.deadline_early_bird, {topic}.deadline_early_bird)");
        let early_bird = format!("({deadline} IS NOT NULL AND {deadline} > {})", now.timestamp());

        let resolve = |ordinary: &str, early: &str| {
            let ordinary = self.effective_price(ordinary);
            let early = self.effective_price(early);
            format!("(CASE WHEN {early_bird} AND {early} > 0 THEN {early} ELSE {ordinary} END)")
        };
        (
            resolve("price_regular", "price_regular_early"),
            resolve("price_special", "price_special_early"),
        )
    }

    /// One search token, matched case-insensitively against every searchable field.
    fn search_token(&self, token: &str) -> SimpleExpr {
        let t = self.table;
        let pattern = format!("%{}%", escape_like_wildcards(&token.to_lowercase()));

        let mut clauses: Vec<String> = Vec::new();
        let mut next = 0usize;
        let mut placeholder = || {
            next += 1;
            format!("${next}")
        };

        for column in ["title", "subtitle", "description", "accreditation_number"] {
            clauses.push(format!(
                "LOWER({}) LIKE {}",
                self.effective_text(column),
                placeholder()
            ));
        }

        let speakers = Relation::Speakers.table();
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM {speakers} AS rel INNER JOIN speakers ON speakers.uid = rel.uid_foreign \
             WHERE rel.uid_local = {t}.uid AND speakers.deleted = FALSE AND LOWER(speakers.title) LIKE {})",
            placeholder()
        ));

        let places = Relation::Places.table();
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM {places} AS rel INNER JOIN places ON places.uid = rel.uid_foreign \
             WHERE rel.uid_local = {t}.uid AND places.deleted = FALSE \
             AND (LOWER(places.title) LIKE {} OR LOWER(places.city) LIKE {}))",
            placeholder(),
            placeholder()
        ));

        clauses.push(format!(
            "EXISTS (SELECT 1 FROM event_types WHERE event_types.uid = {event_type} \
             AND event_types.deleted = FALSE AND LOWER(event_types.title) LIKE {})",
            placeholder(),
            event_type = self.effective_event_type(),
        ));

        let categories = Relation::Categories.table();
        let owner = self.relation_owner(Relation::Categories);
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM {categories} AS rel INNER JOIN categories ON categories.uid = rel.uid_foreign \
             WHERE rel.uid_local = {owner} AND categories.deleted = FALSE AND LOWER(categories.title) LIKE {})",
            placeholder()
        ));

        let values = vec![pattern; next];
        Expr::cust_with_values(format!("({})", clauses.join(" OR ")), values)
    }

    /// Smallest mm position of the record on any of `events`.
    fn relation_position(&self, relation: Relation, events: &BTreeSet<u32>) -> SimpleExpr {
        let t = self.table;
        let mm = relation.table();
        Expr::cust(format!(
            "(SELECT MIN(rel.sorting) FROM {mm} AS rel WHERE rel.uid_foreign = {t}.uid \
             AND rel.uid_local IN ({events}))",
            events = id_list(events),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::bag::predicate::PlaceAttribute;
    use crate::bag::query::{Limit, SortKey};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn query(table: &'static str, conjuncts: Vec<Predicate>) -> CompiledQuery {
        let mut predicate = vec![Predicate::Visible {
            now: now(),
            show_hidden: false,
        }];
        predicate.extend(conjuncts);
        CompiledQuery {
            table,
            predicate: Predicate::All(predicate),
            order: vec![SortKey::tie_breaker()],
            limit: None,
            joins: BTreeSet::new(),
        }
    }

    #[test]
    fn select_has_visibility_order_and_limit() {
        let mut q = query("categories", vec![]);
        q.limit = Some(Limit {
            offset: 20,
            count: 10,
        });
        let sql = select_sql(&q);

        assert!(sql.contains("FROM \"categories\""));
        assert!(sql.contains("\"categories\".\"deleted\" = FALSE"));
        assert!(sql.contains("\"categories\".\"hidden\" = FALSE"));
        assert!(sql.contains("ORDER BY \"categories\".\"uid\" ASC"));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
    }

    #[test]
    fn back_end_visibility_only_checks_deleted() {
        let mut q = query("categories", vec![]);
        q.predicate = Predicate::All(vec![Predicate::Visible {
            now: now(),
            show_hidden: true,
        }]);
        let sql = select_sql(&q);
        assert!(sql.contains("\"deleted\" = FALSE"));
        assert!(!sql.contains("hidden"));
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let mut q = query("seminars", vec![Predicate::HasVacancy]);
        q.limit = Some(Limit {
            offset: 0,
            count: 5,
        });
        let sql = count_sql(&q);

        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("registration_queue = FALSE"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn nothing_renders_false() {
        let sql = select_sql(&query("seminars", vec![Predicate::Nothing]));
        assert!(sql.contains("FALSE"));
    }

    #[test]
    fn inherited_relations_fall_back_to_topic() {
        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::Related {
                relation: Relation::Categories,
                ids: BTreeSet::from([3, 4]),
            }],
        ));
        assert!(sql.contains("seminars_categories_mm AS rel"));
        assert!(sql.contains("THEN seminars.topic ELSE seminars.uid END"));
        assert!(sql.contains("rel.uid_foreign IN (3, 4)"));

        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::Related {
                relation: Relation::Speakers,
                ids: BTreeSet::from([3]),
            }],
        ));
        assert!(sql.contains("rel.uid_local = seminars.uid"));
        assert!(!sql.contains("CASE WHEN"));
    }

    #[test]
    fn full_text_values_are_bound_and_escaped() {
        let mut q = query(
            "seminars",
            vec![Predicate::FullText(vec!["50%_off".to_string()])],
        );
        q.joins.insert(Join::Topic);
        let sql = select_sql(&q);

        assert!(sql.contains("LEFT JOIN \"seminars\" AS \"topic\""));
        assert!(sql.contains("COALESCE(NULLIF(seminars.title, ''), topic.title, '')"));
        assert!(sql.contains("off%'"));
        assert!(!sql.contains("$1"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like_wildcards(r"50%_off\"), r"50\%\_off\\");
    }

    #[test]
    fn place_values_are_quoted() {
        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::PlaceAttributeIn {
                attribute: PlaceAttribute::City,
                values: vec!["Bonn".to_string(), "Köln".to_string()],
            }],
        ));
        assert!(sql.contains("places.city IN ('Bonn', 'Köln')"));
    }

    #[test]
    fn container_tree_is_a_bounded_cte() {
        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::ContainerTree {
                roots: BTreeSet::from([7, 9]),
                depth: 2,
            }],
        ));
        assert!(sql.contains("WITH RECURSIVE tree"));
        assert!(sql.contains("ARRAY[7, 9]"));
        assert!(sql.contains("tree.depth < 2"));
    }

    #[test]
    fn price_uses_early_bird_and_topic_fallback() {
        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::PriceAtMost {
                bound: 50.0,
                now: now(),
            }],
        ));
        assert!(sql.contains("COALESCE(seminars.deadline_early_bird, topic.deadline_early_bird)"));
        assert!(sql.contains("> 1700000000"));
        assert!(sql.contains("<= 50"));
    }

    #[test]
    fn registration_user_column_is_quoted() {
        let sql = select_sql(&query("registrations", vec![Predicate::Attendee(5)]));
        assert!(sql.contains("\"registrations\".\"user\" = 5"));
        assert!(sql.contains("registrations_additional_persons_mm"));
    }

    #[test]
    fn relation_order_sorts_by_mm_position() {
        let mut q = query("speakers", vec![]);
        q.order.insert(
            0,
            SortKey::asc(SortTarget::RelationOrder {
                relation: Relation::Speakers,
                events: BTreeSet::from([1]),
            }),
        );
        let sql = select_sql(&q);
        assert!(sql.contains("MIN(rel.sorting)"));
        assert!(sql.contains("ORDER BY (SELECT MIN"));
    }

    #[test]
    fn registration_event_join() {
        let mut q = query("registrations", vec![]);
        q.joins.insert(Join::Event);
        q.order = vec![
            SortKey {
                target: SortTarget::EventColumn("begin_date"),
                direction: SortDirection::Desc,
            },
            SortKey::tie_breaker(),
        ];
        let sql = select_sql(&q);
        assert!(sql.contains("LEFT JOIN \"seminars\" AS \"event\""));
        assert!(sql.contains("\"event\".\"begin_date\" DESC"));
    }

    #[test]
    fn today_uses_day_bounds() {
        let sql = select_sql(&query(
            "seminars",
            vec![Predicate::TimeFrame {
                frame: TimeFrame::Today,
                now: now(),
            }],
        ));
        let (start, end) = day_bounds(now());
        assert!(sql.contains(&format!("seminars.begin_date <= {}", end.timestamp())));
        assert!(sql.contains(&format!("seminars.end_date >= {}", start.timestamp())));
    }

    #[test]
    fn age_ignores_deleted_target_groups() {
        let sql = select_sql(&query("seminars", vec![Predicate::AgeWithin(30)]));
        let (no_groups, matching) = sql.split_once(" OR EXISTS").unwrap();
        assert!(no_groups.contains("NOT EXISTS"));
        assert!(no_groups.contains("target_groups.deleted = FALSE"));
        assert!(matching.contains("target_groups.deleted = FALSE"));
        assert!(matching.contains("target_groups.minimum_age <= 30"));
    }

    #[test]
    fn json_rows_keep_the_ordered_statement() {
        let mut q = query("seminars", vec![]);
        q.limit = Some(Limit {
            offset: 2,
            count: 5,
        });
        let sql = select_json_sql(&q);
        assert!(sql.starts_with("SELECT row_to_json(seminars.*)"));
        assert!(sql.contains("ORDER BY \"seminars\".\"uid\" ASC"));
        assert!(sql.contains("LIMIT 5"));
        assert!(sql.contains("OFFSET 2"));
    }
}
