//! Order element tree persistence.
//!
//! # Responsibility
//! - Store order element subtrees with their hours groups and criteria links.
//! - Rebuild the in-memory `OrderElement` tree from rows.
//!
//! # Invariants
//! - `save_order_element` replaces the whole persisted subtree atomically and
//!   keeps the element's existing parent/position.
//! - Children and hours groups load in `sort_order ASC` order.
//! - Criteria referenced by hours groups must already be persisted.

use crate::db::{ensure_connection_ready, DbError};
use crate::model::hours_group::{HoursGroup, HoursGroupPolicy, PERCENTAGE_SCALE};
use crate::model::order_element::{OrderElement, OrderElementId, OrderLine, OrderLineGroup};
use crate::repo::criterion_repo::{parse_criterion_row, CriterionRepoError};
use crate::repo::parse_uuid;
use bigdecimal::BigDecimal;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type OrderRepoResult<T> = Result<T, OrderRepoError>;

#[derive(Debug)]
pub enum OrderRepoError {
    Db(DbError),
    NotFound(OrderElementId),
    InvalidData(String),
}

impl Display for OrderRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "order element not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted order data: {message}"),
        }
    }
}

impl Error for OrderRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for OrderRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for OrderRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CriterionRepoError> for OrderRepoError {
    fn from(value: CriterionRepoError) -> Self {
        match value {
            CriterionRepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Root-level order element summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderElementSummary {
    pub id: OrderElementId,
    pub name: String,
    pub is_leaf: bool,
}

pub trait OrderRepository {
    fn save_order_element(&self, element: &OrderElement) -> OrderRepoResult<()>;
    fn load_order_element(&self, id: OrderElementId) -> OrderRepoResult<Option<OrderElement>>;
    fn list_root_elements(&self) -> OrderRepoResult<Vec<OrderElementSummary>>;
    fn delete_order_element(&self, id: OrderElementId) -> OrderRepoResult<()>;
}

pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> OrderRepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn save_order_element(&self, element: &OrderElement) -> OrderRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let placement: Option<(Option<String>, i64)> = tx
            .query_row(
                "SELECT parent_id, sort_order FROM order_elements WHERE id = ?1;",
                [element.id().to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (parent_id, sort_order) = match placement {
            Some(existing) => existing,
            None => (None, next_root_sort_order(&tx)?),
        };

        tx.execute(
            "DELETE FROM order_elements WHERE id = ?1;",
            [element.id().to_string()],
        )?;
        insert_element(&tx, element, parent_id.as_deref(), sort_order)?;
        tx.commit()?;

        info!(
            "event=order_element_save module=repo status=ok order_element_id={} hours_groups={}",
            element.id(),
            element.hours_groups().len()
        );
        Ok(())
    }

    fn load_order_element(&self, id: OrderElementId) -> OrderRepoResult<Option<OrderElement>> {
        let row: Option<(String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT kind, name, code FROM order_elements WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((kind, name, code)) = row else {
            return Ok(None);
        };

        let element = match kind.as_str() {
            "line" => {
                let mut line = OrderLine::with_id(id, name);
                line.code = code;
                line.hours_groups = load_hours_groups(self.conn, id)?;
                OrderElement::Line(line)
            }
            "group" => {
                let mut group = OrderLineGroup::with_id(id, name);
                group.code = code;
                for child_id in list_child_ids(self.conn, id)? {
                    let child = self
                        .load_order_element(child_id)?
                        .ok_or(OrderRepoError::NotFound(child_id))?;
                    group.children.push(child);
                }
                OrderElement::Group(group)
            }
            other => {
                return Err(OrderRepoError::InvalidData(format!(
                    "invalid order element kind `{other}` in order_elements.kind"
                )));
            }
        };
        Ok(Some(element))
    }

    fn list_root_elements(&self) -> OrderRepoResult<Vec<OrderElementSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, kind
             FROM order_elements
             WHERE parent_id IS NULL
             ORDER BY sort_order ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let kind: String = row.get("kind")?;
            items.push(OrderElementSummary {
                id: parse_uuid(&id_text, "order_elements.id").map_err(OrderRepoError::InvalidData)?,
                name: row.get("name")?,
                is_leaf: kind == "line",
            });
        }
        Ok(items)
    }

    fn delete_order_element(&self, id: OrderElementId) -> OrderRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM order_elements WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(OrderRepoError::NotFound(id));
        }
        Ok(())
    }
}

fn insert_element(
    conn: &Connection,
    element: &OrderElement,
    parent_id: Option<&str>,
    sort_order: i64,
) -> OrderRepoResult<()> {
    let kind = if element.is_leaf() { "line" } else { "group" };
    let id = element.id().to_string();
    conn.execute(
        "INSERT INTO order_elements (id, parent_id, kind, name, code, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![id, parent_id, kind, element.name(), element.code(), sort_order],
    )?;

    match element {
        OrderElement::Line(line) => {
            for (index, group) in line.hours_groups.iter().enumerate() {
                insert_hours_group(conn, &id, group, index as i64)?;
            }
        }
        OrderElement::Group(group) => {
            for (index, child) in group.children.iter().enumerate() {
                insert_element(conn, child, Some(id.as_str()), index as i64)?;
            }
        }
    }
    Ok(())
}

fn insert_hours_group(
    conn: &Connection,
    order_line_id: &str,
    group: &HoursGroup,
    sort_order: i64,
) -> OrderRepoResult<()> {
    let group_id = group.id.to_string();
    conn.execute(
        "INSERT INTO hours_groups (
            id,
            order_line_id,
            working_hours,
            percentage,
            policy,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            group_id,
            order_line_id,
            i64::from(group.working_hours),
            group.percentage.with_scale(PERCENTAGE_SCALE).to_string(),
            policy_to_db(group.policy),
            sort_order,
        ],
    )?;
    for criterion in &group.criteria {
        conn.execute(
            "INSERT INTO hours_group_criteria (hours_group_id, criterion_id) VALUES (?1, ?2);",
            params![group_id, criterion.id.to_string()],
        )?;
    }
    Ok(())
}

fn load_hours_groups(
    conn: &Connection,
    order_line_id: OrderElementId,
) -> OrderRepoResult<Vec<HoursGroup>> {
    let mut stmt = conn.prepare(
        "SELECT id, working_hours, percentage, policy
         FROM hours_groups
         WHERE order_line_id = ?1
         ORDER BY sort_order ASC, id ASC;",
    )?;
    let mut rows = stmt.query([order_line_id.to_string()])?;
    let mut groups = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let hours: i64 = row.get("working_hours")?;
        let percentage_text: String = row.get("percentage")?;
        let policy_text: String = row.get("policy")?;

        let mut group = HoursGroup::with_id(
            parse_uuid(&id_text, "hours_groups.id").map_err(OrderRepoError::InvalidData)?,
        );
        group.working_hours = u32::try_from(hours).map_err(|_| {
            OrderRepoError::InvalidData(format!(
                "invalid working_hours `{hours}` in hours_groups.working_hours"
            ))
        })?;
        group.percentage = BigDecimal::from_str(&percentage_text)
            .map_err(|_| {
                OrderRepoError::InvalidData(format!(
                    "invalid percentage `{percentage_text}` in hours_groups.percentage"
                ))
            })?
            .with_scale(PERCENTAGE_SCALE);
        group.policy = parse_policy(&policy_text).ok_or_else(|| {
            OrderRepoError::InvalidData(format!(
                "invalid policy `{policy_text}` in hours_groups.policy"
            ))
        })?;
        group.criteria = load_hours_group_criteria(conn, &id_text)?;
        groups.push(group);
    }
    Ok(groups)
}

fn load_hours_group_criteria(
    conn: &Connection,
    hours_group_id: &str,
) -> OrderRepoResult<Vec<crate::model::criterion::Criterion>> {
    let mut stmt = conn.prepare(
        "SELECT c.id AS id,
                c.criterion_type_id AS criterion_type_id,
                c.name AS name,
                c.active AS active
         FROM hours_group_criteria hgc
         INNER JOIN criteria c ON c.id = hgc.criterion_id
         WHERE hgc.hours_group_id = ?1
         ORDER BY c.name ASC, c.id ASC;",
    )?;
    let mut rows = stmt.query([hours_group_id])?;
    let mut criteria = Vec::new();
    while let Some(row) = rows.next()? {
        criteria.push(parse_criterion_row(row)?);
    }
    Ok(criteria)
}

fn list_child_ids(
    conn: &Connection,
    parent_id: OrderElementId,
) -> OrderRepoResult<Vec<OrderElementId>> {
    let mut stmt = conn.prepare(
        "SELECT id
         FROM order_elements
         WHERE parent_id = ?1
         ORDER BY sort_order ASC, id ASC;",
    )?;
    let mut rows = stmt.query([parent_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "order_elements.id").map_err(OrderRepoError::InvalidData)?);
    }
    Ok(ids)
}

fn next_root_sort_order(conn: &Connection) -> OrderRepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM order_elements
         WHERE parent_id IS NULL;",
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn policy_to_db(policy: HoursGroupPolicy) -> &'static str {
    match policy {
        HoursGroupPolicy::NoFixed => "no_fixed",
        HoursGroupPolicy::FixedPercentage => "fixed_percentage",
    }
}

fn parse_policy(value: &str) -> Option<HoursGroupPolicy> {
    match value {
        "no_fixed" => Some(HoursGroupPolicy::NoFixed),
        "fixed_percentage" => Some(HoursGroupPolicy::FixedPercentage),
        _ => None,
    }
}
