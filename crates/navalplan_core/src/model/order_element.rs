//! Order element hierarchy (work breakdown structure).
//!
//! # Responsibility
//! - Model container (`OrderLineGroup`) and leaf (`OrderLine`) nodes.
//! - Reconcile line totals with hours groups under each group's policy.
//!
//! # Invariants
//! - Only leaves own hours groups; containers expose their descendants'.
//! - After a successful `OrderLine::set_work_hours(total)`, the line's
//!   `work_hours()` equals `total`.
//! - Fixed percentages of one line never add up to more than 1.00.

use crate::model::hours_group::{
    full_percentage, hours_for, percentage_of, HoursGroup, HoursGroupId,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type OrderElementId = Uuid;

/// Errors raised by order element mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderElementError {
    NegativeHours(i64),
    /// Total cannot be reconciled with the fixed-percentage groups.
    InvalidTotalHours(i64),
    InvalidPercentage(BigDecimal),
    /// Fixed percentages of one line would exceed 1.00.
    PercentageOverflow(BigDecimal),
    /// Line total would not fit in `u32` hours.
    HoursOverflow(u64),
}

impl Display for OrderElementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeHours(value) => write!(f, "work hours must not be negative: {value}"),
            Self::InvalidTotalHours(value) => write!(
                f,
                "work hours {value} are not valid, taking into account the current list of hours groups"
            ),
            Self::InvalidPercentage(value) => {
                write!(f, "percentage must be between 0 and 1: {value}")
            }
            Self::PercentageOverflow(sum) => {
                write!(f, "fixed percentages add up to {sum}, more than 1")
            }
            Self::HoursOverflow(total) => {
                write!(f, "work hours {total} exceed the maximum of {}", u32::MAX)
            }
        }
    }
}

impl Error for OrderElementError {}

/// Leaf node carrying hours groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderElementId,
    pub name: String,
    pub code: Option<String>,
    pub hours_groups: Vec<HoursGroup>,
}

/// Container node grouping lines and other containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineGroup {
    pub id: OrderElementId,
    pub name: String,
    pub code: Option<String>,
    pub children: Vec<OrderElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderElement {
    Line(OrderLine),
    Group(OrderLineGroup),
}

impl OrderLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: OrderElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            hours_groups: Vec::new(),
        }
    }

    /// Sum of the group hours, saturating at `u32::MAX`.
    pub fn work_hours(&self) -> u32 {
        saturate_hours(self.total_hours())
    }

    fn total_hours(&self) -> u64 {
        self.hours_groups
            .iter()
            .map(|group| u64::from(group.working_hours))
            .sum()
    }

    pub fn add_hours_group(&mut self, hours_group: HoursGroup) {
        self.hours_groups.push(hours_group);
    }

    /// Returns whether a group with `id` was removed.
    pub fn delete_hours_group(&mut self, id: HoursGroupId) -> bool {
        let before = self.hours_groups.len();
        self.hours_groups.retain(|group| group.id != id);
        self.hours_groups.len() != before
    }

    pub fn hours_group(&self, id: HoursGroupId) -> Option<&HoursGroup> {
        self.hours_groups.iter().find(|group| group.id == id)
    }

    pub fn hours_group_mut(&mut self, id: HoursGroupId) -> Option<&mut HoursGroup> {
        self.hours_groups.iter_mut().find(|group| group.id == id)
    }

    /// Checks whether `total` can be split among the current hours groups.
    pub fn is_total_hours_valid(&self, total: i64) -> bool {
        let Ok(total) = u32::try_from(total) else {
            return false;
        };
        let fixed_hours: u64 = self
            .hours_groups
            .iter()
            .filter(|group| group.is_fixed_percentage())
            .map(|group| u64::from(hours_for(&group.percentage, total)))
            .sum();
        fixed_hours <= u64::from(total)
    }

    pub fn fixed_percentage_sum(&self) -> BigDecimal {
        self.hours_groups
            .iter()
            .filter(|group| group.is_fixed_percentage())
            .fold(BigDecimal::from(0_i64), |sum, group| {
                sum + group.percentage.clone()
            })
    }

    pub fn is_percentage_valid(&self) -> bool {
        self.fixed_percentage_sum() <= full_percentage()
    }

    /// Sets the line total and redistributes it over the hours groups.
    ///
    /// # Errors
    /// - `NegativeHours` for totals below 0.
    /// - `InvalidTotalHours` when fixed-percentage groups need more than `total`.
    pub fn set_work_hours(&mut self, total: i64) -> Result<(), OrderElementError> {
        if total < 0 {
            return Err(OrderElementError::NegativeHours(total));
        }
        let hours = u32::try_from(total).map_err(|_| OrderElementError::InvalidTotalHours(total))?;

        match self.hours_groups.len() {
            0 => {
                let mut group = HoursGroup::with_hours(hours);
                group.percentage = full_percentage();
                self.hours_groups.push(group);
            }
            1 => {
                let only = &mut self.hours_groups[0];
                only.working_hours = hours;
                only.percentage = full_percentage();
            }
            _ => {
                if !self.is_total_hours_valid(total) {
                    return Err(OrderElementError::InvalidTotalHours(total));
                }
                self.redistribute(hours);
            }
        }
        Ok(())
    }

    /// Re-derives fixed-group hours and free-group percentages from the
    /// current total.
    ///
    /// # Errors
    /// - `HoursOverflow` when the current or the resulting total exceeds
    ///   `u32::MAX`; the line is left untouched.
    pub fn recalculate_hours_groups(&mut self) -> Result<(), OrderElementError> {
        let current = self.total_hours();
        let total = u32::try_from(current).map_err(|_| OrderElementError::HoursOverflow(current))?;

        let hours: Vec<u32> = self
            .hours_groups
            .iter()
            .map(|group| {
                if group.is_fixed_percentage() {
                    hours_for(&group.percentage, total)
                } else {
                    group.working_hours
                }
            })
            .collect();
        let next: u64 = hours.iter().map(|value| u64::from(*value)).sum();
        let next = u32::try_from(next).map_err(|_| OrderElementError::HoursOverflow(next))?;

        for (group, value) in self.hours_groups.iter_mut().zip(hours) {
            group.working_hours = value;
        }
        self.refresh_free_percentages(next);
        Ok(())
    }

    fn redistribute(&mut self, total: u32) {
        let mut fixed_hours = 0_u64;
        for group in self
            .hours_groups
            .iter_mut()
            .filter(|group| group.is_fixed_percentage())
        {
            group.working_hours = hours_for(&group.percentage, total);
            fixed_hours += u64::from(group.working_hours);
        }
        let remainder = saturate_hours(u64::from(total).saturating_sub(fixed_hours));

        let free: Vec<usize> = self
            .hours_groups
            .iter()
            .enumerate()
            .filter(|(_, group)| !group.is_fixed_percentage())
            .map(|(index, _)| index)
            .collect();

        if let Some(&first) = free.first() {
            let previous: u64 = free
                .iter()
                .map(|&index| u64::from(self.hours_groups[index].working_hours))
                .sum();
            let mut assigned = 0_u32;
            for &index in &free {
                let share = if previous == 0 {
                    remainder / free.len() as u32
                } else {
                    let weighted = u64::from(self.hours_groups[index].working_hours)
                        * u64::from(remainder)
                        / previous;
                    weighted as u32
                };
                self.hours_groups[index].working_hours = share;
                assigned += share;
            }
            self.hours_groups[first].working_hours += remainder - assigned;
        } else if remainder > 0 {
            self.hours_groups.push(HoursGroup::with_hours(remainder));
        }

        self.refresh_free_percentages(total);
    }

    fn refresh_free_percentages(&mut self, total: u32) {
        for group in self
            .hours_groups
            .iter_mut()
            .filter(|group| !group.is_fixed_percentage())
        {
            group.percentage = percentage_of(group.working_hours, total);
        }
    }
}

impl OrderLineGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: OrderElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            code: None,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: impl Into<OrderElement>) {
        self.children.push(child.into());
    }

    /// Sum of the children's hours, saturating at `u32::MAX`.
    pub fn work_hours(&self) -> u32 {
        saturate_hours(
            self.children
                .iter()
                .map(|child| u64::from(child.work_hours()))
                .sum(),
        )
    }
}

impl From<OrderLine> for OrderElement {
    fn from(value: OrderLine) -> Self {
        Self::Line(value)
    }
}

impl From<OrderLineGroup> for OrderElement {
    fn from(value: OrderLineGroup) -> Self {
        Self::Group(value)
    }
}

impl OrderElement {
    pub fn id(&self) -> OrderElementId {
        match self {
            Self::Line(line) => line.id,
            Self::Group(group) => group.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Line(line) => &line.name,
            Self::Group(group) => &group.name,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Line(line) => line.code.as_deref(),
            Self::Group(group) => group.code.as_deref(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Line(_))
    }

    pub fn as_line(&self) -> Option<&OrderLine> {
        match self {
            Self::Line(line) => Some(line),
            Self::Group(_) => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut OrderLine> {
        match self {
            Self::Line(line) => Some(line),
            Self::Group(_) => None,
        }
    }

    pub fn work_hours(&self) -> u32 {
        match self {
            Self::Line(line) => line.work_hours(),
            Self::Group(group) => group.work_hours(),
        }
    }

    /// Own groups for a line; every descendant line's groups, in tree order,
    /// for a container.
    pub fn hours_groups(&self) -> Vec<&HoursGroup> {
        let mut out = Vec::new();
        self.collect_hours_groups(&mut out);
        out
    }

    pub fn hours_groups_mut(&mut self) -> Vec<&mut HoursGroup> {
        let mut out = Vec::new();
        self.collect_hours_groups_mut(&mut out);
        out
    }

    pub fn find(&self, id: OrderElementId) -> Option<&OrderElement> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Self::Line(_) => None,
            Self::Group(group) => group.children.iter().find_map(|child| child.find(id)),
        }
    }

    pub fn find_mut(&mut self, id: OrderElementId) -> Option<&mut OrderElement> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Self::Line(_) => None,
            Self::Group(group) => group
                .children
                .iter_mut()
                .find_map(|child| child.find_mut(id)),
        }
    }

    fn collect_hours_groups<'a>(&'a self, out: &mut Vec<&'a HoursGroup>) {
        match self {
            Self::Line(line) => out.extend(line.hours_groups.iter()),
            Self::Group(group) => {
                for child in &group.children {
                    child.collect_hours_groups(out);
                }
            }
        }
    }

    fn collect_hours_groups_mut<'a>(&'a mut self, out: &mut Vec<&'a mut HoursGroup>) {
        match self {
            Self::Line(line) => out.extend(line.hours_groups.iter_mut()),
            Self::Group(group) => {
                for child in &mut group.children {
                    child.collect_hours_groups_mut(out);
                }
            }
        }
    }
}

fn saturate_hours(total: u64) -> u32 {
    u32::try_from(total).unwrap_or(u32::MAX)
}
