//! Hours group model.
//!
//! # Responsibility
//! - Carry working hours of an order line tagged with scheduling criteria.
//! - Own percentage arithmetic shared by line reconciliation and rendering.
//!
//! # Invariants
//! - At most one criterion per criterion type.
//! - `percentage` is kept at scale 2 and within `[0, 1]`.

use crate::model::criterion::{Criterion, CriterionId, CriterionTypeId};
use crate::model::order_element::OrderElementError;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type HoursGroupId = Uuid;

pub(crate) const PERCENTAGE_SCALE: i64 = 2;

/// How an hours group reacts when the line total changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursGroupPolicy {
    /// Hours are edited directly; the percentage follows them.
    #[default]
    NoFixed,
    /// The percentage is edited directly; hours follow the line total.
    FixedPercentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursGroup {
    pub id: HoursGroupId,
    pub working_hours: u32,
    pub percentage: BigDecimal,
    pub policy: HoursGroupPolicy,
    pub criteria: Vec<Criterion>,
}

impl Default for HoursGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl HoursGroup {
    /// Creates an empty `NoFixed` group with zero hours.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: HoursGroupId) -> Self {
        Self {
            id,
            working_hours: 0,
            percentage: zero_percentage(),
            policy: HoursGroupPolicy::NoFixed,
            criteria: Vec::new(),
        }
    }

    pub fn with_hours(working_hours: u32) -> Self {
        let mut group = Self::new();
        group.working_hours = working_hours;
        group
    }

    pub fn is_fixed_percentage(&self) -> bool {
        self.policy == HoursGroupPolicy::FixedPercentage
    }

    pub fn set_fixed_percentage(&mut self, fixed: bool) {
        self.policy = if fixed {
            HoursGroupPolicy::FixedPercentage
        } else {
            HoursGroupPolicy::NoFixed
        };
    }

    pub fn set_working_hours(&mut self, working_hours: u32) {
        self.working_hours = working_hours;
    }

    /// Sets the percentage, truncated to two decimals.
    ///
    /// # Errors
    /// - `InvalidPercentage` when the value is below 0 or above 1.
    pub fn set_percentage(&mut self, percentage: BigDecimal) -> Result<(), OrderElementError> {
        if percentage < BigDecimal::from(0_i64) || percentage > BigDecimal::from(1_i64) {
            return Err(OrderElementError::InvalidPercentage(percentage));
        }
        self.percentage = percentage.with_scale(PERCENTAGE_SCALE);
        Ok(())
    }

    pub fn criterion_by_type(&self, type_id: CriterionTypeId) -> Option<&Criterion> {
        self.criteria
            .iter()
            .find(|criterion| criterion.is_of_type(type_id))
    }

    /// Adds a criterion, replacing any criterion of the same type.
    pub fn add_criterion(&mut self, criterion: Criterion) {
        self.remove_criterion_by_type(criterion.criterion_type);
        self.criteria.push(criterion);
    }

    pub fn remove_criterion(&mut self, criterion_id: CriterionId) {
        self.criteria.retain(|criterion| criterion.id != criterion_id);
    }

    pub fn remove_criterion_by_type(&mut self, type_id: CriterionTypeId) {
        self.criteria.retain(|criterion| !criterion.is_of_type(type_id));
    }
}

pub(crate) fn zero_percentage() -> BigDecimal {
    BigDecimal::from(0_i64).with_scale(PERCENTAGE_SCALE)
}

pub(crate) fn full_percentage() -> BigDecimal {
    BigDecimal::from(1_i64).with_scale(PERCENTAGE_SCALE)
}

/// `hours / total` truncated to two decimals; 0.00 when `total` is 0.
pub(crate) fn percentage_of(hours: u32, total: u32) -> BigDecimal {
    if total == 0 {
        return zero_percentage();
    }
    (BigDecimal::from(i64::from(hours)) / BigDecimal::from(i64::from(total)))
        .with_scale(PERCENTAGE_SCALE)
}

/// `floor(percentage * total)`.
pub(crate) fn hours_for(percentage: &BigDecimal, total: u32) -> u32 {
    (percentage.clone() * BigDecimal::from(i64::from(total)))
        .with_scale(0)
        .to_u32()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{hours_for, percentage_of, HoursGroup, HoursGroupPolicy};
    use crate::model::criterion::{Criterion, CriterionType};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn pct(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn new_group_is_empty_and_not_fixed() {
        let group = HoursGroup::new();
        assert_eq!(group.working_hours, 0);
        assert_eq!(group.policy, HoursGroupPolicy::NoFixed);
        assert_eq!(group.percentage.to_string(), "0.00");
        assert!(group.criteria.is_empty());
    }

    #[test]
    fn add_criterion_replaces_same_type() {
        let skill = CriterionType::new("Skill");
        let welding = Criterion::new(&skill, "Welding");
        let painting = Criterion::new(&skill, "Painting");
        let department = CriterionType::new("Department");
        let hull = Criterion::new(&department, "Hull");

        let mut group = HoursGroup::new();
        group.add_criterion(welding);
        group.add_criterion(hull.clone());
        group.add_criterion(painting.clone());

        assert_eq!(group.criteria.len(), 2);
        assert_eq!(group.criterion_by_type(skill.id), Some(&painting));
        assert_eq!(group.criterion_by_type(department.id), Some(&hull));
    }

    #[test]
    fn remove_criterion_by_type_keeps_other_types() {
        let skill = CriterionType::new("Skill");
        let department = CriterionType::new("Department");
        let mut group = HoursGroup::new();
        group.add_criterion(Criterion::new(&skill, "Welding"));
        group.add_criterion(Criterion::new(&department, "Hull"));

        group.remove_criterion_by_type(skill.id);
        assert!(group.criterion_by_type(skill.id).is_none());
        assert!(group.criterion_by_type(department.id).is_some());
    }

    #[test]
    fn set_percentage_truncates_and_rejects_out_of_range() {
        let mut group = HoursGroup::new();
        group.set_percentage(pct("0.339")).unwrap();
        assert_eq!(group.percentage.to_string(), "0.33");

        assert!(group.set_percentage(pct("1.01")).is_err());
        assert!(group.set_percentage(pct("-0.10")).is_err());
        assert_eq!(group.percentage.to_string(), "0.33");
    }

    #[test]
    fn percentage_arithmetic_rounds_down() {
        assert_eq!(percentage_of(1, 3).to_string(), "0.33");
        assert_eq!(percentage_of(2, 3).to_string(), "0.66");
        assert_eq!(percentage_of(5, 0).to_string(), "0.00");
        assert_eq!(hours_for(&pct("0.33"), 10), 3);
        assert_eq!(hours_for(&pct("0.50"), 7), 3);
    }
}
