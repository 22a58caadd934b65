//! Order element edit popup, independent of any UI toolkit.
//!
//! # Responsibility
//! - Track popup visibility and which controls are enabled.
//! - Aggregate container hours groups by the selected criterion types.
//! - Apply row edits to the bound order line and re-derive hours/percentages.
//! - Produce a render model (`HoursGroupTable`) for the hours group grid.
//!
//! # Invariants
//! - Edit controls are never exposed for non-leaf elements: mutating calls on
//!   a container fail with `EditorError::NotALeaf`, and criterion type
//!   selection on a container never touches the descendants' hours groups.
//! - A rejected edit leaves the bound element as it was.
//! - Selected criterion types keep insertion order and hold no duplicates.
//! - Every accepted edit bumps `PopupState::bindings_version`.

use crate::model::criterion::{Criterion, CriterionId, CriterionType, CriterionTypeId};
use crate::model::hours_group::{percentage_of, HoursGroup, HoursGroupId};
use crate::model::order_element::{OrderElement, OrderElementError, OrderLine};
use crate::service::order_element_model::OrderElementModel;
use bigdecimal::BigDecimal;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Where the popup opens, relative to its parent.
pub const POPUP_POSITION: (i32, i32) = (150, 150);

pub const TOTAL_HOURS_FIELD: &str = "totalHours";
pub const WORKING_HOURS_FIELD: &str = "workingHours";
pub const PERCENTAGE_FIELD: &str = "percentage";

const TOTAL_HOURS_INVALID_MESSAGE: &str =
    "Value is not valid, taking into account the current list of HoursGroup";

pub const WORKING_HOURS_HEADER: &str = "Working hours";
pub const PERCENTAGE_HEADER: &str = "Percentage";
pub const FIXED_PERCENTAGE_HEADER: &str = "Fixed percentage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// No order element is bound to the editor.
    NoModel,
    NotALeaf(crate::model::order_element::OrderElementId),
    HoursGroupNotFound(HoursGroupId),
    CriterionNotFound(CriterionId),
    /// The control is disabled under the current hours group policy.
    FieldDisabled { field: &'static str },
    /// Inline form error for an inconsistent value.
    WrongValue { field: &'static str, message: String },
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoModel => write!(f, "no order element is being edited"),
            Self::NotALeaf(id) => write!(f, "order element {id} is not an order line"),
            Self::HoursGroupNotFound(id) => write!(f, "hours group not found: {id}"),
            Self::CriterionNotFound(id) => write!(f, "criterion not found: {id}"),
            Self::FieldDisabled { field } => write!(f, "field `{field}` is disabled"),
            Self::WrongValue { field, message } => write!(f, "{field}: {message}"),
        }
    }
}

impl Error for EditorError {}

/// Visibility and enablement of the popup controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopupState {
    pub open: bool,
    pub position: Option<(i32, i32)>,
    pub total_hours_disabled: bool,
    pub manage_criterions_visible: bool,
    pub add_hours_group_visible: bool,
    pub delete_hours_groups_visible: bool,
    pub select_criterions_visible: bool,
    /// Raised by `save` so the view owning the popup reloads.
    pub parent_refresh_requested: bool,
    /// Incremented whenever bound values changed and the view must redraw.
    pub bindings_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell<T> {
    pub value: T,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionOption {
    /// `None` for the empty option that clears the criterion.
    pub value: Option<CriterionId>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionSelect {
    pub criterion_type: CriterionType,
    pub options: Vec<CriterionOption>,
    pub selected: Option<CriterionId>,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursGroupRow {
    /// `None` on container rows, which may be aggregates.
    pub hours_group_id: Option<HoursGroupId>,
    pub working_hours: Cell<u32>,
    pub percentage: Cell<BigDecimal>,
    /// Only present on order line rows.
    pub fixed_percentage: Option<Cell<bool>>,
    pub criteria: Vec<CriterionSelect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursGroupTable {
    pub headers: Vec<String>,
    pub rows: Vec<HoursGroupRow>,
}

pub struct OrderElementEditor<M: OrderElementModel> {
    model: Option<M>,
    popup: PopupState,
    selected_criterion_types: Vec<CriterionType>,
}

impl<M: OrderElementModel> Default for OrderElementEditor<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: OrderElementModel> OrderElementEditor<M> {
    pub fn new() -> Self {
        Self {
            model: None,
            popup: PopupState::default(),
            selected_criterion_types: Vec::new(),
        }
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn order_element(&self) -> Option<&OrderElement> {
        self.model.as_ref().map(OrderElementModel::order_element)
    }

    /// Binds `model` and opens the popup.
    ///
    /// Containers get a read-only form; lines get the full set of controls.
    pub fn open_popup(&mut self, model: M) {
        let element = model.order_element();
        let is_leaf = element.is_leaf();
        info!(
            "event=editor_open module=editor status=ok order_element_id={} leaf={is_leaf}",
            element.id()
        );
        self.model = Some(model);

        self.popup.total_hours_disabled = !is_leaf;
        self.popup.manage_criterions_visible = is_leaf;
        self.popup.add_hours_group_visible = is_leaf;
        self.popup.delete_hours_groups_visible = is_leaf;
        self.popup.select_criterions_visible = false;
        self.popup.parent_refresh_requested = false;

        self.reload_selected_criterion_types();
        self.reload_bindings();
        self.popup.open = true;
        self.popup.position = Some(POPUP_POSITION);
    }

    /// Closes the popup and discards the bound model.
    pub fn cancel(&mut self) {
        self.popup.open = false;
        self.model = None;
        self.selected_criterion_types.clear();
    }

    /// Closes the popup and returns the edited model for persistence.
    pub fn save(&mut self) -> Option<M> {
        self.popup.open = false;
        self.popup.parent_refresh_requested = true;
        self.selected_criterion_types.clear();
        self.model.take()
    }

    /// Hours groups shown in the grid.
    ///
    /// A container with selected criterion types merges the groups whose
    /// criteria of those types have the same names; merged groups sum their
    /// hours and keep the criteria of the first group seen.
    pub fn hours_groups(&self) -> Vec<HoursGroup> {
        let Some(element) = self.order_element() else {
            return Vec::new();
        };
        let groups = element.hours_groups();
        if element.is_leaf() || self.selected_criterion_types.is_empty() {
            return groups.into_iter().cloned().collect();
        }

        let mut index_by_key: HashMap<Vec<Option<&str>>, usize> = HashMap::new();
        let mut aggregated: Vec<HoursGroup> = Vec::new();
        for group in groups {
            let key: Vec<Option<&str>> = self
                .selected_criterion_types
                .iter()
                .map(|ty| {
                    group
                        .criterion_by_type(ty.id)
                        .map(|criterion| criterion.name.as_str())
                })
                .collect();

            match index_by_key.get(&key) {
                Some(&index) => {
                    let merged = &mut aggregated[index];
                    merged.working_hours = merged.working_hours.saturating_add(group.working_hours);
                }
                None => {
                    let mut aggregate = HoursGroup::with_hours(group.working_hours);
                    aggregate.criteria = group.criteria.clone();
                    index_by_key.insert(key, aggregated.len());
                    aggregated.push(aggregate);
                }
            }
        }
        aggregated
    }

    /// Criterion types that can still be selected.
    pub fn criterion_types(&self) -> Vec<CriterionType> {
        let Some(model) = self.model.as_ref() else {
            return Vec::new();
        };
        model
            .criterion_types()
            .into_iter()
            .filter(|ty| !self.is_selected(ty.id))
            .collect()
    }

    pub fn selected_criterion_types(&self) -> &[CriterionType] {
        &self.selected_criterion_types
    }

    /// Toggles the criterion type selection box.
    pub fn manage_criterions(&mut self) {
        if self.popup.select_criterions_visible {
            self.popup.select_criterions_visible = false;
        } else {
            self.reload_selected_criterion_types();
            self.popup.select_criterions_visible = true;
        }
        self.reload_bindings();
    }

    pub fn assign_criterions(&mut self, criterion_types: &[CriterionType]) {
        for criterion_type in criterion_types {
            if !self.is_selected(criterion_type.id) {
                self.selected_criterion_types.push(criterion_type.clone());
            }
        }
        self.reload_bindings();
    }

    /// Deselects the types.
    ///
    /// On an order line the criteria of those types are also stripped from
    /// its hours groups. A container only changes how its groups are merged.
    pub fn unassign_criterions(&mut self, criterion_types: &[CriterionType]) {
        for criterion_type in criterion_types {
            self.selected_criterion_types
                .retain(|selected| selected.id != criterion_type.id);
        }
        if let Ok(line) = self.line_mut() {
            for group in &mut line.hours_groups {
                for criterion_type in criterion_types {
                    group.remove_criterion_by_type(criterion_type.id);
                }
            }
        }
        self.reload_bindings();
    }

    /// Replaces the selected criterion types without touching any hours group.
    ///
    /// Duplicates are dropped; order is kept.
    pub fn set_selected_criterion_types(&mut self, criterion_types: &[CriterionType]) {
        self.selected_criterion_types.clear();
        self.assign_criterions(criterion_types);
    }

    pub fn add_hours_group(&mut self) -> Result<HoursGroupId, EditorError> {
        let group = HoursGroup::new();
        let id = group.id;
        self.line_mut()?.add_hours_group(group);
        self.reload_bindings();
        Ok(id)
    }

    pub fn delete_hours_groups(&mut self, ids: &[HoursGroupId]) -> Result<(), EditorError> {
        let line = self.line_mut()?;
        for id in ids {
            line.delete_hours_group(*id);
        }
        self.reload_bindings();
        Ok(())
    }

    /// Applies the total hours field of an order line.
    ///
    /// # Errors
    /// - `WrongValue` when the total cannot be split among the hours groups.
    pub fn set_total_hours(&mut self, total: i64) -> Result<(), EditorError> {
        let line = self.line_mut()?;
        if !line.is_total_hours_valid(total) {
            warn!("event=editor_total_hours module=editor status=rejected total={total}");
            return Err(total_hours_error());
        }
        line.set_work_hours(total).map_err(|_| total_hours_error())?;
        self.reload_bindings();
        Ok(())
    }

    /// # Errors
    /// - `FieldDisabled` when the group has a fixed percentage.
    /// - `WrongValue` when the line total would exceed `u32::MAX` hours.
    pub fn set_working_hours(
        &mut self,
        id: HoursGroupId,
        working_hours: u32,
    ) -> Result<(), EditorError> {
        let line = self.line_mut()?;
        let group = line
            .hours_group_mut(id)
            .ok_or(EditorError::HoursGroupNotFound(id))?;
        if group.is_fixed_percentage() {
            return Err(EditorError::FieldDisabled {
                field: WORKING_HOURS_FIELD,
            });
        }

        let previous = group.working_hours;
        group.set_working_hours(working_hours);
        if let Err(err) = line.recalculate_hours_groups() {
            if let Some(group) = line.hours_group_mut(id) {
                group.set_working_hours(previous);
            }
            warn!("event=editor_working_hours module=editor status=rejected error={err}");
            return Err(wrong_value(WORKING_HOURS_FIELD, &err));
        }
        self.reload_bindings();
        Ok(())
    }

    /// # Errors
    /// - `FieldDisabled` unless the group has a fixed percentage.
    /// - `WrongValue` for values outside `[0, 1]` or when the line's fixed
    ///   percentages would exceed 1.
    pub fn set_percentage(
        &mut self,
        id: HoursGroupId,
        percentage: BigDecimal,
    ) -> Result<(), EditorError> {
        let line = self.line_mut()?;
        let group = line
            .hours_group_mut(id)
            .ok_or(EditorError::HoursGroupNotFound(id))?;
        if !group.is_fixed_percentage() {
            return Err(EditorError::FieldDisabled {
                field: PERCENTAGE_FIELD,
            });
        }

        let previous = group.percentage.clone();
        group
            .set_percentage(percentage)
            .map_err(|err| wrong_value(PERCENTAGE_FIELD, &err))?;
        let outcome = if line.is_percentage_valid() {
            line.recalculate_hours_groups()
        } else {
            Err(OrderElementError::PercentageOverflow(
                line.fixed_percentage_sum(),
            ))
        };
        if let Err(err) = outcome {
            if let Some(group) = line.hours_group_mut(id) {
                group.percentage = previous;
            }
            return Err(wrong_value(PERCENTAGE_FIELD, &err));
        }

        self.reload_bindings();
        Ok(())
    }

    pub fn set_fixed_percentage(&mut self, id: HoursGroupId, fixed: bool) -> Result<(), EditorError> {
        let line = self.line_mut()?;
        let group = line
            .hours_group_mut(id)
            .ok_or(EditorError::HoursGroupNotFound(id))?;
        let previous = group.policy;
        group.set_fixed_percentage(fixed);
        if let Err(err) = line.recalculate_hours_groups() {
            if let Some(group) = line.hours_group_mut(id) {
                group.policy = previous;
            }
            return Err(wrong_value(PERCENTAGE_FIELD, &err));
        }
        self.reload_bindings();
        Ok(())
    }

    /// Sets (`Some`) or clears (`None`) the group's criterion of one type.
    pub fn select_criterion(
        &mut self,
        id: HoursGroupId,
        criterion_type: CriterionTypeId,
        criterion: Option<CriterionId>,
    ) -> Result<(), EditorError> {
        let chosen = match criterion {
            Some(criterion_id) => Some(self.lookup_criterion(criterion_type, criterion_id)?),
            None => None,
        };

        let group = self
            .line_mut()?
            .hours_group_mut(id)
            .ok_or(EditorError::HoursGroupNotFound(id))?;
        match chosen {
            Some(criterion) => group.add_criterion(criterion),
            None => group.remove_criterion_by_type(criterion_type),
        }
        self.reload_bindings();
        Ok(())
    }

    /// Builds the hours group grid for the bound element.
    pub fn render_hours_groups(&self) -> HoursGroupTable {
        let Some(model) = self.model.as_ref() else {
            return HoursGroupTable {
                headers: Vec::new(),
                rows: Vec::new(),
            };
        };
        let element = model.order_element();
        let is_leaf = element.is_leaf();

        let mut headers = vec![
            WORKING_HOURS_HEADER.to_string(),
            PERCENTAGE_HEADER.to_string(),
        ];
        if is_leaf {
            headers.push(FIXED_PERCENTAGE_HEADER.to_string());
        }
        headers.extend(
            self.selected_criterion_types
                .iter()
                .map(|ty| ty.name.clone()),
        );

        let total = element.work_hours();
        let rows = self
            .hours_groups()
            .iter()
            .map(|group| {
                if is_leaf {
                    self.render_line_row(model, group)
                } else {
                    self.render_container_row(model, group, total)
                }
            })
            .collect();

        HoursGroupTable { headers, rows }
    }

    fn render_container_row(&self, model: &M, group: &HoursGroup, total: u32) -> HoursGroupRow {
        HoursGroupRow {
            hours_group_id: None,
            working_hours: Cell {
                value: group.working_hours,
                disabled: true,
            },
            percentage: Cell {
                value: percentage_of(group.working_hours, total),
                disabled: true,
            },
            fixed_percentage: None,
            criteria: self.render_criterion_selects(model, group, true),
        }
    }

    fn render_line_row(&self, model: &M, group: &HoursGroup) -> HoursGroupRow {
        let fixed = group.is_fixed_percentage();
        HoursGroupRow {
            hours_group_id: Some(group.id),
            working_hours: Cell {
                value: group.working_hours,
                disabled: fixed,
            },
            percentage: Cell {
                value: group.percentage.clone(),
                disabled: !fixed,
            },
            fixed_percentage: Some(Cell {
                value: fixed,
                disabled: false,
            }),
            criteria: self.render_criterion_selects(model, group, false),
        }
    }

    fn render_criterion_selects(
        &self,
        model: &M,
        group: &HoursGroup,
        disabled: bool,
    ) -> Vec<CriterionSelect> {
        self.selected_criterion_types
            .iter()
            .map(|criterion_type| {
                let current = group.criterion_by_type(criterion_type.id);
                let candidates = model.criterions_for(criterion_type);
                let selected = current.and_then(|current| {
                    candidates
                        .iter()
                        .find(|candidate| candidate.name == current.name)
                        .map(|candidate| candidate.id)
                });

                let mut options = vec![CriterionOption {
                    value: None,
                    label: String::new(),
                }];
                options.extend(candidates.into_iter().map(|candidate| CriterionOption {
                    value: Some(candidate.id),
                    label: candidate.name,
                }));

                CriterionSelect {
                    criterion_type: criterion_type.clone(),
                    options,
                    selected,
                    disabled,
                }
            })
            .collect()
    }

    fn reload_selected_criterion_types(&mut self) {
        let Some(model) = self.model.as_ref() else {
            self.selected_criterion_types.clear();
            return;
        };

        let mut selected: Vec<CriterionType> = Vec::new();
        for group in model.order_element().hours_groups() {
            for criterion in &group.criteria {
                if selected.iter().any(|ty| ty.id == criterion.criterion_type) {
                    continue;
                }
                if let Some(criterion_type) = model.criterion_type(criterion.criterion_type) {
                    selected.push(criterion_type);
                }
            }
        }
        self.selected_criterion_types = selected;
    }

    fn lookup_criterion(
        &self,
        type_id: CriterionTypeId,
        criterion_id: CriterionId,
    ) -> Result<Criterion, EditorError> {
        let model = self.model.as_ref().ok_or(EditorError::NoModel)?;
        model
            .criterion_type(type_id)
            .into_iter()
            .flat_map(|criterion_type| model.criterions_for(&criterion_type))
            .find(|criterion| criterion.id == criterion_id)
            .ok_or(EditorError::CriterionNotFound(criterion_id))
    }

    fn is_selected(&self, type_id: CriterionTypeId) -> bool {
        self.selected_criterion_types
            .iter()
            .any(|selected| selected.id == type_id)
    }

    fn line_mut(&mut self) -> Result<&mut OrderLine, EditorError> {
        let element = self
            .model
            .as_mut()
            .ok_or(EditorError::NoModel)?
            .order_element_mut();
        let id = element.id();
        element.as_line_mut().ok_or(EditorError::NotALeaf(id))
    }

    fn reload_bindings(&mut self) {
        self.popup.bindings_version += 1;
    }
}

fn total_hours_error() -> EditorError {
    EditorError::WrongValue {
        field: TOTAL_HOURS_FIELD,
        message: TOTAL_HOURS_INVALID_MESSAGE.to_string(),
    }
}

fn wrong_value(field: &'static str, err: &OrderElementError) -> EditorError {
    EditorError::WrongValue {
        field,
        message: err.to_string(),
    }
}
