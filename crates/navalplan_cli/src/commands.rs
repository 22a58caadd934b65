//! Subcommand handlers.
//!
//! Every handler prints either plain lines or pretty JSON on stdout.

use crate::cli::{Cli, Commands, LabelTypeCommands, OrderCommands};
use anyhow::{anyhow, Context};
use log::info;
use navalplan_core::db::open_db;
use navalplan_core::{
    load_model, CatalogOrderElementModel, HoursGroupTable, LabelTypeService, OrderElementEditor,
    OrderElementModel, OrderRepository, PopupState, SqliteCriterionRepository,
    SqliteLabelTypeRepository, SqliteOrderRepository,
};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

/// JSON document printed by `order show`.
#[derive(Debug, Serialize)]
struct OrderElementView {
    id: Uuid,
    name: String,
    code: Option<String>,
    leaf: bool,
    work_hours: u32,
    popup: PopupState,
    hours_groups: HoursGroupTable,
}

pub fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Ping => {
            println!("navalplan_core ping={}", navalplan_core::ping());
            Ok(())
        }
        Commands::Version => {
            println!("navalplan_core version={}", navalplan_core::core_version());
            Ok(())
        }
        Commands::LabelTypes { action } => {
            let conn = open(cli)?;
            label_types(&conn, action)
        }
        Commands::Order { action } => {
            let conn = open(cli)?;
            order(&conn, action)
        }
    }
}

fn open(cli: &Cli) -> anyhow::Result<Connection> {
    info!(
        "event=cli_open module=cli status=start db={}",
        cli.db.display()
    );
    open_db(&cli.db).with_context(|| format!("failed to open `{}`", cli.db.display()))
}

fn label_types(conn: &Connection, action: &LabelTypeCommands) -> anyhow::Result<()> {
    let service = LabelTypeService::new(SqliteLabelTypeRepository::try_new(conn)?);
    match action {
        LabelTypeCommands::List => {
            for label_type in service.list()? {
                println!("{}\t{}", label_type.id, label_type.name);
            }
        }
        LabelTypeCommands::Add { name } => {
            let created = service.create(name.as_str())?;
            println!("{}", created.id);
        }
        LabelTypeCommands::Rename { id, name } => {
            let renamed = service.rename(*id, name.as_str())?;
            println!("{}\t{}", renamed.id, renamed.name);
        }
        LabelTypeCommands::Check { name } => {
            let available = service.is_name_available(name);
            println!("{}", if available { "available" } else { "taken" });
        }
    }
    Ok(())
}

fn order(conn: &Connection, action: &OrderCommands) -> anyhow::Result<()> {
    let orders = SqliteOrderRepository::try_new(conn)?;
    match action {
        OrderCommands::List => {
            for summary in orders.list_root_elements()? {
                let kind = if summary.is_leaf { "line" } else { "group" };
                println!("{}\t{kind}\t{}", summary.id, summary.name);
            }
            Ok(())
        }
        OrderCommands::Show { id, group_by } => {
            let criteria = SqliteCriterionRepository::try_new(conn)?;
            let model = load_model(&orders, &criteria, *id)?;
            let view = show_order_element(model, group_by)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
    }
}

fn show_order_element(
    model: CatalogOrderElementModel,
    group_by: &[String],
) -> anyhow::Result<OrderElementView> {
    let mut selected = Vec::with_capacity(group_by.len());
    for name in group_by {
        let criterion_type = model
            .criterion_type_by_name(name)
            .ok_or_else(|| anyhow!("unknown criterion type `{name}`"))?;
        selected.push(criterion_type);
    }

    let mut editor = OrderElementEditor::new();
    editor.open_popup(model);
    if !selected.is_empty() {
        editor.set_selected_criterion_types(&selected);
    }

    let element = editor
        .order_element()
        .ok_or_else(|| anyhow!("editor lost its order element"))?;
    Ok(OrderElementView {
        id: element.id(),
        name: element.name().to_string(),
        code: element.code().map(str::to_string),
        leaf: element.is_leaf(),
        work_hours: element.work_hours(),
        popup: editor.popup().clone(),
        hours_groups: editor.render_hours_groups(),
    })
}
