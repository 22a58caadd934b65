use bigdecimal::BigDecimal;
use navalplan_core::db::open_db_in_memory;
use navalplan_core::{
    load_model, Criterion, CriterionRepository, CriterionType, HoursGroup, HoursGroupPolicy,
    ModelLoadError, OrderElement, OrderElementModel, OrderLine, OrderLineGroup, OrderRepoError,
    OrderRepository, SqliteCriterionRepository, SqliteOrderRepository,
};
use rusqlite::Connection;
use std::str::FromStr;
use uuid::Uuid;

struct Catalog {
    skill: CriterionType,
    department: CriterionType,
    welder: Criterion,
    painter: Criterion,
    deck: Criterion,
}

fn seed_catalog(conn: &Connection) -> Catalog {
    let repo = SqliteCriterionRepository::try_new(conn).unwrap();
    let skill = CriterionType::new("Skill");
    let department = CriterionType::new("Department");
    repo.save_criterion_type(&skill).unwrap();
    repo.save_criterion_type(&department).unwrap();

    let welder = Criterion::new(&skill, "Welder");
    let painter = Criterion::new(&skill, "Painter");
    let deck = Criterion::new(&department, "Deck");
    for criterion in [&welder, &painter, &deck] {
        repo.save_criterion(criterion).unwrap();
    }
    Catalog {
        skill,
        department,
        welder,
        painter,
        deck,
    }
}

fn hull_tree(catalog: &Catalog) -> OrderLineGroup {
    let mut bow = OrderLine::new("Bow");
    bow.code = Some("H-01".to_string());
    let mut welding = HoursGroup::with_hours(30);
    welding.add_criterion(catalog.deck.clone());
    welding.add_criterion(catalog.welder.clone());
    bow.add_hours_group(welding);
    let mut painting = HoursGroup::new();
    painting.set_fixed_percentage(true);
    painting
        .set_percentage(BigDecimal::from_str("0.25").unwrap())
        .unwrap();
    painting.add_criterion(catalog.painter.clone());
    bow.add_hours_group(painting);
    bow.set_work_hours(40).unwrap();

    let mut stern = OrderLine::new("Stern");
    stern.set_work_hours(12).unwrap();

    let mut hull = OrderLineGroup::new("Hull");
    hull.add_child(bow);
    hull.add_child(stern);
    hull
}

#[test]
fn order_tree_roundtrip_preserves_hours_groups_and_criteria() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteOrderRepository::try_new(&conn).unwrap();

    let hull: OrderElement = hull_tree(&catalog).into();
    repo.save_order_element(&hull).unwrap();

    let loaded = repo.load_order_element(hull.id()).unwrap().unwrap();
    assert_eq!(loaded, hull);
    assert_eq!(loaded.work_hours(), 52);

    let OrderElement::Group(group) = &loaded else {
        panic!("expected a container");
    };
    let bow = group.children[0].as_line().unwrap();
    assert_eq!(bow.code.as_deref(), Some("H-01"));
    assert_eq!(bow.hours_groups[1].policy, HoursGroupPolicy::FixedPercentage);
    assert_eq!(bow.hours_groups[1].working_hours, 10);
    assert_eq!(bow.hours_groups[0].criteria.len(), 2);
}

#[test]
fn resaving_child_keeps_its_parent() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteOrderRepository::try_new(&conn).unwrap();

    let hull = hull_tree(&catalog);
    let hull_id = hull.id;
    let mut stern = hull.children[1].clone();
    repo.save_order_element(&hull.into()).unwrap();

    stern.as_line_mut().unwrap().set_work_hours(20).unwrap();
    repo.save_order_element(&stern).unwrap();

    let roots = repo.list_root_elements().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, hull_id);
    assert!(!roots[0].is_leaf);

    let reloaded = repo.load_order_element(hull_id).unwrap().unwrap();
    assert_eq!(reloaded.work_hours(), 60);
}

#[test]
fn list_roots_in_save_order_and_delete_cascades() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteOrderRepository::try_new(&conn).unwrap();

    let hull = hull_tree(&catalog);
    let bow_id = hull.children[0].id();
    let hull_id = hull.id;
    let engine = OrderLine::new("Engine");
    let engine_id = engine.id;
    repo.save_order_element(&hull.into()).unwrap();
    repo.save_order_element(&engine.into()).unwrap();

    let names: Vec<String> = repo
        .list_root_elements()
        .unwrap()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(names, vec!["Hull", "Engine"]);

    repo.delete_order_element(hull_id).unwrap();
    assert!(repo.load_order_element(bow_id).unwrap().is_none());
    let orphaned: i64 = conn
        .query_row("SELECT COUNT(*) FROM hours_groups;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(repo.list_root_elements().unwrap()[0].id, engine_id);

    let err = repo.delete_order_element(hull_id).unwrap_err();
    assert!(matches!(err, OrderRepoError::NotFound(id) if id == hull_id));
}

#[test]
fn criteria_for_type_skips_inactive_criteria() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let repo = SqliteCriterionRepository::try_new(&conn).unwrap();

    let mut painter = catalog.painter.clone();
    painter.active = false;
    repo.save_criterion(&painter).unwrap();

    let skills = repo.criteria_for_type(catalog.skill.id).unwrap();
    assert_eq!(skills, vec![catalog.welder.clone()]);
    assert_eq!(
        repo.get_criterion(painter.id).unwrap().map(|c| c.active),
        Some(false)
    );
    assert_eq!(
        repo.criterion_type_by_name("Department").unwrap(),
        Some(catalog.department.clone())
    );
}

#[test]
fn load_model_binds_element_and_catalog() {
    let conn = open_db_in_memory().unwrap();
    let catalog = seed_catalog(&conn);
    let orders = SqliteOrderRepository::try_new(&conn).unwrap();
    let criteria = SqliteCriterionRepository::try_new(&conn).unwrap();

    let hull: OrderElement = hull_tree(&catalog).into();
    orders.save_order_element(&hull).unwrap();

    let model = load_model(&orders, &criteria, hull.id()).unwrap();
    assert_eq!(model.order_element(), &hull);
    let type_names: Vec<String> = model
        .criterion_types()
        .into_iter()
        .map(|ty| ty.name)
        .collect();
    assert_eq!(type_names, vec!["Department", "Skill"]);
    assert_eq!(model.criterions_for(&catalog.skill).len(), 2);

    let missing = Uuid::new_v4();
    let err = load_model(&orders, &criteria, missing).err().unwrap();
    assert!(matches!(err, ModelLoadError::OrderElementNotFound(id) if id == missing));
}
