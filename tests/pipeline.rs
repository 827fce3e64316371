//! End-to-end pipeline tests over the fixture project in
//! `tests/fixtures/shop`: load, link, expand, compile and generate, then
//! inspect the written artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use oolong::model::entity::Entity;
use oolong::{build, BuildConfig, CompilationContext};

fn shop_config(out: &Path) -> BuildConfig {
    BuildConfig {
        dsl_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop"),
        entry: PathBuf::from("main.ool"),
        models_dir: out.join("models"),
        scripts_dir: out.join("sql"),
        debug_dir: None,
    }
}

fn entity_named<'a>(ctx: &'a CompilationContext, name: &str) -> &'a Entity {
    ctx.entities
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no entity '{name}'"))
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

#[test]
fn schema_closure_pulls_in_related_entities() {
    let out = tempfile::tempdir().unwrap();
    let ctx = build(&shop_config(out.path())).unwrap();

    // Only product and customer are declared; user arrives through the
    // owner relation, tag and the junction through the many-to-many.
    let schema = &ctx.schemas[0];
    let names: Vec<&str> = schema
        .entities
        .iter()
        .map(|id| ctx.entity(*id).name.as_str())
        .collect();
    assert!(names.contains(&"product"));
    assert!(names.contains(&"customer"));
    assert!(names.contains(&"user"));
    assert!(names.contains(&"tag"));
    assert!(names.contains(&"productTags"));

    let sql = read(out.path().join("sql/shop/entities.sql"));
    assert!(sql.contains("CREATE TABLE `user`"));
    assert!(sql.contains("CREATE TABLE `product_tags`"));
}

#[test]
fn inheritance_copies_base_fields() {
    let out = tempfile::tempdir().unwrap();
    let ctx = build(&shop_config(out.path())).unwrap();

    let customer = entity_named(&ctx, "customer");
    assert!(customer.field("displayName").is_some());
    // Base fields lead the layout; the child's own follow.
    assert_eq!(customer.fields[0].name, "displayName");
}

#[test]
fn at_least_one_not_null_marks_fields_and_guards_creation() {
    let out = tempfile::tempdir().unwrap();
    let ctx = build(&shop_config(out.path())).unwrap();

    let customer = entity_named(&ctx, "customer");
    assert!(customer.field("email").unwrap().is_optional());
    assert!(customer.field("mobile").unwrap().is_optional());

    let model = read(out.path().join("models/shop/customer.rs"));
    assert!(model.contains("if !has_any(record, &[\"email\", \"mobile\"])"));
    assert!(model.contains("all_null(&[\"email\", \"mobile\"], \"Customer\")"));
    assert!(model.contains("at least one of [email, mobile] must be set"));
}

#[test]
fn column_types_follow_attribute_buckets() {
    let out = tempfile::tempdir().unwrap();
    build(&shop_config(out.path())).unwrap();

    let sql = read(out.path().join("sql/shop/entities.sql"));
    assert!(sql.contains("`serial` BIGINT(11) NOT NULL"));
    assert!(sql.contains("`blurb` TEXT NULL"));
    assert!(!sql.contains("`blurb` VARCHAR"));
    assert!(sql.contains("`created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"));
}

#[test]
fn junction_gets_composite_key_and_cascading_constraints() {
    let out = tempfile::tempdir().unwrap();
    let ctx = build(&shop_config(out.path())).unwrap();

    let junction = entity_named(&ctx, "productTags");
    assert!(junction.synthetic);
    assert_eq!(junction.key, vec!["product".to_string(), "tag".to_string()]);

    let sql = read(out.path().join("sql/shop/relations.sql"));
    assert!(sql.contains("ALTER TABLE `product_tags`"));
    assert!(sql.contains(
        "ADD CONSTRAINT `fk_product_tags_product` FOREIGN KEY (`product`) \
         REFERENCES `product` (`id`)"
    ));
    assert!(sql.contains("`fk_product_tags_tag`"));
    assert!(sql.contains("ON DELETE CASCADE ON UPDATE CASCADE;"));
    // The plain belongs-to does not cascade.
    assert!(sql.contains(
        "ADD CONSTRAINT `fk_product_owner` FOREIGN KEY (`owner_id`) \
         REFERENCES `user` (`id`)"
    ));
    assert!(sql.contains("ON DELETE NO ACTION ON UPDATE NO ACTION;"));
}

#[test]
fn functor_pipeline_nests_modifiers_after_validation() {
    let out = tempfile::tempdir().unwrap();
    build(&shop_config(out.path())).unwrap();

    let model = read(out.path().join("models/shop/product.rs"));
    assert!(model.contains("pub fn apply_product(record: &mut Record)"));
    assert!(model.contains("ops::not_empty(code)"));
    assert!(model.contains("ops::to_upper(ops::trim(code))"));
}

#[test]
fn view_compiles_to_a_parameterised_procedure() {
    let out = tempfile::tempdir().unwrap();
    build(&shop_config(out.path())).unwrap();

    let sql = read(out.path().join("sql/shop/procedures.sql"));
    assert!(sql.contains("DROP PROCEDURE IF EXISTS `view_active_products`;"));
    assert!(sql.contains("CREATE PROCEDURE `view_active_products`(IN p_top INT)"));
    assert!(sql.contains("WHERE A.`serial` > 0"));
    assert!(sql.contains("ORDER BY A.`title` ASC"));
    assert!(sql.contains("LIMIT p_top"));
}

#[test]
fn relinking_a_linked_context_changes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let mut ctx = build(&shop_config(out.path())).unwrap();

    let entities = ctx.entities.clone();
    let relations = ctx.relations.clone();
    oolong::linker::link(&mut ctx).unwrap();
    assert_eq!(ctx.entities, entities);
    assert_eq!(ctx.relations, relations);
}
