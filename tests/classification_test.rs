//! Integration tests for column classification through the config store

use pg_obfuscator::domain::{ColumnRecord, ConstraintKind};
use pg_obfuscator::obfuscation::{ConfigStore, OverrideDocument};
use test_case::test_case;

/// A small shop schema: users, customers, orders and an audit log
fn shop_catalog() -> Vec<ColumnRecord> {
    vec![
        ColumnRecord::new(1, "customers", "id", "int8", true).with_constraint(ConstraintKind::PrimaryKey),
        ColumnRecord::new(2, "customers", "name", "varchar", false),
        ColumnRecord::new(1, "orders", "id", "int8", true).with_constraint(ConstraintKind::PrimaryKey),
        ColumnRecord::new(2, "orders", "customer_id", "int8", true).with_foreign_key("customers", "id"),
        ColumnRecord::new(3, "orders", "total", "unknown_numeric", false),
        ColumnRecord::new(4, "orders", "placed_at", "timestamp", true),
        ColumnRecord::new(1, "order_items", "order_id", "int8", true)
            .with_foreign_key("orders", "id")
            .with_index(vec![1, 2], true, "CREATE UNIQUE INDEX order_items_key ON order_items (order_id, sku)"),
        ColumnRecord::new(2, "order_items", "sku", "varchar", true)
            .with_index(vec![1, 2], true, "CREATE UNIQUE INDEX order_items_key ON order_items (order_id, sku)"),
        ColumnRecord::new(1, "users", "id", "int8", true).with_constraint(ConstraintKind::PrimaryKey),
        ColumnRecord::new(2, "users", "email", "varchar", true),
        ColumnRecord::new(3, "users", "nickname", "text", false),
    ]
}

fn build(overrides: &str) -> ConfigStore {
    let overrides: OverrideDocument = toml::from_str(overrides).unwrap();
    ConfigStore::build(&shop_catalog(), &overrides)
}

#[test_case("users", "id", true, None, false ; "primary key is excluded with no type")]
#[test_case("orders", "customer_id", true, None, false ; "foreign key to primary key is excluded")]
#[test_case("orders", "total", false, None, true ; "unknown type needs a fix")]
#[test_case("orders", "placed_at", false, Some("DateTime"), false ; "mapped not null column")]
#[test_case("users", "nickname", false, Some("Nullable(String)"), false ; "mapped nullable column")]
#[test_case("order_items", "order_id", false, Some("Int8"), true ; "composite indexed foreign key stays in review")]
fn test_column_classification(
    table: &str,
    column: &str,
    excluded: bool,
    obfuscated_type: Option<&str>,
    need_fix: bool,
) {
    let store = build("");
    let table_config = &store.config().tables[table];
    let column_config = &table_config.columns[column];

    assert_eq!(table_config.is_excluded(column), excluded);
    assert_eq!(column_config.obfuscated_type.as_deref(), obfuscated_type);
    assert_eq!(column_config.need_fix, need_fix);
}

#[test]
fn test_report_lists_reasons_in_rule_order() {
    let store = build("");
    let report = store.validate();
    assert!(!report.is_ready());

    let orders = &report.needs_fix["orders"];
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].column, "total");
    assert_eq!(orders[0].reasons, vec!["unknown_data_type".to_string()]);

    let items = &report.needs_fix["order_items"];
    let order_id = items.iter().find(|f| f.column == "order_id").unwrap();
    assert_eq!(
        order_id.reasons,
        vec![
            "foreign_key".to_string(),
            "unique_index: [CREATE UNIQUE INDEX order_items_key ON order_items (order_id, sku)]".to_string(),
            "indexing_few_columns: [order_id, sku]".to_string(),
        ]
    );
}

#[test]
fn test_fake_data_exempts_column_from_type_and_fix() {
    let store = build(
        r#"
        [tables.orders.columns.total.fake_data]
        kind = "precise"
        value = "0.00"
        "#,
    );
    let total = &store.config().tables["orders"].columns["total"];
    assert!(total.obfuscated_type.is_none());
    assert!(!total.need_fix);
}

#[test]
fn test_overrides_make_config_ready() {
    let store = build(
        r#"
        [main.data_types_map]
        unknown_numeric = "Float64"

        [main.tables]
        skip_obfuscation = ["order_items"]

        [tables.users.columns.email.fake_data]
        kind = "pattern"
        value = "user-%{id}@example.com"
        "#,
    );

    let config = store.config();
    assert_eq!(
        config.tables["orders"].columns["total"].obfuscated_type.as_deref(),
        Some("Nullable(Float64)")
    );
    assert!(!config.tables["order_items"].columns["order_id"].need_fix);
    assert!(store.is_ready(), "{}", store.validate());
}

#[test]
fn test_skip_loading_tables_do_not_block_readiness() {
    let store = build(
        r#"
        [main.tables]
        skip_loading = ["orders", "order_items"]
        "#,
    );
    assert!(store.is_ready(), "{}", store.validate());
    assert!(store.ensure_ready().is_ok());
}

#[test]
fn test_unknown_generator_blocks_readiness() {
    let store = build(
        r#"
        [main.tables]
        skip_loading = ["orders", "order_items"]

        [tables.users.columns.email.fake_data]
        kind = "method"
        value = "social_security_number"
        "#,
    );
    assert!(!store.is_ready());
    assert!(store.validate().to_string().contains("social_security_number"));
}
