//! Chained derivations: identity sharing, parsing, concat, sort, rename,
//! transforms and provenance.

use crate::helpers::{assert_same_store, gdp_table, num, text};
use coretable::{
    CellValue, ColumnDef, ColumnDefPatch, ColumnTypeName, CoreTable, ErrorValue, MISSING,
    TableInput, TableOptions, TransformCategory,
};
use std::sync::Arc;

#[test]
fn test_noop_operations_share_the_store() {
    let table = gdp_table();
    assert_same_store(&table, &table.row_filter(|_, _| true, "all rows"));
    assert_same_store(&table, &table.column_filter("pop", |v, _| !v.is_error(), "valid pop"));
    assert_same_store(&table, &table.drop_rows_with_error_values_for_any_column(&["pop"]));
    assert_same_store(&table, &table.limit(100, 0));
    assert_same_store(&table, &table.drop_rows_at(&[]));
    assert_same_store(&table, &table.sort_by(&["entityName", "year"]));
}

#[test]
fn test_filters_drop_rows() {
    let table = gdp_table();
    let clean = table.drop_rows_with_error_values_for_any_column(&["gdp", "pop"]);
    assert_eq!(clean.num_rows(), 4);
    assert_eq!(clean.get("gdp").num_error_values(), 0);

    let france = table.column_filter("entityName", |v, _| *v == text("France"), "France");
    assert_eq!(france.num_rows(), 3);
    assert_eq!(france.get("year").numeric_values(), vec![2000.0, 2001.0, 2002.0]);
}

#[test]
fn test_parsing_is_idempotent_across_derivations() {
    let table = gdp_table();
    let rebuilt = CoreTable::new(
        TableInput::ColumnStore(Arc::clone(table.column_store())),
        table.defs().to_vec(),
    )
    .unwrap();
    for slug in table.column_slugs() {
        assert_eq!(
            rebuilt.get(slug).values_including_error_values(),
            table.get(slug).values_including_error_values(),
            "column {} changed on rebuild",
            slug
        );
        assert!(Arc::ptr_eq(
            rebuilt.get(slug).shared_values(),
            table.get(slug).shared_values()
        ));
    }

    let updated = table.update_defs(|def| def.clone()).unwrap();
    assert_eq!(updated.column_store().as_ref(), table.column_store().as_ref());
}

#[test]
fn test_force_reuse_column_store() {
    let table = gdp_table();
    let reused = CoreTable::with_options(
        Arc::clone(table.column_store()),
        table.defs().to_vec(),
        TableOptions::new().force_reuse_column_store(),
    )
    .unwrap();
    assert!(reused.reuses_column_store());
    assert_same_store(&table, &reused);
    assert!(!reused.reverse().reuses_column_store());
    assert!(!table.reuses_column_store());
    assert!(!table.drop_rows_at(&[0]).reuses_column_store());

    // A def without data cannot reuse the store as-is
    let mut defs = table.defs().to_vec();
    defs.push(ColumnDef::new("extra"));
    let rebuilt = CoreTable::with_options(
        Arc::clone(table.column_store()),
        defs,
        TableOptions::new().force_reuse_column_store(),
    )
    .unwrap();
    assert!(!rebuilt.reuses_column_store());
    assert_eq!(rebuilt.get("extra").num_error_values(), 5);
}

#[test]
fn test_concat_unions_columns_and_fills_gaps() {
    let left = CoreTable::new("a,b\n1,2\n3,4\n", vec![]).unwrap();
    let right = CoreTable::new("b,c\n5,x\n", vec![]).unwrap();
    let other = CoreTable::new("d\ny\n", vec![]).unwrap();

    let joined = left.concat(&[&right, &other], "all").unwrap();
    assert_eq!(joined.column_slugs(), vec!["a", "b", "c", "d"]);
    assert_eq!(joined.num_rows(), 4);
    assert_eq!(
        joined.get("a").values_including_error_values(),
        &[num(1.0), num(3.0), MISSING, MISSING]
    );
    assert_eq!(joined.get("b").numeric_values(), vec![2.0, 4.0, 5.0]);
    assert_eq!(
        joined.get("d").values_including_error_values(),
        &[MISSING, MISSING, MISSING, text("y")]
    );
    assert_eq!(joined.label(), "all");
}

#[test]
fn test_sort_keeps_order_of_equal_keys() {
    let table = CoreTable::new("k,id\n2,a\n1,b\n2,c\n1,d\n2,e\n", vec![]).unwrap();
    let sorted = table.sort_by(&["k"]);
    assert_eq!(
        sorted.get("id").values_including_error_values(),
        &[text("b"), text("d"), text("a"), text("c"), text("e")]
    );
    assert_eq!(sorted.category(), TransformCategory::SortRows);
}

#[test]
fn test_rename_moves_values_atomically() {
    let table = CoreTable::new("a,z\n1,p\n2,q\n", vec![]).unwrap();
    let before = table.get("a").values_including_error_values().to_vec();

    let renamed = table.rename_column("a", "b");
    assert!(renamed.get("a").is_missing());
    assert_eq!(renamed.get("b").values_including_error_values(), &before[..]);
    assert_eq!(renamed.column_slugs(), vec!["b", "z"]);
    assert_eq!(renamed.rows()[0].keys().collect::<Vec<_>>(), vec!["b", "z"]);
}

#[test]
fn test_rename_onto_existing_slug_replaces_it() {
    let table = CoreTable::new("a,b\n1,x\n2,y\n", vec![]).unwrap();
    let renamed = table.rename_column("a", "b");
    assert_eq!(renamed.column_slugs(), vec!["b"]);
    assert_eq!(renamed.defs().len(), 1);
    assert_eq!(
        renamed.get("b").values_including_error_values(),
        &[num(1.0), num(2.0)]
    );
    assert_eq!(renamed.to_csv(), "b\n1\n2");

    let swapped = table.rename_columns([("a", "b"), ("b", "a")]);
    assert_eq!(swapped.column_slugs(), vec!["b", "a"]);
    assert_eq!(swapped.get("a").values_including_error_values(), &[text("x"), text("y")]);
}

#[test]
fn test_repeated_header_keeps_one_column() {
    let table = CoreTable::new("a,a\n1,2\n", vec![]).unwrap();
    assert_eq!(table.column_slugs(), vec!["a"]);
    assert_eq!(table.defs().len(), 1);
    assert_eq!(table.get("a").values_including_error_values(), &[num(2.0)]);
}

#[test]
fn test_transforms_run_exactly_once() {
    let table = CoreTable::new(
        "a\n1\n2\n",
        vec![ColumnDef::new("a")
            .with_type(ColumnTypeName::Numeric)
            .with_transform("multiplyBy a 10")],
    )
    .unwrap();
    assert_eq!(table.get("a").numeric_values(), vec![10.0, 20.0]);

    let updated = table.update_defs(|def| def.clone()).unwrap();
    assert_eq!(updated.get("a").numeric_values(), vec![10.0, 20.0]);

    let appended = updated.append_columns(vec![]).unwrap();
    assert_eq!(appended.get("a").numeric_values(), vec![10.0, 20.0]);

    let joined = table.concat(&[&appended], "twice").unwrap();
    assert_eq!(joined.get("a").numeric_values(), vec![10.0, 20.0, 10.0, 20.0]);
}

#[test]
fn test_duplicate_then_transform_leaves_source_untouched() {
    let table = gdp_table();
    let dup = table.duplicate_column("gdp", ColumnDefPatch::slug("gdp_copy"));
    let scaled = dup.replace_cells(&["gdp_copy"], |v| match v {
        CellValue::Number(n) => CellValue::Number(n * 2.0),
        other => other.clone(),
    });
    assert_eq!(scaled.get("gdp").numeric_values(), table.get("gdp").numeric_values());
    assert_eq!(scaled.get("gdp_copy").numeric_values()[0], 200.0);
    assert!(Arc::ptr_eq(
        dup.get("gdp").shared_values(),
        dup.get("gdp_copy").shared_values()
    ));
}

#[test]
fn test_csv_renders_error_cells_empty() {
    let table = CoreTable::new(
        "v\n1\nbad\n3\n",
        vec![ColumnDef::new("v").with_type(ColumnTypeName::Numeric)],
    )
    .unwrap();
    assert_eq!(table.get("v").num_error_values(), 1);

    let csv = table.to_csv_with_column_names(false);
    let body: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(body, vec!["1", "", "3"]);
    assert_eq!(body.iter().filter(|f| f.is_empty()).count(), 1);

    let matrix = table.to_matrix();
    assert_eq!(matrix[2], vec![None]);
    assert_eq!(
        table.to_typed_matrix()[2],
        vec![CellValue::Error(ErrorValue::NotAParseableNumberButShouldBeNumber)]
    );
}

#[test]
fn test_provenance_follows_the_pipeline() {
    let table = gdp_table();
    let result = table
        .drop_rows_with_error_values_for_any_column(&["gdp"])
        .select(&["entityName", "year", "gdp"])
        .rename_column("gdp", "output");

    let chain = result.ancestors();
    assert_eq!(chain.len(), 4);
    assert_eq!(
        chain.iter().map(|r| r.category).collect::<Vec<_>>(),
        vec![
            TransformCategory::LoadFromDelimited,
            TransformCategory::FilterRows,
            TransformCategory::FilterColumns,
            TransformCategory::RenameColumns,
        ]
    );
    assert_eq!(chain[1].num_rows, 4);
    assert_eq!(result.generation(), 3);

    let explained = result.explain();
    assert!(explained.lines().nth(2).unwrap().contains("-[pop]"));
    assert!(explained.lines().nth(3).unwrap().contains("+[output] -[gdp]"));
}

#[test]
fn test_replace_helpers_for_log_scale_charts() {
    let table = CoreTable::new(
        "v\n10\n0\n-5\n",
        vec![ColumnDef::new("v").with_type(ColumnTypeName::Numeric)],
    )
    .unwrap();
    let log_ready = table.replace_non_positive_cells_for_log_scale(&["v"]);
    assert_eq!(log_ready.get("v").valid_values(), vec![&num(10.0)]);
    assert_eq!(
        log_ready
            .drop_rows_with_error_values_for_all_columns(&["v"])
            .num_rows(),
        1
    );
    assert_eq!(log_ready.category(), TransformCategory::UpdateRows);
}
