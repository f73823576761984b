//! Snapshot tests for textual exports using insta inline snapshots.
//!
//! To update snapshots after intentional changes:
//! ```sh
//! cargo insta test --accept
//! ```

use crate::helpers::{gdp_table, population_table};

#[test]
fn snapshot_csv_with_display_names() {
    let csv = gdp_table().to_csv_with_column_names(false);
    insta::assert_snapshot!(csv, @r###"
    GDP,Population,entityName,year
    100,10,France,2000
    110,10,France,2001
    121,11,France,2002
    200,20,Germany,2000
    ,20,Germany,2001
    "###);
}

#[test]
fn snapshot_completed_csv() {
    let completed = population_table().complete(&["country", "year"]).unwrap();
    insta::assert_snapshot!(completed.to_csv_with_column_names(false), @r###"
    country,pop,year
    USA,10,2000
    USA,11,2001
    FRA,5,2000
    FRA,,2001
    "###);
}

#[test]
fn snapshot_dump_preview() {
    insta::assert_snapshot!(gdp_table().dump(Some(2)), @r###"
    gdp	pop	entityName	year
    100	10	France	2000
    110	10	France	2001
    ... 3 more rows
    "###);
}

#[test]
fn snapshot_tsv_subset() {
    let tsv = gdp_table()
        .sort_by(&["gdp"])
        .to_delimited('\t', Some(&["year", "entityName"]), Some(3));
    insta::assert_snapshot!(tsv, @r###"
    year	entityName
    2000	France
    2001	France
    2002	France
    "###);
}
