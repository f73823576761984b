//! Fixtures and shortcuts shared by the test modules.

use coretable::{CellValue, ColumnDef, ColumnTypeName, CoreTable, Row};
use std::sync::Arc;

pub fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

pub fn text(s: &str) -> CellValue {
    CellValue::from(s)
}

/// Build a row from `(slug, value)` pairs
pub fn row(pairs: &[(&str, CellValue)]) -> Row {
    pairs
        .iter()
        .map(|(slug, value)| (slug.to_string(), value.clone()))
        .collect()
}

/// The three-row country/year/pop dataset with one missing combination
pub fn population_rows() -> Vec<Row> {
    vec![
        row(&[("country", text("USA")), ("year", num(2000.0)), ("pop", num(10.0))]),
        row(&[("country", text("USA")), ("year", num(2001.0)), ("pop", num(11.0))]),
        row(&[("country", text("FRA")), ("year", num(2000.0)), ("pop", num(5.0))]),
    ]
}

pub fn population_table() -> CoreTable {
    CoreTable::new(population_rows(), vec![]).unwrap()
}

/// Entity/time/value table in delimited form with explicit defs
pub fn gdp_table() -> CoreTable {
    CoreTable::new(
        "entityName,year,gdp,pop\n\
         France,2000,100,10\n\
         France,2001,110,10\n\
         France,2002,121,11\n\
         Germany,2000,200,20\n\
         Germany,2001,n/a,20\n",
        vec![
            ColumnDef::new("gdp")
                .with_type(ColumnTypeName::Numeric)
                .with_name("GDP")
                .with_short_name("GDP"),
            ColumnDef::new("pop")
                .with_type(ColumnTypeName::Population)
                .with_name("Population"),
        ],
    )
    .unwrap()
}

/// Assert two tables share one column store allocation
pub fn assert_same_store(a: &CoreTable, b: &CoreTable) {
    assert!(
        Arc::ptr_eq(a.column_store(), b.column_store()),
        "expected `{}` and `{}` to share a column store",
        a.label(),
        b.label()
    );
}
