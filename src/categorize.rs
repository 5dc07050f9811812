//! Split event tables into named categories via boolean masks.
//!
//! Predicates are evaluated once per table, and the resulting partition is
//! reused across every variable being plotted, so a row classified
//! "opposite-sign" is classified identically everywhere. Categories may
//! overlap or leave rows unclassified; the taxonomy is the caller's
//! responsibility.

use crate::error::{Error, Result};
use crate::table::EventTable;

/// A pure function of one or more columns, producing one boolean per row.
pub type Predicate = Box<dyn Fn(&EventTable) -> Result<Vec<bool>>>;

/// A named predicate set defining the categories of a plot.
pub type Categories = Vec<(String, Predicate)>;

/// Evaluate each predicate once and select the matching row subsets.
///
/// A predicate selecting zero rows yields a valid empty table.
pub fn split(table: &EventTable, categories: &Categories) -> Result<Vec<(String, EventTable)>> {
    categories
        .iter()
        .map(|(label, predicate)| {
            let mask = predicate(table)?;
            let subset = table.select(&mask).map_err(|e| {
                Error::Schema(format!("category `{label}`: {e}"))
            })?;
            Ok((label.clone(), subset))
        })
        .collect()
}

/// Column as a boolean mask; any non-zero value counts as true.
fn bool_column(table: &EventTable, field: &str) -> Result<Vec<bool>> {
    let column = table
        .column(field)
        .ok_or_else(|| Error::NotFound(format!("predicate references missing column `{field}`")))?;
    Ok(column.iter().map(|&v| v != 0.0).collect())
}

fn column(table: &EventTable, field: &str) -> Result<Vec<f64>> {
    Ok(table
        .column(field)
        .ok_or_else(|| Error::NotFound(format!("predicate references missing column `{field}`")))?
        .to_vec())
}

/// Identity predicate: keeps every row.
pub fn all_rows(label: &str) -> Categories {
    vec![(
        label.to_string(),
        Box::new(|table: &EventTable| Ok(vec![true; table.n_rows()])) as Predicate,
    )]
}

/// Gen-matching split: `notmatched` then `matched`, from a boolean branch.
pub fn genmatch_split(genmatch_field: &str) -> Categories {
    let field = genmatch_field.to_string();
    let matched = {
        let field = field.clone();
        Box::new(move |table: &EventTable| bool_column(table, &field)) as Predicate
    };
    let notmatched = Box::new(move |table: &EventTable| {
        Ok(bool_column(table, &field)?.into_iter().map(|m| !m).collect())
    }) as Predicate;
    vec![
        ("notmatched".to_string(), notmatched),
        ("matched".to_string(), matched),
    ]
}

/// Same-sign background split on two charge branches plus a gen-match flag.
///
/// Categories, in rendering order:
/// - `OS-notmatched`: opposite-sign and not gen-matched,
/// - `SS`: not opposite-sign,
/// - `pp`: same-sign with the first charge positive,
/// - `nn`: same-sign with the first charge negative.
///
/// `SS` deliberately overlaps `pp` and `nn`; sign conventions follow the
/// caller-specified semantics rather than a canonical taxonomy.
pub fn signbkg_split(genmatch_field: &str, charge1_field: &str, charge2_field: &str) -> Categories {
    struct Masks {
        os: Vec<bool>,
        same: Vec<bool>,
        matched: Vec<bool>,
        positive1: Vec<bool>,
    }
    fn masks(table: &EventTable, genmatch: &str, charge1: &str, charge2: &str) -> Result<Masks> {
        let q1 = column(table, charge1)?;
        let q2 = column(table, charge2)?;
        Ok(Masks {
            os: q1.iter().zip(&q2).map(|(a, b)| a * b < 0.0).collect(),
            same: q1.iter().zip(&q2).map(|(a, b)| a * b > 0.0).collect(),
            matched: bool_column(table, genmatch)?,
            positive1: q1.iter().map(|&q| q > 0.0).collect(),
        })
    }

    let fields = (
        genmatch_field.to_string(),
        charge1_field.to_string(),
        charge2_field.to_string(),
    );
    let make = |combine: fn(&Masks) -> Vec<bool>| {
        let (g, c1, c2) = fields.clone();
        Box::new(move |table: &EventTable| Ok(combine(&masks(table, &g, &c1, &c2)?))) as Predicate
    };

    vec![
        ("OS-notmatched".to_string(), make(|m| {
            m.os.iter().zip(&m.matched).map(|(&os, &ma)| os && !ma).collect()
        })),
        ("SS".to_string(), make(|m| m.os.iter().map(|&os| !os).collect())),
        ("pp".to_string(), make(|m| {
            m.same.iter().zip(&m.positive1).map(|(&ss, &p)| ss && p).collect()
        })),
        ("nn".to_string(), make(|m| {
            m.same.iter().zip(&m.positive1).map(|(&ss, &p)| ss && !p).collect()
        })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(pairs: &[(&str, &[f64])]) -> EventTable {
        let mut t = EventTable::new();
        for (name, data) in pairs {
            t.insert(*name, data.to_vec()).unwrap();
        }
        t
    }

    #[test]
    fn genmatch_split_partitions_rows() {
        // 3 matched, 7 not.
        let flags: Vec<f64> = vec![1., 0., 0., 1., 0., 0., 0., 1., 0., 0.];
        let index: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let t = table(&[("match", &flags), ("idx", &index)]);
        let subsets = split(&t, &genmatch_split("match")).unwrap();
        assert_eq!(subsets[0].0, "notmatched");
        assert_eq!(subsets[0].1.n_rows(), 7);
        assert_eq!(subsets[1].0, "matched");
        assert_eq!(subsets[1].1.n_rows(), 3);
        // The union of the two subsets is exactly the original row set.
        let mut rows: Vec<f64> = subsets
            .iter()
            .flat_map(|(_, s)| s.column("idx").unwrap().to_vec())
            .collect();
        rows.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rows, index);
    }

    #[test]
    fn identity_recategorization_is_idempotent() {
        let t = table(&[("match", &[1., 0., 1.]), ("x", &[5., 6., 7.])]);
        let subsets = split(&t, &genmatch_split("match")).unwrap();
        for (_, subset) in &subsets {
            let again = split(subset, &all_rows("all")).unwrap();
            assert_eq!(again[0].1.n_rows(), subset.n_rows());
            assert_eq!(
                again[0].1.column("x").unwrap().to_vec(),
                subset.column("x").unwrap().to_vec()
            );
        }
    }

    #[test]
    fn empty_category_is_a_valid_table() {
        let t = table(&[("match", &[1., 1.])]);
        let subsets = split(&t, &genmatch_split("match")).unwrap();
        assert_eq!(subsets[0].0, "notmatched");
        assert!(subsets[0].1.is_empty());
    }

    #[test]
    fn missing_predicate_column_is_not_found() {
        let t = table(&[("x", &[1.0])]);
        assert!(matches!(
            split(&t, &genmatch_split("no_such_branch")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn signbkg_masks_follow_charge_products() {
        let q1: Vec<f64> = vec![1., 1., -1., -1.];
        let q2: Vec<f64> = vec![-1., 1., -1., 1.];
        let matched: Vec<f64> = vec![1., 0., 0., 0.];
        let t = table(&[("q1", &q1), ("q2", &q2), ("match", &matched)]);
        let subsets = split(&t, &signbkg_split("match", "q1", "q2")).unwrap();
        let counts: Vec<(String, usize)> = subsets
            .iter()
            .map(|(label, s)| (label.clone(), s.n_rows()))
            .collect();
        assert_eq!(
            counts,
            vec![
                // Rows 0 and 3 are OS; row 0 is gen-matched.
                ("OS-notmatched".to_string(), 1),
                ("SS".to_string(), 2),
                ("pp".to_string(), 1),
                ("nn".to_string(), 1),
            ]
        );
    }
}
