//! Flat, columnar event tables.
//!
//! One row per selected candidate, one column per branch. All branches are
//! widened to `f64` on the way in (booleans become 0.0/1.0), which mirrors
//! how every downstream consumer treats them. Column insertion order is
//! preserved so that iteration is deterministic.
//!
//! Tables are immutable once produced: categorization and concatenation
//! always build new tables.

use ndarray::Array1;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct EventTable {
    columns: Vec<(String, Array1<f64>)>,
}

impl EventTable {
    pub fn new() -> Self { Self::default() }

    /// Number of rows. A table with no columns has zero rows.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, data)| data.len())
    }

    pub fn is_empty(&self) -> bool { self.n_rows() == 0 }

    pub fn n_fields(&self) -> usize { self.columns.len() }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, data)| data)
    }

    /// Add a column. Every column must have the same number of rows.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.has_field(&name) {
            return Err(Error::Schema(format!("duplicate column `{name}`")));
        }
        if !self.columns.is_empty() && data.len() != self.n_rows() {
            return Err(Error::Schema(format!(
                "column `{name}` has {} rows, table has {}",
                data.len(),
                self.n_rows()
            )));
        }
        self.columns.push((name, Array1::from(data)));
        Ok(())
    }

    /// Row subset selected by a boolean mask. The mask must cover every row.
    pub fn select(&self, mask: &[bool]) -> Result<EventTable> {
        if mask.len() != self.n_rows() {
            return Err(Error::Schema(format!(
                "mask has {} entries, table has {} rows",
                mask.len(),
                self.n_rows()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, data)| {
                let kept = data
                    .iter()
                    .zip(mask)
                    .filter(|(_, &keep)| keep)
                    .map(|(&v, _)| v)
                    .collect::<Vec<_>>();
                (name.clone(), Array1::from(kept))
            })
            .collect();
        Ok(EventTable { columns })
    }

    /// Concatenate tables in the order given, preserving row order.
    ///
    /// Only fields present in every part survive; the names of the dropped
    /// fields are returned so the caller can warn about them. Field order
    /// follows the first part.
    pub fn concat(parts: &[EventTable]) -> Result<(EventTable, Vec<String>)> {
        let parts: Vec<&EventTable> = parts.iter().filter(|t| t.n_fields() > 0).collect();
        let Some(first) = parts.first() else {
            return Ok((EventTable::new(), vec![]));
        };
        let kept: Vec<&str> = first
            .fields()
            .filter(|f| parts.iter().all(|t| t.has_field(f)))
            .collect();
        let mut dropped: Vec<String> = vec![];
        for part in &parts {
            for field in part.fields() {
                if !kept.contains(&field) && !dropped.iter().any(|d| d == field) {
                    dropped.push(field.to_string());
                }
            }
        }
        let mut out = EventTable::new();
        for field in kept {
            let mut data = vec![];
            for part in &parts {
                // Presence checked above.
                data.extend(part.column(field).unwrap().iter().copied());
            }
            out.insert(field, data)?;
        }
        Ok((out, dropped))
    }
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
    fn insert_rejects_ragged_columns() {
        let mut t = table(&[("a", &[1.0, 2.0])]);
        assert!(matches!(t.insert("b", vec![1.0]), Err(Error::Schema(_))));
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut t = table(&[("a", &[1.0])]);
        assert!(matches!(t.insert("a", vec![2.0]), Err(Error::Schema(_))));
    }

    #[test]
    fn select_keeps_rows_aligned() {
        let t = table(&[("a", &[1.0, 2.0, 3.0]), ("b", &[4.0, 5.0, 6.0])]);
        let s = t.select(&[true, false, true]).unwrap();
        assert_eq!(s.n_rows(), 2);
        assert_eq!(s.column("a").unwrap().to_vec(), vec![1.0, 3.0]);
        assert_eq!(s.column("b").unwrap().to_vec(), vec![4.0, 6.0]);
    }

    #[test]
    fn select_of_nothing_is_a_valid_empty_table() {
        let t = table(&[("a", &[1.0, 2.0])]);
        let s = t.select(&[false, false]).unwrap();
        assert!(s.is_empty());
        assert!(s.has_field("a"));
    }

    #[test]
    fn select_with_wrong_mask_length_is_a_schema_error() {
        let t = table(&[("a", &[1.0, 2.0])]);
        assert!(matches!(t.select(&[true]), Err(Error::Schema(_))));
    }

    #[test]
    fn concat_preserves_row_order() {
        let a = table(&[("x", &[1.0, 2.0])]);
        let b = table(&[("x", &[3.0])]);
        let (merged, dropped) = EventTable::concat(&[a, b]).unwrap();
        assert_eq!(merged.column("x").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(dropped.is_empty());
    }

    #[test]
    fn concat_drops_fields_missing_from_any_part() {
        let a = table(&[("x", &[1.0]), ("y", &[2.0])]);
        let b = table(&[("x", &[3.0]), ("z", &[4.0])]);
        let (merged, dropped) = EventTable::concat(&[a, b]).unwrap();
        assert_eq!(merged.fields().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(dropped, vec!["y".to_string(), "z".to_string()]);
    }
}
