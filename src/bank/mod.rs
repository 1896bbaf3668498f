//! Item bank: the validated, read-only collection of calibrated items.
//!
//! A bank is loaded once, validated at the boundary, and never mutated for
//! the lifetime of the sessions that share it. Duplicate identifiers,
//! non-finite parameters and non-positive discrimination are all rejected at
//! load time: an item with a ≤ 0 degenerates the information function and
//! would silently invert selection, so it never enters the pool.

use std::collections::HashMap;

use crate::types::Item;

// ==================== Errors ====================

#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("item bank is empty")]
    Empty,
    #[error("duplicate item identifier: {0}")]
    DuplicateId(String),
    #[error("item {id}: non-positive discrimination a = {a}")]
    NonPositiveDiscrimination { id: String, a: f64 },
    #[error("item {id}: non-finite parameter (a = {a}, b = {b})")]
    NonFiniteParameter { id: String, a: f64, b: f64 },
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

// ==================== Item Bank ====================

/// Read-only mapping from item identifier to calibrated item parameters.
///
/// Iteration order is load order, which also serves as the canonical
/// tie-break ordering for selection. Safe to share across concurrent
/// sessions behind an `Arc`: nothing mutates a bank after construction.
#[derive(Clone, Debug)]
pub struct ItemBank {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ItemBank {
    /// Build a bank from items, validating every entry.
    pub fn new(items: Vec<Item>) -> Result<Self, BankError> {
        if items.is_empty() {
            return Err(BankError::Empty);
        }

        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if !item.a.is_finite() || !item.b.is_finite() {
                return Err(BankError::NonFiniteParameter {
                    id: item.id.clone(),
                    a: item.a,
                    b: item.b,
                });
            }
            if item.a <= 0.0 {
                return Err(BankError::NonPositiveDiscrimination {
                    id: item.id.clone(),
                    a: item.a,
                });
            }
            if index.insert(item.id.clone(), pos).is_some() {
                return Err(BankError::DuplicateId(item.id.clone()));
            }
        }

        Ok(Self { items, index })
    }

    /// Parse a bank from delimited tabular text (comma-separated, header row).
    ///
    /// Required columns: `ItemID`, `a`, `b`. The calibrated-bank aliases
    /// `a_est`/`b_est` are accepted in place of `a`/`b`. Extra columns
    /// (question text, options, answer keys) belong to the presentation
    /// layer and are ignored.
    pub fn from_delimited(text: &str) -> Result<Self, BankError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next().ok_or(BankError::Empty)?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        let id_col = find_column(&columns, &["ItemID"]).ok_or(BankError::MissingColumn("ItemID"))?;
        let a_col = find_column(&columns, &["a", "a_est"]).ok_or(BankError::MissingColumn("a"))?;
        let b_col = find_column(&columns, &["b", "b_est"]).ok_or(BankError::MissingColumn("b"))?;

        let mut items = Vec::new();
        for (line_idx, line) in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let line = line_idx + 1;

            let id = field_at(&fields, id_col, line)?;
            let a = parse_field(&fields, a_col, line)?;
            let b = parse_field(&fields, b_col, line)?;

            items.push(Item::new(id, a, b));
        }

        Self::new(items)
    }

    /// Number of items in the pool.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by identifier.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Items in load order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

fn find_column(columns: &[&str], names: &[&str]) -> Option<usize> {
    columns
        .iter()
        .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
}

fn field_at(fields: &[&str], col: usize, line: usize) -> Result<String, BankError> {
    fields
        .get(col)
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .ok_or_else(|| BankError::Parse {
            line,
            message: format!("missing field in column {col}"),
        })
}

fn parse_field(fields: &[&str], col: usize, line: usize) -> Result<f64, BankError> {
    let raw = field_at(fields, col, line)?;
    raw.parse::<f64>().map_err(|_| BankError::Parse {
        line,
        message: format!("expected a number, got {raw:?}"),
    })
}

// ==================== Unit Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn three_items() -> Vec<Item> {
        vec![
            Item::new("Q1", 1.5, -1.0),
            Item::new("Q2", 2.0, 0.0),
            Item::new("Q3", 1.0, 1.0),
        ]
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_valid_bank() {
        let bank = ItemBank::new(three_items()).unwrap();
        assert_eq!(bank.len(), 3);
        assert!(bank.contains("Q2"));
        assert_eq!(bank.get("Q3").unwrap().b, 1.0);
        assert!(bank.get("Q4").is_none());
    }

    #[test]
    fn test_empty_bank_rejected() {
        assert!(matches!(ItemBank::new(vec![]), Err(BankError::Empty)));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut items = three_items();
        items.push(Item::new("Q2", 1.1, 0.4));

        match ItemBank::new(items) {
            Err(BankError::DuplicateId(id)) => assert_eq!(id, "Q2"),
            other => panic!("expected DuplicateId, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_discrimination_rejected() {
        for a in [0.0, -0.8] {
            let items = vec![Item::new("Q1", a, 0.0)];
            assert!(matches!(
                ItemBank::new(items),
                Err(BankError::NonPositiveDiscrimination { .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_parameter_rejected() {
        let items = vec![Item::new("Q1", f64::NAN, 0.0)];
        assert!(matches!(
            ItemBank::new(items),
            Err(BankError::NonFiniteParameter { .. })
        ));
    }

    #[test]
    fn test_load_order_preserved() {
        let bank = ItemBank::new(three_items()).unwrap();
        let ids: Vec<&str> = bank.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
    }

    // ==================== Delimited Parsing Tests ====================

    #[test]
    fn test_from_delimited_basic() {
        let text = "ItemID,a,b\nQ1,1.5,-1.0\nQ2,2.0,0.0\n";
        let bank = ItemBank::from_delimited(text).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get("Q1").unwrap().a, 1.5);
    }

    #[test]
    fn test_from_delimited_calibrated_aliases() {
        let text = "ItemID,a_est,b_est\nQ1,1.4,0.2\n";
        let bank = ItemBank::from_delimited(text).unwrap();
        assert_eq!(bank.get("Q1").unwrap().b, 0.2);
    }

    #[test]
    fn test_from_delimited_tolerates_extra_columns() {
        let text = "ItemID,Question,a,b,OptionA,OptionB,CorrectAnswer\n\
                    Q1,What is 2+2?,1.5,-1.0,3,4,B\n\
                    Q2,What is 7*8?,2.0,0.5,54,56,B\n";
        let bank = ItemBank::from_delimited(text).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get("Q2").unwrap().b, 0.5);
    }

    #[test]
    fn test_from_delimited_missing_column() {
        let text = "ItemID,a\nQ1,1.5\n";
        assert!(matches!(
            ItemBank::from_delimited(text),
            Err(BankError::MissingColumn("b"))
        ));
    }

    #[test]
    fn test_from_delimited_bad_number() {
        let text = "ItemID,a,b\nQ1,high,0.0\n";
        assert!(matches!(
            ItemBank::from_delimited(text),
            Err(BankError::Parse { .. })
        ));
    }

    #[test]
    fn test_from_delimited_skips_blank_lines() {
        let text = "ItemID,a,b\n\nQ1,1.5,-1.0\n\n";
        let bank = ItemBank::from_delimited(text).unwrap();
        assert_eq!(bank.len(), 1);
    }
}
