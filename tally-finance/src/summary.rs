//! Per-statement roll-up: outflow per category, largest first.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::{Category, Statement, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// `None` collects outflows the categorizer had no rule for
    pub category: Option<Category>,
    pub total: Decimal,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementSummary {
    pub statement_id: Uuid,
    pub file_name: String,
    pub transaction_count: usize,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

impl StatementSummary {
    pub fn build(statement: &Statement, transactions: &[Transaction]) -> Self {
        let mut groups: HashMap<Option<Category>, (Decimal, usize)> = HashMap::new();
        let (mut debits, mut credits) = (Decimal::ZERO, Decimal::ZERO);

        for t in transactions {
            if !t.transaction_type.is_outflow() {
                credits += t.amount;
                continue;
            }
            debits += t.amount;
            let entry = groups.entry(t.category).or_insert((Decimal::ZERO, 0));
            entry.0 += t.amount;
            entry.1 += 1;
        }

        let mut by_category: Vec<CategoryTotal> = groups
            .into_iter()
            .map(|(category, (total, transaction_count))| CategoryTotal {
                category,
                total,
                transaction_count,
            })
            .collect();
        // Ties broken by name so output is stable across runs
        by_category.sort_by(|a, b| {
            b.total.cmp(&a.total).then_with(|| {
                let name = |c: &CategoryTotal| c.category.map_or("", |c| c.name());
                name(a).cmp(name(b))
            })
        });

        Self {
            statement_id: statement.id,
            file_name: statement.file_name.clone(),
            transaction_count: transactions.len(),
            total_debits: debits,
            total_credits: credits,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::TransactionType;

    fn txn(amount: i64, ty: TransactionType, category: Option<Category>) -> Transaction {
        Transaction {
            statement_id: Uuid::nil(),
            account_id: None,
            transaction_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            post_date: None,
            description: "x".into(),
            merchant_name: "x".into(),
            category,
            amount: Decimal::new(amount, 2),
            transaction_type: ty,
        }
    }

    #[test]
    fn test_groups_outflows_by_category() {
        let txns = vec![
            txn(1200, TransactionType::Debit, Some(Category::Dining)),
            txn(4550, TransactionType::Debit, Some(Category::Groceries)),
            txn(800, TransactionType::Debit, Some(Category::Dining)),
            txn(3900, TransactionType::Fee, Some(Category::Fees)),
            txn(10000, TransactionType::Credit, None),
            txn(500, TransactionType::Debit, None),
        ];
        let st = Statement::new("jan.pdf");
        let s = StatementSummary::build(&st, &txns);

        assert_eq!(s.transaction_count, 6);
        assert_eq!(s.total_credits, Decimal::new(10000, 2));
        assert_eq!(s.total_debits, Decimal::new(10950, 2));

        let order: Vec<_> = s.by_category.iter().map(|c| c.category).collect();
        assert_eq!(
            order,
            vec![
                Some(Category::Groceries),
                Some(Category::Fees),
                Some(Category::Dining),
                None
            ]
        );
        assert_eq!(s.by_category[2].transaction_count, 2);
        assert_eq!(s.by_category[2].total, Decimal::new(2000, 2));
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let txns = vec![
            txn(1000, TransactionType::Debit, Some(Category::Travel)),
            txn(1000, TransactionType::Debit, Some(Category::Gas)),
        ];
        let s = StatementSummary::build(&Statement::new("x.pdf"), &txns);
        assert_eq!(s.by_category[0].category, Some(Category::Gas));
    }
}
