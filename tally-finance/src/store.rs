//! Persistence boundary. The processor only talks to a `StatementStore`;
//! `MemoryStore` backs the CLI and the tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tally_core::{Account, InstitutionCode, Statement, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Backend(String),
}

/// Statements, accounts, their transactions and the uploaded documents.
///
/// Calls are synchronous and short; the processor invokes them from blocking
/// tasks as well as from async code.
pub trait StatementStore: Send + Sync {
    fn save_statement(&self, statement: &Statement) -> Result<(), StoreError>;
    fn statement(&self, id: Uuid) -> Result<Option<Statement>, StoreError>;
    fn statements(&self) -> Result<Vec<Statement>, StoreError>;
    /// Returns whether the statement existed.
    fn delete_statement(&self, id: Uuid) -> Result<bool, StoreError>;

    fn save_account(&self, account: &Account) -> Result<(), StoreError>;
    fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    fn accounts_by_institution(
        &self,
        institution: InstitutionCode,
    ) -> Result<Vec<Account>, StoreError>;

    fn transactions(&self, statement_id: Uuid) -> Result<Vec<Transaction>, StoreError>;
    /// Swap the statement's whole transaction set in one write.
    fn replace_transactions(
        &self,
        statement_id: Uuid,
        transactions: Vec<Transaction>,
    ) -> Result<(), StoreError>;
    /// Returns how many were removed.
    fn delete_transactions(&self, statement_id: Uuid) -> Result<usize, StoreError>;

    fn put_document(&self, statement_id: Uuid, bytes: Vec<u8>) -> Result<(), StoreError>;
    fn document(&self, statement_id: Uuid) -> Result<Option<Vec<u8>>, StoreError>;
    fn delete_document(&self, statement_id: Uuid) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Tables {
    // insertion order, so listings are stable
    statement_order: Vec<Uuid>,
    statements: HashMap<Uuid, Statement>,
    accounts: Vec<Account>,
    transactions: HashMap<Uuid, Vec<Transaction>>,
    documents: HashMap<Uuid, Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.lock()?.accounts.clone())
    }
}

impl StatementStore for MemoryStore {
    fn save_statement(&self, statement: &Statement) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        if t.statements.insert(statement.id, statement.clone()).is_none() {
            t.statement_order.push(statement.id);
        }
        Ok(())
    }

    fn statement(&self, id: Uuid) -> Result<Option<Statement>, StoreError> {
        Ok(self.lock()?.statements.get(&id).cloned())
    }

    fn statements(&self) -> Result<Vec<Statement>, StoreError> {
        let t = self.lock()?;
        Ok(t.statement_order
            .iter()
            .filter_map(|id| t.statements.get(id).cloned())
            .collect())
    }

    fn delete_statement(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        t.statement_order.retain(|s| *s != id);
        Ok(t.statements.remove(&id).is_some())
    }

    fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        match t.accounts.iter_mut().find(|a| a.id == account.id) {
            Some(slot) => *slot = account.clone(),
            None => t.accounts.push(account.clone()),
        }
        Ok(())
    }

    fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.iter().find(|a| a.id == id).cloned())
    }

    fn accounts_by_institution(
        &self,
        institution: InstitutionCode,
    ) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .lock()?
            .accounts
            .iter()
            .filter(|a| a.institution == institution)
            .cloned()
            .collect())
    }

    fn transactions(&self, statement_id: Uuid) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .lock()?
            .transactions
            .get(&statement_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_transactions(
        &self,
        statement_id: Uuid,
        transactions: Vec<Transaction>,
    ) -> Result<(), StoreError> {
        self.lock()?.transactions.insert(statement_id, transactions);
        Ok(())
    }

    fn delete_transactions(&self, statement_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .lock()?
            .transactions
            .remove(&statement_id)
            .map_or(0, |v| v.len()))
    }

    fn put_document(&self, statement_id: Uuid, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.lock()?.documents.insert(statement_id, bytes);
        Ok(())
    }

    fn document(&self, statement_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.documents.get(&statement_id).cloned())
    }

    fn delete_document(&self, statement_id: Uuid) -> Result<(), StoreError> {
        self.lock()?.documents.remove(&statement_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_listed_in_insertion_order() {
        let store = MemoryStore::new();
        let a = Statement::new("a.pdf");
        let mut b = Statement::new("b.pdf");
        store.save_statement(&a).unwrap();
        store.save_statement(&b).unwrap();
        b.minimum_payment = Some(rust_decimal::Decimal::ONE);
        store.save_statement(&b).unwrap();

        let names: Vec<_> = store
            .statements()
            .unwrap()
            .into_iter()
            .map(|s| s.file_name)
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert!(store.statement(b.id).unwrap().unwrap().minimum_payment.is_some());

        assert!(store.delete_statement(a.id).unwrap());
        assert!(!store.delete_statement(a.id).unwrap());
        assert_eq!(store.statements().unwrap().len(), 1);
    }

    #[test]
    fn test_accounts_by_institution() {
        let store = MemoryStore::new();
        let mut chase = Account::new("Chase Card", InstitutionCode::Chase);
        store.save_account(&chase).unwrap();
        store
            .save_account(&Account::new("Citi Card", InstitutionCode::Citi))
            .unwrap();
        chase.metadata.last4 = Some("1234".into());
        store.save_account(&chase).unwrap();

        let found = store.accounts_by_institution(InstitutionCode::Chase).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.last4.as_deref(), Some("1234"));
        assert_eq!(store.accounts().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_transactions_counts() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.delete_transactions(id).unwrap(), 0);
        assert!(store.transactions(id).unwrap().is_empty());
    }
}
