//! Bank transactions: the data model, the store gateway and the JSON
//! endpoints for listing transactions, reading the balance and clearing the
//! store.

mod balance_endpoint;
mod clear_endpoint;
mod core;
mod db;
mod list_endpoint;
mod query;

pub use balance_endpoint::get_balance_endpoint;
pub use clear_endpoint::clear_transactions_endpoint;
pub use core::{NewTransaction, Transaction, TransactionStatus, TransactionType};
pub use db::{
    Balance, count_transactions, count_transactions_by_status, create_transaction,
    create_transaction_table, create_transactions, delete_all_transactions, get_all_transactions,
    get_balance, get_transaction, get_transactions_by_status,
};
pub use list_endpoint::{get_issues_endpoint, get_transactions_endpoint};
pub use query::{
    ListingQuery, ListingScope, SortField, SortOrder, TransactionFilters, TransactionListing,
    TransactionSort, list_transactions,
};

#[cfg(test)]
pub(crate) use db::create_transactions_at;
