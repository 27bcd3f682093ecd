//! In-memory adapters for tests and database-less local runs.

mod payment_store;

pub use payment_store::InMemoryPaymentStore;
