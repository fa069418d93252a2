pub mod health;
pub mod patients;
pub mod store;
pub mod triage;
