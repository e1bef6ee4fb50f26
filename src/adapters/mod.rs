//! Adapters implementing the ports.

pub mod gateway;
pub mod memory;
pub mod postgres_challan_repository;
pub mod postgres_filing_repository;

pub use gateway::{DecliningGateway, SimulatedGateway};
pub use memory::InMemoryStore;
pub use postgres_challan_repository::PostgresChallanRepository;
pub use postgres_filing_repository::PostgresFilingRepository;
