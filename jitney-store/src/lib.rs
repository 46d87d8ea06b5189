pub mod app_config;
pub mod events;
pub mod memory;
pub mod postgres;

pub use events::EventPublisher;
pub use memory::MemoryStore;
pub use postgres::PgStore;
