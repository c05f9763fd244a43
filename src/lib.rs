pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod lookup;
pub mod model;
pub mod observability;
pub mod wal;
