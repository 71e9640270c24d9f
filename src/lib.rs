pub mod config;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod schema;
pub mod storage;
pub mod traits;
pub mod trending;

// Re-export common types for convenience
pub use config::*;
pub use executor::*;
pub use model::*;
pub use traits::*;
