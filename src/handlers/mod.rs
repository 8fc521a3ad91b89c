pub mod health;
pub mod library;
pub mod recommendations;

pub use health::health_check;
pub use library::library_config;
pub use recommendations::recommendations_config;
