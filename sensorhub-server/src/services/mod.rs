mod auth_service;
mod broker_service;
mod command_service;
mod ingest_service;
mod query_service;
mod seed_service;
mod token_service;

pub use auth_service::*;
pub use broker_service::*;
pub use command_service::*;
pub use ingest_service::*;
pub use query_service::*;
pub use seed_service::*;
pub use token_service::*;
