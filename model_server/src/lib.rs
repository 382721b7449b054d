pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod interrupt;
pub mod server;

pub use cache::ModelCache;
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use error::{HandlerErr, ServerErr};
pub use handlers::{Handlers, ModelHandler};
pub use interrupt::ShutdownFlag;
pub use server::ModelServer;
