pub mod error;
pub mod handler;
pub mod listener;

pub use error::ServerError;
pub use handler::RequestHandler;
pub use listener::ServerListener;

pub type Result<T> = std::result::Result<T, ServerError>;
