//! WebSocket Chat Hub Library
//!
//! Maintains a set of live WebSocket connections and routes small JSON
//! messages among them: presence (user list), public broadcast and
//! point-to-point private delivery.
//!
//! # Architecture
//! - `Registry` holds every live connection and its display name behind a
//!   reader/writer lock
//! - Each connection has a read task forwarding decoded payloads into one
//!   `mpsc` queue
//! - `Dispatcher` is the single consumer of that queue, so all
//!   state-changing events are handled strictly in arrival order
//! - `Broadcaster` and `PrivateRouter` snapshot the registry, send outside
//!   the lock and prune connections whose send failed
//!
//! # Example
//! ```ignore
//! use chat_hub::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind(&Config::default()).await.unwrap();
//!     server.run_until_ctrl_c().await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod private;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::Config;
pub use connection::{Connection, SharedConnection, WsConnection};
pub use dispatcher::{Dispatcher, Event};
pub use error::{AppError, ReceiveError, RegistryError, SendError};
pub use handler::handle_connection;
pub use hub::Hub;
pub use message::{Action, Payload, Response, ResponseAction};
pub use private::{PrivateOutcome, PrivateRouter};
pub use registry::{Eviction, Registry};
pub use server::Server;
pub use types::ConnectionId;
