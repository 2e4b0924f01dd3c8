pub mod app;
pub mod events;
pub mod routes;
pub mod websocket;

pub use app::*;
pub use events::*;
pub use routes::*;
pub use websocket::*;
