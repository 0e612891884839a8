// netconsole-api: authenticated async client for the netconsole REST backend

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod pipeline;
pub mod refresh;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use auth::{LOGIN_PATH, LoginResponse, REFRESH_PATH, RefreshResponse, User};
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use devices::Device;
pub use error::Error;
pub use pipeline::{BearerAuth, Exchange, LatencyLog, Pipeline, RequestStage, ResponseStage};
pub use refresh::RefreshPolicy;
pub use request::{RequestDescriptor, RequestMetadata};
pub use response::ApiResponse;
pub use session::{
    FileSessionStore, KeyringSessionStore, MemorySessionStore, Session, SessionStore,
    SharedSessionStore,
};
pub use transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};

pub use reqwest::Method;
