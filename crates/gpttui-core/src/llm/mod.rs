mod adapter;
mod chatsonic;
mod colossal;
mod openai;
mod traits;
pub mod transport;

pub use adapter::Adapter;
pub use chatsonic::{ChatSonicClient, ChatSonicConfig, ChatSonicMessage};
pub use colossal::{ColossalClient, ColossalConfig, ColossalTurn};
pub use openai::{OpenAIClient, OpenAIConfig};
pub use traits::*;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};

use crate::error::Result;
use crate::session::SessionManager;
use std::sync::Arc;

/// Build a ready-to-use backend talking HTTP through reqwest.
pub fn configure(config: BackendConfig, session: SessionManager) -> Result<Box<dyn ChatBackend>> {
    let accept_invalid_certs = matches!(&config, BackendConfig::Colossal(c) if c.accept_invalid_certs);
    let transport = Arc::new(HttpTransport::with_invalid_certs(accept_invalid_certs)?);
    configure_with_transport(config, session, transport)
}

/// Build a backend over an explicit transport.
pub fn configure_with_transport(
    config: BackendConfig,
    session: SessionManager,
    transport: Arc<dyn Transport>,
) -> Result<Box<dyn ChatBackend>> {
    let backend: Box<dyn ChatBackend> = match config {
        BackendConfig::OpenAI(c) => Box::new(Adapter::configure(
            OpenAIClient::new(c)?,
            session,
            transport,
        )),
        BackendConfig::ChatSonic(c) => Box::new(Adapter::configure(
            ChatSonicClient::new(c)?,
            session,
            transport,
        )),
        BackendConfig::Colossal(c) => Box::new(Adapter::configure(
            ColossalClient::new(c),
            session,
            transport,
        )),
    };
    Ok(backend)
}
