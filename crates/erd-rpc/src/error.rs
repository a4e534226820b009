use erd_sensor::ErrorKind;
use erd_wire::Operation;

/// Errors raised by the erd client and daemon.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Socket bind, accept or connect failed.
    #[error("transport error: {0}")]
    Transport(#[from] erd_transport::TransportError),

    /// A frame could not be transferred or decoded.
    #[error("wire error: {0}")]
    Wire(#[from] erd_wire::WireError),

    /// The daemon's sensor could not be opened.
    #[error("sensor error: {0}")]
    Sensor(#[from] erd_sensor::SensorError),

    /// The daemon answered with an error status.
    #[error("daemon rejected {0} request")]
    RequestFailed(Operation),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Transport(_) => ErrorKind::System,
            RpcError::Wire(err) => err.kind(),
            RpcError::Sensor(err) => err.kind(),
            RpcError::RequestFailed(_) => ErrorKind::BadMessage,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
