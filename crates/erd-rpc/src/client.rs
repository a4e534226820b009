use std::path::{Path, PathBuf};
use std::time::Duration;

use erd_sensor::{Difference, Reading};
use erd_transport::{IpcStream, SocketPathConfig, UnixDomainSocket};
use erd_wire::{
    decode_difference_response, decode_readings_response, encode_obtain_readings,
    encode_subtract, FrameConfig, FrameStream, Operation, RequestFrame, ResponseFrame, Status,
};
use tracing::debug;

use crate::error::{Result, RpcError};

/// Client connection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Read timeout for responses. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write timeout for requests. `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
}

/// A connection to an erd daemon.
pub struct Client {
    stream: FrameStream<IpcStream>,
    path: PathBuf,
}

impl Client {
    /// Connect to the daemon at `path` with default settings.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, ClientConfig::default())
    }

    /// Connect to the daemon at the path given by `ERD_SOCKET` or the runtime directory.
    pub fn connect_default() -> Result<Self> {
        Self::connect(SocketPathConfig::from_env().resolve())
    }

    pub fn connect_with_config(path: impl AsRef<Path>, config: ClientConfig) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixDomainSocket::connect(path)?;
        let stream = FrameStream::with_config_ipc(
            stream,
            FrameConfig {
                read_timeout: config.read_timeout,
                write_timeout: config.write_timeout,
            },
        )?;
        debug!(path = %path.display(), "connected to erd daemon");
        Ok(Self {
            stream,
            path: path.to_path_buf(),
        })
    }

    /// Ask the daemon for a fresh sample of its counter.
    pub fn obtain_readings(&mut self) -> Result<Reading> {
        let response = self.call(Operation::ObtainReadings, &encode_obtain_readings())?;
        Ok(decode_readings_response(&response)?)
    }

    /// Ask the daemon for `lhs - rhs`, corrected for counter wraparound.
    ///
    /// `lhs` must be the later sample; reversed arguments yield a negative
    /// duration and a bogus energy value.
    pub fn subtract(&mut self, lhs: &Reading, rhs: &Reading) -> Result<Difference> {
        let response = self.call(Operation::Subtract, &encode_subtract(lhs, rhs))?;
        Ok(decode_difference_response(&response)?)
    }

    /// Socket path this client is connected to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn call(&mut self, operation: Operation, request: &RequestFrame) -> Result<ResponseFrame> {
        self.stream.send_request(request)?;
        let response = self.stream.recv_response()?;
        if response.status()? == Status::Error {
            return Err(RpcError::RequestFailed(operation));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use erd_sensor::{Microjoules, Timestamp};
    use erd_wire::{encode_error_response, encode_response, ResponseValue};

    use super::*;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/erd-client-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("erd.sock")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    /// Serve exactly the given responses, one per request, in order.
    fn scripted_server(path: &Path, responses: Vec<ResponseFrame>) -> thread::JoinHandle<()> {
        let listener = UnixDomainSocket::bind(path).expect("listener should bind");
        thread::spawn(move || {
            let stream = listener.accept().expect("listener should accept");
            let mut frames = FrameStream::new(stream);
            for response in responses {
                frames.recv_request().expect("request should arrive");
                frames.send_response(&response).expect("response should send");
            }
        })
    }

    #[test]
    fn obtain_readings_decodes_success_response() {
        let path = make_sock_path("ok");
        let reading = Reading::new(Timestamp::from_nanos(11), Microjoules(22));
        let server = scripted_server(
            &path,
            vec![encode_response(
                Status::Success,
                &ResponseValue::Readings(reading),
            )],
        );

        let mut client = Client::connect(&path).expect("client should connect");
        assert_eq!(client.obtain_readings().unwrap(), reading);
        server.join().expect("server thread should finish");
        cleanup(&path);
    }

    #[test]
    fn error_status_is_request_failed() {
        let path = make_sock_path("status");
        let server = scripted_server(&path, vec![encode_error_response(Operation::Subtract)]);

        let mut client = Client::connect(&path).expect("client should connect");
        let err = client
            .subtract(&Reading::default(), &Reading::default())
            .unwrap_err();
        assert!(matches!(err, RpcError::RequestFailed(Operation::Subtract)));
        assert_eq!(err.kind(), erd_sensor::ErrorKind::BadMessage);
        server.join().expect("server thread should finish");
        cleanup(&path);
    }

    #[test]
    fn mismatched_response_is_bad_message() {
        let path = make_sock_path("mismatch");
        let server = scripted_server(
            &path,
            vec![encode_response(
                Status::Success,
                &ResponseValue::Readings(Reading::default()),
            )],
        );

        let mut client = Client::connect(&path).expect("client should connect");
        let err = client
            .subtract(&Reading::default(), &Reading::default())
            .unwrap_err();
        assert!(matches!(err, RpcError::Wire(_)));
        assert_eq!(err.kind(), erd_sensor::ErrorKind::BadMessage);
        server.join().expect("server thread should finish");
        cleanup(&path);
    }

    #[test]
    fn closed_connection_is_system_error() {
        let path = make_sock_path("closed");
        let server = scripted_server(&path, Vec::new());

        let mut client = Client::connect(&path).expect("client should connect");
        server.join().expect("server thread should finish");
        let err = client.obtain_readings().unwrap_err();
        assert_eq!(err.kind(), erd_sensor::ErrorKind::System);
        cleanup(&path);
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let path = make_sock_path("missing");
        let err = Client::connect(&path).unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
        cleanup(&path);
    }
}
