use std::path::Path;
use std::time::Duration;

use erd_sensor::{EnergyReader, Reader};
use erd_transport::{IpcStream, UnixDomainSocket};
use erd_wire::{
    decode_subtract, encode_error_response_tag, encode_response, FrameConfig, FrameStream,
    Operation, RequestFrame, ResponseFrame, ResponseValue, Status, WireError,
};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Daemon settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Permission bits applied to the socket file.
    pub socket_mode: u32,
    /// Per-connection read timeout. `None` waits for clients indefinitely.
    pub read_timeout: Option<Duration>,
    /// Per-connection write timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Serves one energy reader over a local socket, one connection at a time.
pub struct Daemon {
    socket: UnixDomainSocket,
    reader: Reader,
    config: DaemonConfig,
}

impl Daemon {
    /// Bind the daemon socket, replacing any stale socket file at `path`.
    pub fn bind(path: impl AsRef<Path>, reader: Reader, config: DaemonConfig) -> Result<Self> {
        let socket = UnixDomainSocket::bind_with_mode(path, config.socket_mode)?;
        info!(
            path = %socket.path().display(),
            sensor = %reader.attributes(),
            backend = %reader.backend(),
            "erd daemon listening"
        );
        Ok(Self {
            socket,
            reader,
            config,
        })
    }

    /// Accept one connection and serve it until the client disconnects.
    ///
    /// Returns the number of requests answered on that connection.
    pub fn serve_next(&mut self) -> Result<u64> {
        let stream = self.socket.accept()?;
        Ok(self.serve_connection(stream))
    }

    /// Serve connections forever.
    ///
    /// A failed accept re-binds the socket path and carries on; this only
    /// returns if re-binding fails too. A connection dropped on an I/O error
    /// or EOF does not re-bind: the listener stays up so clients already
    /// queued in the backlog are still served.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.socket.accept() {
                Ok(stream) => {
                    self.serve_connection(stream);
                }
                Err(err) => {
                    warn!(error = %err, "accept failed, re-binding socket");
                    self.socket.rebind()?;
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    fn serve_connection(&self, stream: IpcStream) -> u64 {
        match stream.peer_credentials() {
            Some((uid, gid, pid)) => debug!(uid, gid, pid, "client connected"),
            None => debug!("client connected"),
        }

        let frame_config = FrameConfig {
            read_timeout: self.config.read_timeout,
            write_timeout: self.config.write_timeout,
        };
        let mut frames = match FrameStream::with_config_ipc(stream, frame_config) {
            Ok(frames) => frames,
            Err(err) => {
                warn!(error = %err, "failed to configure client stream");
                return 0;
            }
        };

        let mut served = 0u64;
        loop {
            let request = match frames.recv_request() {
                Ok(request) => request,
                Err(WireError::ConnectionClosed) => {
                    debug!(served, "client disconnected");
                    return served;
                }
                Err(err) => {
                    warn!(error = %err, served, "dropping client connection");
                    return served;
                }
            };

            let response = handle_request(&self.reader, &request);
            if let Err(err) = frames.send_response(&response) {
                warn!(error = %err, served, "dropping client connection");
                return served;
            }
            served += 1;
        }
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("path", &self.socket.path())
            .field("reader", &self.reader)
            .field("config", &self.config)
            .finish()
    }
}

/// Answer one request with `reader`.
///
/// Never fails: sensor errors and malformed requests become an error-status
/// response echoing the request's operation tag.
pub fn handle_request<R>(reader: &R, request: &RequestFrame) -> ResponseFrame
where
    R: EnergyReader + ?Sized,
{
    match dispatch(reader, request) {
        Ok(value) => encode_response(Status::Success, &value),
        Err(err) => {
            warn!(
                operation = request.operation_tag(),
                kind = ?err.kind(),
                error = %err,
                "request failed"
            );
            encode_error_response_tag(request.operation_tag())
        }
    }
}

fn dispatch<R>(reader: &R, request: &RequestFrame) -> Result<ResponseValue>
where
    R: EnergyReader + ?Sized,
{
    match request.operation()? {
        Operation::ObtainReadings => Ok(ResponseValue::Readings(reader.obtain_readings()?)),
        Operation::Subtract => {
            let (lhs, rhs) = decode_subtract(request)?;
            if lhs.timestamp < rhs.timestamp {
                warn!(
                    lhs = lhs.timestamp.as_nanos(),
                    rhs = rhs.timestamp.as_nanos(),
                    "subtract called with the earlier reading first"
                );
            }
            Ok(ResponseValue::Difference(reader.subtract(&lhs, &rhs)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;

    use erd_sensor::{
        Attributes, Backend, ClockSource, Difference, Domain, Microjoules, Reading, ReaderConfig,
        SensorError, SensorRoots, Timestamp,
    };
    use erd_wire::{
        decode_difference_response, decode_readings_response, encode_obtain_readings,
        encode_subtract, REQUEST_SIZE,
    };

    use super::*;
    use crate::client::Client;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/erd-daemon-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    /// Minimal single-package powercap tree: `intel-rapl:0` named `package-0`.
    fn fake_package(dir: &Path, energy: u64, max: u64) -> (SensorRoots, PathBuf) {
        let topology = dir.join("cpu/cpu0/topology");
        std::fs::create_dir_all(&topology).unwrap();
        std::fs::write(topology.join("physical_package_id"), "0\n").unwrap();

        let zone = dir.join("intel-rapl/intel-rapl:0");
        std::fs::create_dir_all(&zone).unwrap();
        std::fs::write(zone.join("name"), "package-0\n").unwrap();
        std::fs::write(zone.join("energy_uj"), format!("{energy}\n")).unwrap();
        std::fs::write(zone.join("max_energy_range_uj"), format!("{max}\n")).unwrap();

        let roots = SensorRoots {
            powercap: dir.join("intel-rapl"),
            cpu: dir.join("cpu"),
        };
        (roots, zone)
    }

    fn nop_reader() -> Reader {
        let config = ReaderConfig {
            backend: Backend::Nop,
            ..ReaderConfig::default()
        };
        Reader::new(Attributes::default(), &config).unwrap()
    }

    struct FailingReader;

    impl EnergyReader for FailingReader {
        fn obtain_readings(&self) -> erd_sensor::Result<Reading> {
            Err(SensorError::SocketNotFound(3))
        }

        fn subtract(&self, lhs: &Reading, rhs: &Reading) -> Difference {
            Difference::new(lhs.timestamp.nanos_since(rhs.timestamp), Microjoules(1))
        }

        fn attributes(&self) -> Attributes {
            Attributes::new(Domain::Dram, 3)
        }
    }

    #[test]
    fn sensor_failure_becomes_error_status() {
        let response = handle_request(&FailingReader, &encode_obtain_readings());
        assert_eq!(response.operation().unwrap(), Operation::ObtainReadings);
        assert_eq!(response.status().unwrap(), Status::Error);
    }

    #[test]
    fn subtract_is_dispatched_to_reader() {
        let lhs = Reading::new(Timestamp::from_nanos(50), Microjoules(9));
        let rhs = Reading::new(Timestamp::from_nanos(20), Microjoules(3));
        let response = handle_request(&FailingReader, &encode_subtract(&lhs, &rhs));
        assert_eq!(response.status().unwrap(), Status::Success);
        assert_eq!(
            decode_difference_response(&response).unwrap(),
            Difference::new(30, Microjoules(1))
        );
    }

    #[test]
    fn unknown_operation_echoes_tag() {
        let mut bytes = [0u8; REQUEST_SIZE];
        bytes[..4].copy_from_slice(&5u32.to_le_bytes());
        let response = handle_request(&FailingReader, &RequestFrame::from_bytes(bytes));
        assert_eq!(&response.as_bytes()[..4], &5u32.to_le_bytes());
        assert_eq!(response.status().unwrap(), Status::Error);
    }

    #[test]
    fn bad_units_in_subtract_become_error_status() {
        let mut bytes = *encode_subtract(&Reading::default(), &Reading::default()).as_bytes();
        bytes[20..22].copy_from_slice(&4u16.to_le_bytes());
        let response = handle_request(&FailingReader, &RequestFrame::from_bytes(bytes));
        assert_eq!(response.operation().unwrap(), Operation::Subtract);
        assert_eq!(response.status().unwrap(), Status::Error);
    }

    #[test]
    fn connection_survives_failed_request() {
        let dir = temp_dir("survive");
        let path = dir.join("erd.sock");
        let mut daemon = Daemon::bind(&path, nop_reader(), DaemonConfig::default()).unwrap();
        let server = thread::spawn(move || daemon.serve_next().expect("serve should succeed"));

        let stream = UnixDomainSocket::connect(&path).expect("client should connect");
        let mut frames = FrameStream::new(stream);

        let mut bogus = [0u8; REQUEST_SIZE];
        bogus[..4].copy_from_slice(&9u32.to_le_bytes());
        frames
            .send_request(&RequestFrame::from_bytes(bogus))
            .unwrap();
        let response = frames.recv_response().unwrap();
        assert_eq!(response.status().unwrap(), Status::Error);

        frames.send_request(&encode_obtain_readings()).unwrap();
        let response = frames.recv_response().unwrap();
        assert_eq!(response.status().unwrap(), Status::Success);
        assert_eq!(
            decode_readings_response(&response).unwrap().energy,
            Microjoules::ZERO
        );

        drop(frames);
        assert_eq!(server.join().expect("server thread should finish"), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn serves_sequential_clients() {
        let dir = temp_dir("sequential");
        let path = dir.join("erd.sock");
        let mut daemon = Daemon::bind(&path, nop_reader(), DaemonConfig::default()).unwrap();
        let server = thread::spawn(move || {
            let first = daemon.serve_next().expect("first connection should be served");
            let second = daemon.serve_next().expect("second connection should be served");
            (first, second)
        });

        {
            let mut client = Client::connect(&path).unwrap();
            client.obtain_readings().unwrap();
        }
        {
            let mut client = Client::connect(&path).unwrap();
            client.obtain_readings().unwrap();
            client.obtain_readings().unwrap();
        }

        assert_eq!(server.join().expect("server thread should finish"), (1, 2));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_replaces_stale_socket_file() {
        let dir = temp_dir("stale");
        let path = dir.join("erd.sock");
        std::fs::write(&path, b"left over").unwrap();

        let daemon = Daemon::bind(&path, nop_reader(), DaemonConfig::default()).unwrap();
        assert_eq!(daemon.path(), path.as_path());
        drop(daemon);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn end_to_end_package_zero_with_wraparound() {
        let dir = temp_dir("e2e");
        let path = dir.join("erd.sock");
        let (roots, zone) = fake_package(&dir, 90, 100);

        let config = ReaderConfig {
            backend: Backend::Powercap,
            roots,
            clock: ClockSource::Monotonic,
        };
        let reader = Reader::new(Attributes::new(Domain::Package, 0), &config).unwrap();
        let mut daemon = Daemon::bind(&path, reader, DaemonConfig::default()).unwrap();
        let server = thread::spawn(move || daemon.serve_next().expect("serve should succeed"));

        let mut client = Client::connect(&path).unwrap();
        let first = client.obtain_readings().unwrap();
        assert_eq!(first.energy, Microjoules(90));

        thread::sleep(Duration::from_secs(1));
        std::fs::write(zone.join("energy_uj"), "10\n").unwrap();
        let second = client.obtain_readings().unwrap();
        assert_eq!(second.energy, Microjoules(10));

        let diff = client.subtract(&second, &first).unwrap();
        assert_eq!(diff.energy_consumed, Microjoules(20));
        assert!(diff.duration_ns >= 1_000_000_000, "{diff:?}");
        assert!(diff.duration_ns < 1_500_000_000, "{diff:?}");

        drop(client);
        assert_eq!(server.join().expect("server thread should finish"), 3);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
