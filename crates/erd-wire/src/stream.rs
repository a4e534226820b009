use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use erd_transport::IpcStream;

use crate::codec::{RequestFrame, ResponseFrame, REQUEST_SIZE, RESPONSE_SIZE};
use crate::error::{Result, WireError};

/// Timeouts applied to a frame stream. `None` blocks indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameConfig {
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

/// Sends and receives whole erd frames over any `Read + Write` stream.
///
/// Short reads and writes are retried until the full fixed-size frame has
/// been transferred; callers never see a partial frame.
pub struct FrameStream<T> {
    inner: T,
}

impl<T: Read + Write> FrameStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn send_request(&mut self, frame: &RequestFrame) -> Result<()> {
        self.write_exact(frame.as_bytes())
    }

    pub fn recv_request(&mut self) -> Result<RequestFrame> {
        let mut buf = [0u8; REQUEST_SIZE];
        self.read_exact(&mut buf)?;
        Ok(RequestFrame::from_bytes(buf))
    }

    pub fn send_response(&mut self, frame: &ResponseFrame) -> Result<()> {
        self.write_exact(frame.as_bytes())
    }

    pub fn recv_response(&mut self) -> Result<ResponseFrame> {
        let mut buf = [0u8; RESPONSE_SIZE];
        self.read_exact(&mut buf)?;
        Ok(ResponseFrame::from_bytes(buf))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the frame stream and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.inner.read(&mut buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        Ok(())
    }

    fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.inner.write(&buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }
}

impl FrameStream<IpcStream> {
    /// Wrap an `IpcStream` and apply the configured timeouts.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(|err| WireError::Io(err.into_io_error()))?;
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(|err| WireError::Io(err.into_io_error()))?;
        Ok(Self::new(inner))
    }
}

impl<T> std::fmt::Debug for FrameStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use erd_sensor::{Microjoules, Reading, Timestamp};

    use super::*;
    use crate::codec::{
        decode_readings_response, decode_subtract, encode_obtain_readings, encode_response,
        encode_subtract, Operation, ResponseValue, Status,
    };

    /// Hands out at most one byte per call and interrupts every other call.
    #[derive(Default)]
    struct Trickle {
        incoming: VecDeque<u8>,
        outgoing: Vec<u8>,
        calls: usize,
    }

    impl Trickle {
        fn with_incoming(bytes: &[u8]) -> Self {
            Self {
                incoming: bytes.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn interrupt(&mut self) -> bool {
            self.calls += 1;
            self.calls % 2 == 0
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt() {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            match (self.incoming.pop_front(), buf.first_mut()) {
                (Some(byte), Some(slot)) => {
                    *slot = byte;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupt() {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            match buf.first() {
                Some(byte) => {
                    self.outgoing.push(*byte);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Closed;

    impl Read for Closed {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn reading(nanos: i64, energy: u64) -> Reading {
        Reading::new(Timestamp::from_nanos(nanos), Microjoules(energy))
    }

    #[test]
    fn partial_writes_deliver_whole_request() {
        let frame = encode_subtract(&reading(10, 20), &reading(1, 2));
        let mut stream = FrameStream::new(Trickle::default());
        stream.send_request(&frame).unwrap();
        assert_eq!(stream.get_ref().outgoing.as_slice(), frame.as_bytes());
    }

    #[test]
    fn partial_reads_assemble_whole_request() {
        let frame = encode_subtract(&reading(10, 20), &reading(1, 2));
        let mut stream = FrameStream::new(Trickle::with_incoming(frame.as_bytes()));
        let received = stream.recv_request().unwrap();
        assert_eq!(
            decode_subtract(&received).unwrap(),
            (reading(10, 20), reading(1, 2))
        );
    }

    #[test]
    fn back_to_back_frames_stay_aligned() {
        let first = encode_response(Status::Success, &ResponseValue::Readings(reading(1, 1)));
        let second = encode_response(Status::Success, &ResponseValue::Readings(reading(2, 2)));
        let mut wire = first.as_bytes().to_vec();
        wire.extend_from_slice(second.as_bytes());

        let mut stream = FrameStream::new(Trickle::with_incoming(&wire));
        let a = stream.recv_response().unwrap();
        let b = stream.recv_response().unwrap();
        assert_eq!(decode_readings_response(&a).unwrap(), reading(1, 1));
        assert_eq!(decode_readings_response(&b).unwrap(), reading(2, 2));
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let frame = encode_obtain_readings();
        let mut stream = FrameStream::new(Trickle::with_incoming(&frame.as_bytes()[..10]));
        let err = stream.recv_request().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
        assert!(err.is_transport());
    }

    #[test]
    fn eof_before_frame_is_connection_closed() {
        let mut stream = FrameStream::new(Closed);
        assert!(matches!(
            stream.recv_response(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut stream = FrameStream::new(Closed);
        assert!(matches!(
            stream.send_request(&encode_obtain_readings()),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn unix_pair_carries_frames() {
        let (a, b) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut client = FrameStream::new(a);
        let mut server = FrameStream::new(b);

        client.send_request(&encode_obtain_readings()).unwrap();
        let request = server.recv_request().unwrap();
        assert_eq!(request.operation().unwrap(), Operation::ObtainReadings);

        let reply = encode_response(Status::Success, &ResponseValue::Readings(reading(5, 6)));
        server.send_response(&reply).unwrap();
        let got = client.recv_response().unwrap();
        assert_eq!(decode_readings_response(&got).unwrap(), reading(5, 6));
    }

    #[test]
    fn write_timeout_surfaces_as_io_error() {
        let (a, _idle_peer) = std::os::unix::net::UnixStream::pair().unwrap();
        a.set_write_timeout(Some(Duration::from_millis(50))).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let mut stream = FrameStream::new(a);
            let frame = encode_obtain_readings();
            // The peer never reads, so the socket buffer fills and the timeout fires.
            let outcome = loop {
                if let Err(err) = stream.send_request(&frame) {
                    break err;
                }
            };
            let _ = tx.send(outcome);
        });

        let err = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("send should fail once the write timeout expires");
        match err {
            WireError::Io(io) => assert!(matches!(
                io.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            )),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
