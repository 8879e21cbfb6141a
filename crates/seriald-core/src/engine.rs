//! TTY I/O event loop
//!
//! One task multiplexing serial-read, serial-write and the queue wake
//! channel. Purely reactive: no state beyond the write queue and the
//! line framer it drives. Generic over the I/O so tests run over
//! `tokio::io::duplex` instead of a real port.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, trace};

use seriald_framing::LineFramer;

use crate::error::DaemonError;
use crate::queue::WriteQueue;

/// Bytes per serial read attempt
const READ_CHUNK_SZ: usize = 256;

/// The serial-side event loop
///
/// Reads frame into lines which leave through the bridge pipe as JSON
/// envelopes; writes drain the shared queue in baud-proportional chunks.
pub struct TtyEngine<T> {
    io: T,
    queue: WriteQueue,
    framer: LineFramer,
    write_chunk: usize,
    shutdown: watch::Receiver<bool>,
}

impl<T> TtyEngine<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create an engine over an already-configured serial stream
    pub fn new(
        io: T,
        queue: WriteQueue,
        write_chunk: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            io,
            queue,
            framer: LineFramer::new(),
            write_chunk,
            shutdown,
        }
    }

    /// Run the loop until shutdown or a fatal condition
    ///
    /// `pipe` is the write end of the byte stream feeding the bus
    /// bridge. On exit, pending queue contents and framer state are
    /// discarded; nothing is flushed.
    pub async fn run<W>(mut self, mut pipe: W) -> Result<(), DaemonError>
    where
        W: AsyncWrite + Unpin,
    {
        info!(write_chunk = self.write_chunk, "TTY engine started");

        let (mut reader, mut writer) = tokio::io::split(self.io);
        let mut rd_buf = vec![0u8; READ_CHUNK_SZ];
        self.queue.clear();

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // snapshot the next write chunk; empty disables the write arm
            let chunk = self.queue.peek_chunk(self.write_chunk);

            tokio::select! {
                _ = self.shutdown.changed() => break,

                res = reader.read(&mut rd_buf) => match res {
                    Ok(0) => return Err(DaemonError::DeviceClosed),
                    Ok(n) => {
                        trace!(n, "read from serial");
                        self.framer.push_bytes(&rd_buf[..n]);
                        while let Some(line) = self.framer.next_line() {
                            Self::forward_line(&mut pipe, &line).await?;
                        }
                    }
                    Err(e) if would_block(&e) => {}
                    Err(e) => return Err(DaemonError::SerialIo(e)),
                },

                _ = self.queue.notified(), if chunk.is_empty() => {
                    // nothing to do; the next iteration sees the new
                    // queue length and arms the write branch
                }

                res = writer.write(&chunk), if !chunk.is_empty() => match res {
                    Ok(0) => {
                        return Err(DaemonError::SerialIo(std::io::Error::new(
                            std::io::ErrorKind::WriteZero,
                            "serial write returned 0 bytes",
                        )))
                    }
                    Ok(n) => {
                        trace!(n, "wrote to serial");
                        self.queue.consume(n);
                    }
                    Err(e) if would_block(&e) => {}
                    Err(e) => return Err(DaemonError::SerialIo(e)),
                },
            }
        }

        debug!("TTY engine stopped");
        Ok(())
    }

    /// Serialize one framed line as its bus envelope and commit it to
    /// the bridge pipe
    async fn forward_line<W>(pipe: &mut W, line: &str) -> Result<(), DaemonError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut envelope = serde_json::json!({ "data": line }).to_string().into_bytes();
        envelope.push(b'\n');

        pipe.write_all(&envelope)
            .await
            .map_err(|_| DaemonError::PipeClosed)?;
        pipe.flush().await.map_err(|_| DaemonError::PipeClosed)?;
        Ok(())
    }
}

fn would_block(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    /// Engine over duplex I/O plus the handles a test drives it with
    struct Harness {
        serial_peer: tokio::io::DuplexStream,
        pipe_rx: BufReader<tokio::io::DuplexStream>,
        queue: WriteQueue,
        shutdown_tx: watch::Sender<bool>,
        engine: tokio::task::JoinHandle<Result<(), DaemonError>>,
    }

    async fn start_engine(write_chunk: usize) -> Harness {
        let (serial, serial_peer) = tokio::io::duplex(1024);
        let (pipe_tx, pipe_rx) = tokio::io::duplex(1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = WriteQueue::new();

        let engine = TtyEngine::new(serial, queue.clone(), write_chunk, shutdown_rx);
        let handle = tokio::spawn(engine.run(pipe_tx));

        // let the engine reach its select loop (it resets the queue on
        // entry) before the test starts feeding it
        tokio::task::yield_now().await;

        Harness {
            serial_peer,
            pipe_rx: BufReader::new(pipe_rx),
            queue,
            shutdown_tx,
            engine: handle,
        }
    }

    #[tokio::test]
    async fn test_framed_line_reaches_pipe_as_envelope() {
        let mut h = start_engine(64).await;

        h.serial_peer.write_all(b"AT\r\n").await.unwrap();

        let mut line = String::new();
        h.pipe_rx.read_line(&mut line).await.unwrap();
        assert_eq!(line, "{\"data\":\"AT\"}\n");

        h.shutdown_tx.send(true).unwrap();
        h.engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let mut h = start_engine(64).await;

        h.serial_peer.write_all(b"AT").await.unwrap();
        tokio::task::yield_now().await;
        h.serial_peer.write_all(b"\r\nOK\r\n").await.unwrap();

        let mut line = String::new();
        h.pipe_rx.read_line(&mut line).await.unwrap();
        assert_eq!(line, "{\"data\":\"AT\"}\n");

        line.clear();
        h.pipe_rx.read_line(&mut line).await.unwrap();
        assert_eq!(line, "{\"data\":\"OK\"}\n");

        h.shutdown_tx.send(true).unwrap();
        h.engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_queue_drains_to_serial() {
        let mut h = start_engine(64).await;

        assert!(h.queue.enqueue("hello"));

        let mut buf = vec![0u8; 16];
        let n = h.serial_peer.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        assert!(h.queue.is_empty());

        h.shutdown_tx.send(true).unwrap();
        h.engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_small_write_chunk_preserves_order() {
        let mut h = start_engine(4).await;

        assert!(h.queue.enqueue("abcdefghij"));

        let mut collected = Vec::new();
        let mut buf = vec![0u8; 4];
        while collected.len() < 11 {
            let n = h.serial_peer.read(&mut buf).await.unwrap();
            assert!(n <= 4);
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"abcdefghij\n");

        h.shutdown_tx.send(true).unwrap();
        h.engine.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_device_close_is_fatal() {
        let h = start_engine(64).await;

        drop(h.serial_peer);

        let err = h.engine.await.unwrap().unwrap_err();
        assert!(matches!(err, DaemonError::DeviceClosed));
    }

    #[tokio::test]
    async fn test_queue_reset_on_loop_entry() {
        let (serial, _serial_peer) = tokio::io::duplex(1024);
        let (pipe_tx, _pipe_rx) = tokio::io::duplex(1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = WriteQueue::new();

        // data queued before the loop starts is discarded on entry
        assert!(queue.enqueue("stale"));

        let engine = TtyEngine::new(serial, queue.clone(), 64, shutdown_rx);
        let handle = tokio::spawn(engine.run(pipe_tx));
        tokio::task::yield_now().await;

        assert!(queue.is_empty());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
