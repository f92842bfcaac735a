//! In-process transport
//!
//! [`memory_pair`] returns the client end ([`MemoryTransport`]) and the
//! coordinator end ([`MemoryPeer`]) of one connection. Packets travel over
//! unbounded tokio channels; the client side drains its inbound channel on a
//! plain reader thread so no async runtime is needed by the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::{Connector, Endpoint, InboundSink, Transport, TransportError, TransportResult};

enum Inbound {
    Packet(Bytes),
    Lost(String),
    Closed,
}

/// Client end of an in-process connection
pub struct MemoryTransport {
    to_peer: mpsc::UnboundedSender<Bytes>,
    control: mpsc::UnboundedSender<Inbound>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    severed: Arc<AtomicBool>,
    frames_sent: AtomicU64,
}

/// Coordinator end of an in-process connection
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<Inbound>,
    from_client: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    severed: Arc<AtomicBool>,
    runtime: Runtime,
}

/// Create a connected transport/peer pair.
pub fn memory_pair() -> TransportResult<(MemoryTransport, MemoryPeer)> {
    let (to_peer, from_client) = mpsc::unbounded_channel();
    let (to_client, inbound) = mpsc::unbounded_channel();
    let severed = Arc::new(AtomicBool::new(false));

    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TransportError::ConnectFailed {
            endpoint: "memory".into(),
            reason: e.to_string(),
        })?;

    let transport = MemoryTransport {
        to_peer,
        control: to_client.clone(),
        inbound: Mutex::new(Some(inbound)),
        reader: Mutex::new(None),
        closed: AtomicBool::new(false),
        severed: Arc::clone(&severed),
        frames_sent: AtomicU64::new(0),
    };
    let peer = MemoryPeer {
        to_client,
        from_client: Mutex::new(from_client),
        severed,
        runtime,
    };
    Ok((transport, peer))
}

impl Transport for MemoryTransport {
    fn start(&self, sink: Arc<dyn InboundSink>) -> TransportResult<()> {
        let mut inbound = self.inbound.lock().take().ok_or(TransportError::AlreadyStarted)?;

        let handle = thread::Builder::new()
            .name("fedpro-memory-reader".into())
            .spawn(move || {
                while let Some(event) = inbound.blocking_recv() {
                    match event {
                        Inbound::Packet(packet) => sink.on_frame(packet),
                        Inbound::Lost(reason) => {
                            sink.on_connection_lost(&reason);
                            break;
                        }
                        Inbound::Closed => break,
                    }
                }
                tracing::debug!("memory transport reader stopped");
            })
            .map_err(|e| TransportError::ConnectFailed {
                endpoint: "memory".into(),
                reason: e.to_string(),
            })?;

        *self.reader.lock() = Some(handle);
        Ok(())
    }

    fn send(&self, packet: Bytes) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if self.severed.load(Ordering::Acquire) {
            return Err(TransportError::Disconnected("peer severed the connection".into()));
        }
        self.to_peer
            .send(packet)
            .map_err(|_| TransportError::Disconnected("peer dropped".into()))?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.control.send(Inbound::Closed);

        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            // close() may run on the reader thread itself, from inside the sink.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl MemoryPeer {
    /// Push one packet to the client.
    pub fn send(&self, packet: Bytes) -> TransportResult<()> {
        if self.severed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.to_client
            .send(Inbound::Packet(packet))
            .map_err(|_| TransportError::Disconnected("client dropped".into()))
    }

    /// Wait up to `timeout` for the next packet from the client.
    ///
    /// Returns `None` on timeout or once the client end is gone.
    pub fn recv(&self, timeout: Duration) -> Option<Bytes> {
        let mut rx = self.from_client.lock();
        self.runtime
            .block_on(async { tokio::time::timeout(timeout, rx.recv()).await })
            .ok()
            .flatten()
    }

    /// Take a packet only if one is already waiting.
    pub fn try_recv(&self) -> Option<Bytes> {
        self.from_client.lock().try_recv().ok()
    }

    /// Drop the connection, reporting `reason` to the client as a loss.
    pub fn sever(&self, reason: &str) {
        if self.severed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.to_client.send(Inbound::Lost(reason.to_string()));
    }

    pub fn is_severed(&self) -> bool {
        self.severed.load(Ordering::Acquire)
    }
}

impl Drop for MemoryPeer {
    fn drop(&mut self) {
        self.sever("coordinator went away");
    }
}

type Accept = dyn Fn(MemoryPeer, &Endpoint) + Send + Sync;

/// Hands the coordinator end of every new connection to a callback.
pub struct MemoryConnector {
    accept: Box<Accept>,
    connections: AtomicU64,
}

impl MemoryConnector {
    pub fn new<F>(accept: F) -> Self
    where
        F: Fn(MemoryPeer, &Endpoint) + Send + Sync + 'static,
    {
        MemoryConnector {
            accept: Box::new(accept),
            connections: AtomicU64::new(0),
        }
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, endpoint: &Endpoint) -> TransportResult<Box<dyn Transport>> {
        let (transport, peer) = memory_pair()?;
        (self.accept)(peer, endpoint);
        self.connections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%endpoint, "memory connection opened");
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;

    use crate::Protocol;

    #[derive(Default)]
    struct Collect {
        packets: Mutex<Vec<Bytes>>,
        lost: Mutex<Vec<String>>,
    }

    impl InboundSink for Collect {
        fn on_frame(&self, packet: Bytes) {
            self.packets.lock().push(packet);
        }

        fn on_connection_lost(&self, reason: &str) {
            self.lost.lock().push(reason.to_string());
        }
    }

    fn wait_for(cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_packets_both_ways() {
        let (transport, peer) = memory_pair().unwrap();
        let sink = Arc::new(Collect::default());
        transport.start(sink.clone()).unwrap();

        transport.send(Bytes::from_static(b"up")).unwrap();
        assert_eq!(peer.recv(Duration::from_secs(1)).unwrap(), Bytes::from_static(b"up"));
        assert_eq!(transport.frames_sent(), 1);

        peer.send(Bytes::from_static(b"a")).unwrap();
        peer.send(Bytes::from_static(b"b")).unwrap();
        wait_for(|| sink.packets.lock().len() == 2);
        assert_eq!(sink.packets.lock()[0], Bytes::from_static(b"a"));
        assert_eq!(sink.packets.lock()[1], Bytes::from_static(b"b"));
    }

    #[test]
    fn test_sever_reports_loss_once() {
        let (transport, peer) = memory_pair().unwrap();
        let sink = Arc::new(Collect::default());
        transport.start(sink.clone()).unwrap();

        peer.sever("cable cut");
        peer.sever("again");
        wait_for(|| !sink.lost.lock().is_empty());
        assert_eq!(*sink.lost.lock(), vec!["cable cut".to_string()]);
        assert!(matches!(
            transport.send(Bytes::new()),
            Err(TransportError::Disconnected(_))
        ));
    }

    #[test]
    fn test_close_is_silent() {
        let (transport, peer) = memory_pair().unwrap();
        let sink = Arc::new(Collect::default());
        transport.start(sink.clone()).unwrap();

        transport.close();
        drop(peer);
        thread::sleep(Duration::from_millis(20));
        assert!(sink.lost.lock().is_empty());
        assert_eq!(transport.send(Bytes::new()), Err(TransportError::Closed));
    }

    #[test]
    fn test_start_twice() {
        let (transport, _peer) = memory_pair().unwrap();
        transport.start(Arc::new(Collect::default())).unwrap();
        assert_eq!(
            transport.start(Arc::new(Collect::default())).unwrap_err(),
            TransportError::AlreadyStarted
        );
    }

    #[test]
    fn test_recv_timeout() {
        let (_transport, peer) = memory_pair().unwrap();
        assert!(peer.recv(Duration::from_millis(10)).is_none());
        assert!(peer.try_recv().is_none());
    }

    #[test]
    fn test_connector_hands_over_peer() {
        let (tx, rx) = std_mpsc::channel();
        let connector = MemoryConnector::new(move |peer, endpoint| {
            tx.send((peer, endpoint.port)).unwrap();
        });
        let endpoint = Endpoint {
            host: "localhost".into(),
            port: 15164,
            protocol: Protocol::Tcp,
            connect_timeout: Duration::from_secs(1),
        };
        let transport = connector.connect(&endpoint).unwrap();
        let (peer, port) = rx.recv().unwrap();
        assert_eq!(port, 15164);
        assert_eq!(connector.connections(), 1);

        transport.send(Bytes::from_static(b"x")).unwrap();
        assert!(peer.recv(Duration::from_secs(1)).is_some());
    }
}
