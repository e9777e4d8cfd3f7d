use std::collections::HashMap;
use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use crate::error::Error;
use super::{comm::Communicator, util};

const RETRY_WAIT: Duration = Duration::from_millis(50);
const RETRY_MAX_WAIT: Duration = Duration::from_millis(2000);
const RETRY_ATTEMPTS: usize = 30;




/// An infinite stream of back-off durations which grow by a constant factor
/// up to some maximum delay.
struct ExponentialBackoff {
    curr: Duration,
    max: Duration,
    factor: u32,
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        let delay = self.curr;
        self.curr = (self.curr * self.factor).min(self.max);
        Some(delay)
    }
}




fn connect_with_retry(addr: SocketAddr) -> Result<TcpStream, Error> {
    let backoff = ExponentialBackoff {
        curr: RETRY_WAIT,
        max: RETRY_MAX_WAIT,
        factor: 2,
    };
    let mut last_error = None;

    for delay in backoff.take(RETRY_ATTEMPTS) {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => {
                debug!("connect to {} failed: {}; retry in {:?}", addr, e, delay);
                last_error = Some(e);
                thread::sleep(delay);
            }
        }
    }
    Err(Error::Communication(format!(
        "could not connect to {}: {}",
        addr,
        last_error.map_or_else(|| "no attempts made".to_string(), |e| e.to_string())
    )))
}




fn start_listener(listener: TcpListener, inbound: Sender<Vec<u8>>) {
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let inbound = inbound.clone();
                    thread::spawn(move || handle_connection(stream, inbound));
                }
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                }
            }
        }
    });
}




fn handle_connection(stream: TcpStream, inbound: Sender<Vec<u8>>) {
    let remote = stream.peer_addr().ok();
    let mut reader = BufReader::new(stream);
    debug!("receiving connection from {:?}", remote);

    loop {
        match util::read_frame(&mut reader) {
            Ok(Some(bytes)) => {
                if inbound.send(bytes).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("connection from {:?} failed: {}", remote, e);
                break;
            }
        }
    }
}




fn start_sender(peers: Vec<SocketAddr>, outbound: Receiver<(usize, Vec<u8>)>, failures: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut table: HashMap<usize, TcpStream> = HashMap::new();

        for (rank, message) in outbound {
            let result = (|| {
                if !table.contains_key(&rank) {
                    table.insert(rank, connect_with_retry(peers[rank])?);
                }
                let stream = table
                    .get_mut(&rank)
                    .ok_or_else(|| Error::Communication(format!("no stream to rank {}", rank)))?;

                if let Err(e) = util::write_frame(stream, &message) {
                    warn!("send to {} failed ({}), reconnecting", peers[rank], e);
                    let mut fresh = connect_with_retry(peers[rank])?;
                    util::write_frame(&mut fresh, &message).map_err(|e| Error::Communication(e.to_string()))?;
                    table.insert(rank, fresh);
                }
                Ok::<(), Error>(())
            })();

            if let Err(e) = result {
                error!("{}", e);
                failures.send(e.to_string()).ok();
                break;
            }
        }
    })
}




/**
 * A communicator whose peers are processes (or threads) reachable by TCP.
 * Messages are length-prefixed frames. Sends are queued to a background
 * thread which keeps one connection per peer, so `send` never blocks.
 */
pub struct TcpCommunicator {
    rank: usize,
    num_peers: usize,
    outbound: Option<Sender<(usize, Vec<u8>)>>,
    loopback: Sender<Vec<u8>>,
    inbound: Receiver<Vec<u8>>,
    failures: Receiver<String>,
    send_thread: Option<thread::JoinHandle<()>>,
}




// ============================================================================
impl TcpCommunicator {

    /// Bind the address of `rank` in `peers` and start the transport threads.
    pub fn new(rank: usize, peers: Vec<SocketAddr>) -> Result<Self, Error> {
        let addr = *peers
            .get(rank)
            .ok_or_else(|| Error::Communication(format!("rank {} has no address", rank)))?;
        let listener = TcpListener::bind(addr).map_err(|e| Error::Communication(format!("bind {}: {}", addr, e)))?;
        Self::with_listener(rank, listener, peers)
    }

    /// Use an already bound listener for this rank.
    pub fn with_listener(rank: usize, listener: TcpListener, peers: Vec<SocketAddr>) -> Result<Self, Error> {
        if rank >= peers.len() {
            return Err(Error::Communication(format!(
                "rank {} out of range for {} peers",
                rank,
                peers.len()
            )));
        }
        info!(
            "rank {} listening on {}",
            rank,
            listener.local_addr().map_err(|e| Error::Communication(e.to_string()))?
        );

        let (inbound_sink, inbound) = crossbeam_channel::unbounded();
        let (outbound, outbound_src) = crossbeam_channel::unbounded();
        let (failure_sink, failures) = crossbeam_channel::unbounded();

        start_listener(listener, inbound_sink.clone());
        let send_thread = start_sender(peers.clone(), outbound_src, failure_sink);

        Ok(Self {
            rank,
            num_peers: peers.len(),
            outbound: Some(outbound),
            loopback: inbound_sink,
            inbound,
            failures,
            send_thread: Some(send_thread),
        })
    }

    fn check_failures(&self) -> Result<(), Error> {
        match self.failures.try_recv() {
            Ok(message) => Err(Error::Communication(message)),
            Err(_) => Ok(()),
        }
    }
}

impl Communicator for TcpCommunicator {

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.num_peers
    }

    fn send(&self, rank: usize, message: Vec<u8>) -> Result<(), Error> {
        self.check_failures()?;

        if rank >= self.num_peers {
            return Err(Error::Communication(format!("no rank {} in a group of {}", rank, self.num_peers)));
        }
        if rank == self.rank {
            return self
                .loopback
                .send(message)
                .map_err(|_| Error::Communication("inbound queue closed".into()));
        }
        self.outbound
            .as_ref()
            .ok_or_else(|| Error::Communication("communicator is shutting down".into()))?
            .send((rank, message))
            .map_err(|_| Error::Communication("send thread has stopped".into()))
    }

    fn recv(&self) -> Result<Vec<u8>, Error> {
        crossbeam_channel::select! {
            recv(self.inbound) -> message => message.map_err(|_| Error::Communication("inbound queue closed".into())),
            recv(self.failures) -> failure => Err(Error::Communication(failure.unwrap_or_else(|_| "send thread has stopped".into()))),
        }
    }
}

impl Drop for TcpCommunicator {
    fn drop(&mut self) {
        self.outbound.take();

        if let Some(handle) = self.send_thread.take() {
            if handle.join().is_err() {
                error!("send thread of rank {} panicked", self.rank);
            }
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn two_ranks_exchange_over_loopback() {
        let listeners: Vec<_> = (0..2).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect();
        let peers: Vec<_> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();

        let handles: Vec<_> = listeners
            .into_iter()
            .enumerate()
            .map(|(rank, listener)| {
                let peers = peers.clone();
                thread::spawn(move || {
                    let comm = TcpCommunicator::with_listener(rank, listener, peers).unwrap();
                    let other = 1 - rank;
                    comm.send(other, format!("hello from {}", rank).into_bytes()).unwrap();
                    comm.send(rank, b"self".to_vec()).unwrap();

                    let mut received: Vec<String> = (0..2)
                        .map(|_| String::from_utf8(comm.recv().unwrap()).unwrap())
                        .collect();
                    received.sort();
                    received
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], vec!["hello from 1".to_string(), "self".to_string()]);
        assert_eq!(results[1], vec!["hello from 0".to_string(), "self".to_string()]);
    }
}
