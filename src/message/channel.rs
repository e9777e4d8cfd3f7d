use crossbeam_channel::{Receiver, Sender};
use crate::error::Error;
use super::comm::Communicator;




/**
 * A communicator whose peers are threads of the same process, connected by
 * unbounded crossbeam channels.
 */
pub struct ChannelCommunicator {
    rank: usize,
    peers: Vec<Sender<Vec<u8>>>,
    inbox: Receiver<Vec<u8>>,
}




// ============================================================================
impl ChannelCommunicator {

    /// Create a fully connected group of `size` communicators, one per rank.
    pub fn group(size: usize) -> Vec<Self> {
        let (sinks, sources): (Vec<_>, Vec<_>) = (0..size).map(|_| crossbeam_channel::unbounded()).unzip();

        sources
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Self {
                rank,
                peers: sinks.clone(),
                inbox,
            })
            .collect()
    }
}

impl Communicator for ChannelCommunicator {

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&self, rank: usize, message: Vec<u8>) -> Result<(), Error> {
        self.peers
            .get(rank)
            .ok_or_else(|| Error::Communication(format!("no rank {} in a group of {}", rank, self.peers.len())))?
            .send(message)
            .map_err(|_| Error::Communication(format!("rank {} has hung up", rank)))
    }

    fn recv(&self) -> Result<Vec<u8>, Error> {
        self.inbox
            .recv()
            .map_err(|_| Error::Communication("all peers have hung up".into()))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn ring_of_threads_passes_messages() {
        let handles: Vec<_> = ChannelCommunicator::group(4)
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    let dest = (comm.rank() + 1) % comm.size();
                    comm.send(dest, vec![comm.rank() as u8]).unwrap();
                    comm.recv().unwrap()[0] as usize
                })
            })
            .collect();

        let received: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(received, vec![3, 0, 1, 2]);
    }

    #[test]
    fn sending_to_unknown_rank_fails() {
        let group = ChannelCommunicator::group(2);
        assert!(group[0].send(5, vec![]).is_err());
    }
}
