use log::debug;
use serde::{Deserialize, Serialize};
use crate::error::Error;
use super::comm::Communicator;




/// What an envelope carries, from the point of view of its receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    /// Rows for the receiver's left ghost cells.
    LeftGhosts,
    /// Rows for the receiver's right ghost cells.
    RightGhosts,
    /// Owned rows sent to the coordinator for output.
    Gather,
    /// A partial sum sent to the coordinator.
    Partial,
    /// A total broadcast by the coordinator.
    Total,
}




/**
 * The unit of exchange between ranks. The sequence number counts operations
 * of the same kind, so a receiver can tell a message of the current
 * exchange from one sent early by a peer that is already a step ahead.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub tag: Tag,
    pub seq: u64,
    pub source: usize,
    pub payload: Vec<f64>,
}




/**
 * Wraps a communicator and delivers envelopes by (tag, sequence, source).
 * Envelopes that arrive before they are asked for are held until they are.
 */
pub struct Mailbox {
    comm: Box<dyn Communicator>,
    pending: Vec<Envelope>,
}




// ============================================================================
impl Mailbox {

    pub fn new(comm: Box<dyn Communicator>) -> Self {
        Self {
            comm,
            pending: Vec::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// Number of envelopes received but not yet asked for.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    pub fn send(&self, dest: usize, tag: Tag, seq: u64, payload: Vec<f64>) -> Result<(), Error> {
        let envelope = Envelope {
            tag,
            seq,
            source: self.comm.rank(),
            payload,
        };
        let bytes = rmp_serde::encode::to_vec(&envelope).map_err(|e| Error::Communication(e.to_string()))?;
        self.comm.send(dest, bytes)
    }

    /// Block until the envelope with the given tag and sequence number from
    /// `source` has arrived, and return its payload.
    pub fn receive(&mut self, tag: Tag, seq: u64, source: usize) -> Result<Vec<f64>, Error> {
        let matches = |e: &Envelope| e.tag == tag && e.seq == seq && e.source == source;

        if let Some(i) = self.pending.iter().position(matches) {
            return Ok(self.pending.swap_remove(i).payload);
        }
        loop {
            let bytes = self.comm.recv()?;
            let envelope: Envelope = rmp_serde::decode::from_slice(&bytes).map_err(|e| Error::Communication(e.to_string()))?;

            if matches(&envelope) {
                return Ok(envelope.payload);
            }
            debug!(
                "rank {} holding {:?} #{} from {} while waiting for {:?} #{} from {}",
                self.comm.rank(),
                envelope.tag,
                envelope.seq,
                envelope.source,
                tag,
                seq,
                source
            );
            self.pending.push(envelope);
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::message::ChannelCommunicator;

    #[test]
    fn early_envelopes_are_held_until_asked_for() {
        let mut group = ChannelCommunicator::group(2).into_iter();
        let a = Mailbox::new(Box::new(group.next().unwrap()));
        let mut b = Mailbox::new(Box::new(group.next().unwrap()));

        a.send(1, Tag::LeftGhosts, 1, vec![2.0]).unwrap();
        a.send(1, Tag::RightGhosts, 0, vec![1.0]).unwrap();
        a.send(1, Tag::LeftGhosts, 0, vec![0.0]).unwrap();

        assert_eq!(b.receive(Tag::LeftGhosts, 0, 0).unwrap(), vec![0.0]);
        assert_eq!(b.num_pending(), 2);
        assert_eq!(b.receive(Tag::LeftGhosts, 1, 0).unwrap(), vec![2.0]);
        assert_eq!(b.receive(Tag::RightGhosts, 0, 0).unwrap(), vec![1.0]);
        assert_eq!(b.num_pending(), 0);
    }

    #[test]
    fn envelope_survives_message_pack() {
        let envelope = Envelope {
            tag: Tag::Gather,
            seq: 7,
            source: 3,
            payload: vec![0.1, -2.5],
        };
        let bytes = rmp_serde::encode::to_vec(&envelope).unwrap();
        let decoded: Envelope = rmp_serde::decode::from_slice(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }
}
