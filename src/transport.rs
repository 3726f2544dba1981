//! Migration wire protocol (§6): a three-message-shape sequence over a
//! typed, tagged transport, used only by the archipelago driver.
use crate::error::GaulError;
use crate::operators::{Operators, PopulationMeta};
use crate::wire;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    NumEntities,
    EntityLen,
    EntityFitness,
    EntityChromosome,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub tag: Tag,
    pub payload: Vec<u8>,
}

impl Message {
    fn int(tag: Tag, value: i64) -> Self {
        Message { tag, payload: value.to_le_bytes().to_vec() }
    }
    fn float(tag: Tag, value: f64) -> Self {
        Message { tag, payload: value.to_le_bytes().to_vec() }
    }
    fn bytes(tag: Tag, payload: Vec<u8>) -> Self {
        Message { tag, payload }
    }

    fn as_i64(&self) -> Result<i64, GaulError> {
        let bytes: [u8; 8] = self
            .payload
            .as_slice()
            .try_into()
            .map_err(|_| GaulError::TransportFailure("integer message payload is not 8 bytes".to_string()))?;
        Ok(i64::from_le_bytes(bytes))
    }
    fn as_f64(&self) -> Result<f64, GaulError> {
        let bytes: [u8; 8] = self
            .payload
            .as_slice()
            .try_into()
            .map_err(|_| GaulError::TransportFailure("float message payload is not 8 bytes".to_string()))?;
        Ok(f64::from_le_bytes(bytes))
    }
}

/// Opaque typed send/receive primitive. `ChannelTransport` is the only
/// implementation shipped; a networked transport is a caller concern.
pub trait Transport: Send {
    fn send_batch(&mut self, messages: Vec<Message>) -> Result<(), GaulError>;
    fn recv_batch(&mut self) -> Result<Vec<Message>, GaulError>;
}

/// An in-process, two-ended migration channel, for single-process
/// archipelagos and for tests.
pub struct ChannelTransport {
    tx: Sender<Vec<Message>>,
    rx: Receiver<Vec<Message>>,
}

impl ChannelTransport {
    /// Build a connected pair: messages sent on `a` arrive on `b`'s receive
    /// end and vice versa.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = channel();
        let (tx_b, rx_a) = channel();
        (ChannelTransport { tx: tx_a, rx: rx_a }, ChannelTransport { tx: tx_b, rx: rx_b })
    }
}

impl Transport for ChannelTransport {
    fn send_batch(&mut self, messages: Vec<Message>) -> Result<(), GaulError> {
        self.tx.send(messages).map_err(|_| GaulError::TransportFailure("migration channel closed".to_string()))
    }
    fn recv_batch(&mut self) -> Result<Vec<Message>, GaulError> {
        self.rx.recv().map_err(|_| GaulError::TransportFailure("migration channel closed".to_string()))
    }
}

fn expect_tag(message: &Message, tag: Tag) -> Result<(), GaulError> {
    if message.tag != tag {
        return Err(GaulError::TransportFailure(format!("expected {tag:?}, got {:?}", message.tag)));
    }
    Ok(())
}

/// Encode a batch of emigrants as `NUMENTITIES`, `ENTITYLEN`, then per-entity
/// `ENTITYFITNESS`/`ENTITYCHROMOSOME` pairs. All entities in a batch share
/// the same serialized length, per the wire protocol.
pub fn encode_emigrants<O: Operators>(ops: &O, meta: &PopulationMeta, emigrants: &[(f64, Vec<O::Chromosome>)]) -> Vec<Message> {
    let encoded: Vec<Vec<u8>> = emigrants.iter().map(|(_, chromosomes)| wire::encode_chromosomes(ops, meta, chromosomes)).collect();
    let len = encoded.first().map(Vec::len).unwrap_or(0);

    let mut messages = Vec::with_capacity(2 + emigrants.len() * 2);
    messages.push(Message::int(Tag::NumEntities, emigrants.len() as i64));
    messages.push(Message::int(Tag::EntityLen, len as i64));
    for ((fitness, _), bytes) in emigrants.iter().zip(encoded) {
        messages.push(Message::float(Tag::EntityFitness, *fitness));
        messages.push(Message::bytes(Tag::EntityChromosome, bytes));
    }
    messages
}

/// Inverse of [`encode_emigrants`].
pub fn decode_immigrants<O: Operators>(
    ops: &O,
    meta: &PopulationMeta,
    messages: &[Message],
) -> Result<Vec<(f64, Vec<O::Chromosome>)>, GaulError> {
    let mut iter = messages.iter();
    let count_msg = iter.next().ok_or_else(|| GaulError::TransportFailure("missing NUMENTITIES".to_string()))?;
    expect_tag(count_msg, Tag::NumEntities)?;
    let count = count_msg.as_i64()? as usize;

    let len_msg = iter.next().ok_or_else(|| GaulError::TransportFailure("missing ENTITYLEN".to_string()))?;
    expect_tag(len_msg, Tag::EntityLen)?;
    let expected_len = len_msg.as_i64()? as usize;

    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let fitness_msg = iter.next().ok_or_else(|| GaulError::TransportFailure("missing ENTITYFITNESS".to_string()))?;
        expect_tag(fitness_msg, Tag::EntityFitness)?;
        let chromosome_msg = iter.next().ok_or_else(|| GaulError::TransportFailure("missing ENTITYCHROMOSOME".to_string()))?;
        expect_tag(chromosome_msg, Tag::EntityChromosome)?;
        if chromosome_msg.payload.len() != expected_len {
            return Err(GaulError::TransportFailure("entity chromosome length mismatch".to_string()));
        }
        let chromosomes = wire::decode_chromosomes(ops, meta, &chromosome_msg.payload)?;
        out.push((fitness_msg.as_f64()?, chromosomes));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;

    #[test]
    fn emigrant_batch_round_trips_through_a_channel_pair() {
        let ops = IntVectorOperators::new(3, 0, 10, |g| g.iter().sum::<i64>() as f64);
        let meta = PopulationMeta { num_chromosomes: 1, len_chromosomes: 3, generation: 0, island: 0 };
        let emigrants = vec![(12.0, vec![vec![1i64, 2, 3]]), (9.0, vec![vec![4i64, 5, 6]])];

        let (mut sender, mut receiver) = ChannelTransport::pair();
        sender.send_batch(encode_emigrants(&ops, &meta, &emigrants)).unwrap();
        let received = receiver.recv_batch().unwrap();
        let decoded = decode_immigrants(&ops, &meta, &received).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].0, 12.0);
        assert_eq!(decoded[0].1, vec![vec![1i64, 2, 3]]);
        assert_eq!(decoded[1].1, vec![vec![4i64, 5, 6]]);
    }

    #[test]
    fn missing_trailer_message_is_a_transport_failure() {
        let ops = IntVectorOperators::new(3, 0, 10, |g| g.iter().sum::<i64>() as f64);
        let meta = PopulationMeta { num_chromosomes: 1, len_chromosomes: 3, generation: 0, island: 0 };
        let truncated = vec![Message::int(Tag::NumEntities, 1)];
        assert!(decode_immigrants(&ops, &meta, &truncated).is_err());
    }
}
