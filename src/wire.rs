//! Shared chromosome (de)serialization helpers used by both the snapshot
//! writer/reader and the migration transport.
//!
//! Both wire formats describe a single byte buffer per entity, produced by
//! `chromosome_to_bytes`. With exactly one chromosome slot — every scenario
//! this engine ships — that buffer is exactly the raw `chromosome_to_bytes`
//! output, matching the snapshot format's single length-prefixed buffer per
//! entity. When a population declares more than one chromosome slot, each
//! chromosome's extent within the buffer is additionally recorded with a
//! 32-bit length prefix so the buffer can be split again on the way in.
use crate::error::GaulError;
use crate::operators::{Operators, PopulationMeta};

pub fn encode_chromosomes<O: Operators>(ops: &O, meta: &PopulationMeta, chromosomes: &[O::Chromosome]) -> Vec<u8> {
    if chromosomes.len() == 1 {
        let mut buf = Vec::new();
        ops.chromosome_to_bytes(meta, 0, &chromosomes[0], &mut buf);
        return buf;
    }

    let parts: Vec<Vec<u8>> = chromosomes
        .iter()
        .enumerate()
        .map(|(i, chromosome)| {
            let mut part = Vec::new();
            ops.chromosome_to_bytes(meta, i, chromosome, &mut part);
            part
        })
        .collect();

    let mut buf = Vec::new();
    for part in &parts {
        buf.extend_from_slice(&(part.len() as u32).to_le_bytes());
    }
    for part in parts {
        buf.extend(part);
    }
    buf
}

pub fn decode_chromosomes<O: Operators>(ops: &O, meta: &PopulationMeta, buf: &[u8]) -> Result<Vec<O::Chromosome>, GaulError> {
    let num_chromosomes = meta.num_chromosomes;
    if num_chromosomes == 1 {
        return Ok(vec![ops.chromosome_from_bytes(meta, 0, buf)?]);
    }

    let prefix_bytes = num_chromosomes * 4;
    if buf.len() < prefix_bytes {
        return Err(GaulError::SnapshotCorruption("buffer too short for chromosome length prefixes".to_string()));
    }
    let lens: Vec<usize> = (0..num_chromosomes)
        .map(|i| {
            let start = i * 4;
            u32::from_le_bytes(buf[start..start + 4].try_into().unwrap()) as usize
        })
        .collect();

    let mut offset = prefix_bytes;
    let mut out = Vec::with_capacity(num_chromosomes);
    for (i, len) in lens.into_iter().enumerate() {
        let end = offset + len;
        let slice = buf
            .get(offset..end)
            .ok_or_else(|| GaulError::SnapshotCorruption("chromosome length prefix out of range".to_string()))?;
        out.push(ops.chromosome_from_bytes(meta, i, slice)?);
        offset = end;
    }
    Ok(out)
}
