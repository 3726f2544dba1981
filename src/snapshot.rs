//! Binary population/entity snapshot I/O (§6). Host byte order throughout;
//! corruption (bad magic, short buffer, missing trailer) is always a
//! [`GaulError::SnapshotCorruption`], never a panic.
use crate::entity::Entity;
use crate::error::GaulError;
use crate::operators::Operators;
use crate::population::Population;
use crate::scheme::{Elitism, Scheme};
use crate::wire;

const POPULATION_MAGIC_V2: &[u8] = b"FORMAT: GAUL POPULATION 002";
const POPULATION_MAGIC_V1: &[u8] = b"FORMAT: GAUL POPULATION 001";
const ENTITY_MAGIC: &[u8] = b"FORMAT: GAUL ENTITY 001";
const TRAILER: &[u8] = b"END\0";
const VERSION_BLOCK_LEN: usize = 64;
const FUNCTION_TABLE_LEN: usize = 18;

fn version_block() -> [u8; VERSION_BLOCK_LEN] {
    let info = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let mut block = [0u8; VERSION_BLOCK_LEN];
    let bytes = info.as_bytes();
    let n = bytes.len().min(VERSION_BLOCK_LEN);
    block[..n].copy_from_slice(&bytes[..n]);
    block
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], GaulError> {
        let end = self.pos + n;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| GaulError::SnapshotCorruption(format!("expected {n} more bytes at offset {}", self.pos)))?;
        self.pos = end;
        Ok(slice)
    }

    fn i32(&mut self) -> Result<i32, GaulError> {
        Ok(i32::from_ne_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, GaulError> {
        Ok(f64::from_ne_bytes(self.take(8)?.try_into().unwrap()))
    }
}

/// Serialise `population` as described in §6: magic, version block,
/// structural fields, rates, scheme/elitism/island, function lookup table,
/// per-entity fitness+chromosome bytes in rank order, trailer.
pub fn write_population<O: Operators>(ops: &O, population: &Population<O>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(POPULATION_MAGIC_V2);
    out.extend_from_slice(&version_block());
    out.extend_from_slice(&(population.size() as i32).to_ne_bytes());
    out.extend_from_slice(&(population.stable_size() as i32).to_ne_bytes());
    out.extend_from_slice(&(population.num_chromosomes() as i32).to_ne_bytes());
    out.extend_from_slice(&(population.len_chromosomes() as i32).to_ne_bytes());

    let rates = population.rates();
    out.extend_from_slice(&rates.crossover.to_ne_bytes());
    out.extend_from_slice(&rates.mutation.to_ne_bytes());
    out.extend_from_slice(&rates.migration.to_ne_bytes());

    out.extend_from_slice(&population.scheme.builtin_id().to_ne_bytes());
    out.extend_from_slice(&population.elitism.builtin_id().to_ne_bytes());
    out.extend_from_slice(&population.island.to_ne_bytes());

    // Every slot in this engine is bundled into one `Operators` value rather
    // than independently swappable like the source format's per-callback
    // table, so all 18 entries carry the same id.
    let slot_id = ops.builtin_id().unwrap_or(-1);
    for _ in 0..FUNCTION_TABLE_LEN {
        out.extend_from_slice(&slot_id.to_ne_bytes());
    }

    let meta = population.meta();
    for &id in population.ranked_ids() {
        let entity = population.entity(id).expect("ranked id must be live");
        out.extend_from_slice(&entity.fitness.to_ne_bytes());
        let bytes = wire::encode_chromosomes(ops, &meta, &entity.chromosomes);
        out.extend_from_slice(&(bytes.len() as i32).to_ne_bytes());
        out.extend_from_slice(&bytes);
    }

    out.extend_from_slice(TRAILER);
    out
}

/// Inverse of [`write_population`]. Accepts both the "001" (no island field)
/// and "002" magic variants. `ops` must already be correctly configured for
/// the caller's chromosome representation; the function lookup table is
/// read but not used to reconstruct `O` (there is no dynamic dispatch to
/// recover a type from an id) — a mismatch between the recorded id and
/// `ops.builtin_id()` is logged, not treated as corruption, since replaying
/// a snapshot under deliberately different operators is a legitimate use.
pub fn read_population<O: Operators>(ops: &O, buf: &[u8]) -> Result<Population<O>, GaulError> {
    let mut r = Reader::new(buf);
    let magic = r.take(POPULATION_MAGIC_V2.len())?;
    let has_island = if magic == POPULATION_MAGIC_V2 {
        true
    } else if magic == POPULATION_MAGIC_V1 {
        false
    } else {
        return Err(GaulError::SnapshotCorruption("bad population magic".to_string()));
    };

    r.take(VERSION_BLOCK_LEN)?;

    let size = r.i32()? as usize;
    let stable_size = r.i32()? as usize;
    let num_chromosomes = r.i32()? as usize;
    let len_chromosomes = r.i32()? as usize;

    let crossover = r.f64()?;
    let mutation = r.f64()?;
    let migration = r.f64()?;

    let scheme_id = r.i32()?;
    let elitism_id = r.i32()?;
    let island = if has_island { r.i32()? } else { -1 };

    let mut recorded_slot_id = None;
    for _ in 0..FUNCTION_TABLE_LEN {
        recorded_slot_id = Some(r.i32()?);
    }
    if let Some(recorded) = recorded_slot_id {
        match crate::registry::builtin_operator_name(recorded) {
            Some(name) => {
                if Some(recorded) != ops.builtin_id() {
                    log::warn!("snapshot function table names \"{name}\" (id {recorded}), which does not match the provided operator set's id {:?}", ops.builtin_id());
                }
            }
            None if recorded != 0 && recorded != -1 => {
                log::warn!("snapshot function table id {recorded} is not a registered built-in operator; treating as external, caller must re-bind");
            }
            None => {}
        }
    }

    let mut population = Population::new(stable_size, num_chromosomes, len_chromosomes);
    population.set_rates(crossover, mutation, migration);
    population.scheme = Scheme::from_builtin_id(scheme_id)
        .ok_or_else(|| GaulError::SnapshotCorruption(format!("unknown scheme id {scheme_id}")))?;
    population.elitism = Elitism::from_builtin_id(elitism_id);
    population.island = island;

    let meta = population.meta();
    for _ in 0..size {
        let fitness = r.f64()?;
        let len = r.i32()? as usize;
        let bytes = r.take(len)?;
        let chromosomes = wire::decode_chromosomes(ops, &meta, bytes)?;
        let id = population.insert_entity(chromosomes);
        if let Some(entity) = population.entity_mut(id) {
            entity.fitness = fitness;
        }
    }

    let trailer = r.take(TRAILER.len())?;
    if trailer != TRAILER {
        return Err(GaulError::SnapshotCorruption("missing trailer".to_string()));
    }

    Ok(population)
}

/// Serialise a single entity: magic, version block, fitness, chromosome
/// bytes, trailer. No population configuration is recorded; the caller
/// supplies `meta` on read.
pub fn write_entity<O: Operators>(ops: &O, meta: &crate::operators::PopulationMeta, entity: &Entity<O>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(ENTITY_MAGIC);
    out.extend_from_slice(&version_block());
    out.extend_from_slice(&entity.fitness.to_ne_bytes());
    let bytes = wire::encode_chromosomes(ops, meta, &entity.chromosomes);
    out.extend_from_slice(&(bytes.len() as i32).to_ne_bytes());
    out.extend_from_slice(&bytes);
    out.extend_from_slice(TRAILER);
    out
}

/// Inverse of [`write_entity`]. The returned entity's id is not meaningful
/// (no guarantee of stable entity identifiers across a save/restore cycle);
/// callers that need one must insert the chromosomes into a population.
pub fn read_entity<O: Operators>(ops: &O, meta: &crate::operators::PopulationMeta, buf: &[u8]) -> Result<Entity<O>, GaulError> {
    let mut r = Reader::new(buf);
    let magic = r.take(ENTITY_MAGIC.len())?;
    if magic != ENTITY_MAGIC {
        return Err(GaulError::SnapshotCorruption("bad entity magic".to_string()));
    }
    r.take(VERSION_BLOCK_LEN)?;
    let fitness = r.f64()?;
    let len = r.i32()? as usize;
    let bytes = r.take(len)?;
    let chromosomes = wire::decode_chromosomes(ops, meta, bytes)?;
    let trailer = r.take(TRAILER.len())?;
    if trailer != TRAILER {
        return Err(GaulError::SnapshotCorruption("missing trailer".to_string()));
    }
    let mut entity = Entity::new(0, chromosomes);
    entity.fitness = fitness;
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;
    use rand::SeedableRng;

    fn seeded_population() -> (Population<IntVectorOperators>, IntVectorOperators) {
        let mut ops = IntVectorOperators::new(5, 0, 50, |g| g.iter().sum::<i64>() as f64);
        let mut population = Population::new(6, 1, 5);
        let mut rng = rand::rngs::SmallRng::seed_from_u64(11);
        population.seed(&mut ops, &mut rng).unwrap();
        population.evaluate_unscored(&mut ops);
        population.sort();
        (population, ops)
    }

    #[test]
    fn population_round_trips_through_write_and_read() {
        let (population, ops) = seeded_population();
        let bytes = write_population(&ops, &population);
        let restored = read_population(&ops, &bytes).unwrap();

        assert_eq!(restored.size(), population.size());
        assert_eq!(restored.stable_size(), population.stable_size());
        assert_eq!(restored.scheme, population.scheme);
        assert_eq!(restored.elitism, population.elitism);
        assert_eq!(restored.island, population.island);

        let original_fitnesses: Vec<f64> = population.ranked_ids().iter().map(|&id| population.entity(id).unwrap().fitness).collect();
        let restored_fitnesses: Vec<f64> = restored.ranked_ids().iter().map(|&id| restored.entity(id).unwrap().fitness).collect();
        assert_eq!(original_fitnesses, restored_fitnesses);
    }

    #[test]
    fn v1_magic_is_accepted_with_island_defaulted() {
        // Hand-build a "001" buffer (no island field) by re-framing a "002"
        // buffer the writer produced, since the writer itself always emits
        // the current "002" format.
        let (population, ops) = seeded_population();
        let v2 = write_population(&ops, &population);
        let island_offset = POPULATION_MAGIC_V2.len() + VERSION_BLOCK_LEN + 4 * 4 + 8 * 3 + 4 * 2;
        let mut v1 = Vec::new();
        v1.extend_from_slice(POPULATION_MAGIC_V1);
        v1.extend_from_slice(&v2[POPULATION_MAGIC_V2.len()..island_offset]);
        v1.extend_from_slice(&v2[island_offset + 4..]);

        let restored = read_population(&ops, &v1).unwrap();
        assert_eq!(restored.island, -1);
        assert_eq!(restored.size(), population.size());
    }

    #[test]
    fn truncated_buffer_is_snapshot_corruption() {
        let (population, ops) = seeded_population();
        let bytes = write_population(&ops, &population);
        let truncated = &bytes[..bytes.len() - 10];
        assert!(read_population(&ops, truncated).is_err());
    }

    #[test]
    fn missing_trailer_is_snapshot_corruption() {
        let (population, ops) = seeded_population();
        let mut bytes = write_population(&ops, &population);
        let last = bytes.len() - 1;
        bytes[last] = b'X';
        assert!(read_population(&ops, &bytes).is_err());
    }

    #[test]
    fn entity_round_trips_through_write_and_read() {
        let (population, ops) = seeded_population();
        let meta = population.meta();
        let id = population.head().unwrap().id();
        let entity = population.entity(id).unwrap();
        let bytes = write_entity(&ops, &meta, entity);
        let restored = read_entity(&ops, &meta, &bytes).unwrap();
        assert_eq!(restored.fitness, entity.fitness);
        assert_eq!(restored.chromosomes, entity.chromosomes);
    }
}
