//! Synthetic ground-truth generation
//!
//! Every record gets a random prefix of 1..=max_depth steps followed by a
//! terminal left step whose disambiguator is the record's index. Because no
//! two records share an index, paths stay pairwise distinct even when two
//! random prefixes collide exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::DatasetError;
use crate::path::{PositionPath, Step};
use crate::record::ChangeRecord;

/// Upper bound (inclusive) for random prefix disambiguators
pub const DISAMBIGUATOR_MAX: i64 = 1000;

const PAYLOAD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Generate `count` records with prefixes up to `max_depth` steps, sorted and
/// frozen into a [`Dataset`].
///
/// Fails fast on `count < 0` or `max_depth < 1`; nothing is generated then.
pub fn generate<R>(count: i64, max_depth: i64, rng: &mut R) -> Result<Dataset, DatasetError>
where
    R: Rng + ?Sized,
{
    if count < 0 {
        return Err(DatasetError::InvalidCount(count));
    }
    if max_depth < 1 {
        return Err(DatasetError::InvalidDepth(max_depth));
    }

    let mut records = Vec::new();
    reserve(&mut records, count, "records")?;
    for index in 0..count {
        let depth = rng.gen_range(1..=max_depth);
        let mut steps = Vec::new();
        reserve(&mut steps, depth.saturating_add(1), "path steps")?;
        for _ in 0..depth {
            // right with probability 1/3
            let direction = rng.gen_range(1..=3) == 2;
            let disambiguator = rng.gen_range(1..=DISAMBIGUATOR_MAX);
            steps.push(Step::new(direction, disambiguator));
        }
        steps.push(Step::left(index));

        let payload = PAYLOAD_ALPHABET[rng.gen_range(0..PAYLOAD_ALPHABET.len())] as char;
        records.push(ChangeRecord::new(PositionPath::new(steps)?, payload));
    }

    let dataset = Dataset::from_records(records);
    debug!(count = dataset.len(), max_depth, "Generated ground-truth dataset");
    Ok(dataset)
}

fn reserve<T>(buf: &mut Vec<T>, requested: i64, what: &'static str) -> Result<(), DatasetError> {
    let too_large = DatasetError::TooLarge { what, requested };
    let additional = usize::try_from(requested).map_err(|_| too_large.clone())?;
    buf.try_reserve(additional).map_err(|_| too_large)
}

/// Reproducible generation from a fixed seed
pub fn generate_seeded(count: i64, max_depth: i64, seed: u64) -> Result<Dataset, DatasetError> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(count, max_depth, &mut rng)
}
