use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use super::layout::SplitKind;

/// Default share of images assigned to the training split.
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// An image found under a class folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub class_id: usize,
    pub class_name: String,
}

/// A train/validation partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split<T = ImageRecord> {
    pub train: Vec<T>,
    pub val: Vec<T>,
}

impl<T> Split<T> {
    pub fn get(&self, kind: SplitKind) -> &[T] {
        match kind {
            SplitKind::Train => &self.train,
            SplitKind::Val => &self.val,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.val.len()
    }
}

/// Number of training items: `floor(total * train_ratio)`, capped at `total`.
pub fn train_count(total: usize, train_ratio: f64) -> usize {
    let raw = (total as f64 * train_ratio).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(total)
    }
}

/// Shuffle in place. With `seed` the order is reproducible; without, it uses
/// the thread-local generator.
pub fn shuffle_records<T>(records: &mut [T], seed: Option<u64>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        records.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        records.shuffle(&mut rng);
    }
}

/// Shuffle all records, then cut at [`train_count`]. The first part is the
/// training split and the remainder the validation split.
pub fn split_records<T>(mut records: Vec<T>, train_ratio: f64, seed: Option<u64>) -> Split<T> {
    shuffle_records(&mut records, seed);
    let cut = train_count(records.len(), train_ratio);
    let val = records.split_off(cut);
    Split {
        train: records,
        val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_count_floors() {
        assert_eq!(train_count(10, 0.8), 8);
        assert_eq!(train_count(9, 0.8), 7);
        assert_eq!(train_count(1, 0.8), 0);
        assert_eq!(train_count(0, 0.8), 0);
        assert_eq!(train_count(5, 1.0), 5);
        assert_eq!(train_count(5, 0.0), 0);
    }

    #[test]
    fn split_is_a_partition() {
        let items: Vec<u32> = (0..23).collect();
        let split = split_records(items, 0.8, None);

        assert_eq!(split.train.len(), 18);
        assert_eq!(split.val.len(), 5);

        let mut all: Vec<u32> = split.train.iter().chain(&split.val).copied().collect();
        all.sort();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_split_is_deterministic() {
        let a = split_records((0..50).collect::<Vec<u32>>(), 0.8, Some(7));
        let b = split_records((0..50).collect::<Vec<u32>>(), 0.8, Some(7));
        assert_eq!(a, b);
    }
}
