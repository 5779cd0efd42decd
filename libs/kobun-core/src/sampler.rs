//! Random question selection without repeats.

use rand::Rng;

/// Shuffle `items` in place with Fisher-Yates.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Draw `min(count, records.len())` distinct items in random order.
pub fn sample<T: Clone, R: Rng + ?Sized>(records: &[T], count: usize, rng: &mut R) -> Vec<T> {
    let mut picked = records.to_vec();
    shuffle(&mut picked, rng);
    picked.truncate(count);
    picked
}
