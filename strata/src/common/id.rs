use rand::Rng;

use super::{COLLECTION_ID_PREFIX, ID_ALPHABET, ID_LENGTH};

/// Generates a random lowercase alphanumeric id of `ID_LENGTH` characters.
pub fn new_record_id() -> String {
    random_string(ID_LENGTH)
}

/// Generates a collection id, `pbc_` followed by ten digits.
pub fn new_collection_id() -> String {
    let mut rng = rand::thread_rng();
    let digits: u64 = rng.gen_range(1_000_000_000..10_000_000_000);
    format!("{}{}", COLLECTION_ID_PREFIX, digits)
}

pub(crate) fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
