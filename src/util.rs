use std::hash::Hash;
use std::collections::HashSet;

use rand::{
    distributions::Alphanumeric,
    thread_rng,
    Rng,
};

pub fn first_duplicate<'a, A>(iter: impl Iterator<Item=A>) -> Option<A>
where A: Eq + Hash {
    let mut set = HashSet::<A>::new();
    for a in iter {
        let old = set.replace(a);
        if let Some(old) = old {
            return Some(old);
        }
    }
    None
}

/// Record id with a kind prefix, e.g. `vote_x7K9q2mNfA`.
pub fn new_id(prefix: &str) -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .collect();
    format!("{}_{}", prefix, suffix)
}
