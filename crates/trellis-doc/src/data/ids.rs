use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use super::document::NodeId;

const ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// How node identifiers are minted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// 12-character random identifiers; stable across edits of the stored tree.
    #[default]
    Random,
    /// `n` + 8 base-36 digits counting up from 1. Deterministic, used for tests
    /// and for the re-parse pass of the fallback guard.
    Sequential,
}

#[derive(Debug, Clone)]
pub struct IdGenerator {
    strategy: IdStrategy,
    counter: u64,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            counter: 1,
        }
    }

    pub fn next_id(&mut self) -> NodeId {
        match self.strategy {
            IdStrategy::Random => nanoid!(12, &ALPHABET),
            IdStrategy::Sequential => {
                let id = format!("n{}", encode_base36(self.counter));
                self.counter += 1;
                id
            }
        }
    }
}

fn encode_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [b'0'; 8];
    for ch in buf.iter_mut().rev() {
        *ch = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    buf.iter().map(|b| char::from(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sequential_ids_count_in_base36() {
        let mut ids = IdGenerator::new(IdStrategy::Sequential);
        assert_eq!(ids.next_id(), "n00000001");
        for _ in 0..8 {
            ids.next_id();
        }
        assert_eq!(ids.next_id(), "n0000000a");
        for _ in 0..25 {
            ids.next_id();
        }
        assert_eq!(ids.next_id(), "n00000010");
    }

    #[test]
    fn random_ids_are_unique_and_alphanumeric() {
        let mut ids = IdGenerator::new(IdStrategy::Random);
        let minted: HashSet<String> = (0..500).map(|_| ids.next_id()).collect();
        assert_eq!(minted.len(), 500);
        assert!(minted
            .iter()
            .all(|id| id.len() == 12 && id.chars().all(|c| c.is_ascii_alphanumeric())));
    }
}
