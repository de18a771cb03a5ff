use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Multiplier used when mixing structural hashes of expression nodes.
pub const MAGIC_HASH_CONSTANT: u64 = 39;

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Arithmetic wraps, so for very large arguments the result is only a hash,
/// not a bijection.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Mix one child hash into an accumulated node hash.
///
/// ```text
/// hash = (hash << 1) xor (child * MAGIC)
/// ```
pub fn hash_combine(hash: u64, child: u64) -> u64 {
    (hash << 1) ^ child.wrapping_mul(MAGIC_HASH_CONSTANT)
}

/// Hash of a string, stable for the lifetime of the process.
pub fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

pub trait MyHash {
    /// Hash used for bucket selection in tables and caches.
    fn hash(&self) -> u64;
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        pairing3(self.0, self.1, self.2)
    }
}
