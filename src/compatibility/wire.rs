//! Wire-compatible scalar type changes
//!
//! A single symmetric table keyed by unordered pairs. A change between two
//! kinds in the table keeps encoded data readable in both directions.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::graph::ScalarKind;

type Pair = (ScalarKind, ScalarKind);

fn unordered(a: ScalarKind, b: ScalarKind) -> Pair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn table() -> &'static HashSet<Pair> {
    static TABLE: OnceLock<HashSet<Pair>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use ScalarKind::*;

        let mut pairs = HashSet::new();

        // Varint family
        let varints = [Int32, Int64, Uint32, Uint64];
        for (i, a) in varints.iter().enumerate() {
            for b in &varints[i + 1..] {
                pairs.insert(unordered(*a, *b));
            }
        }

        // Zigzag family
        pairs.insert(unordered(Sint32, Sint64));

        // Fixed-width family
        pairs.insert(unordered(Fixed32, Fixed64));
        pairs.insert(unordered(Fixed32, Sfixed32));
        pairs.insert(unordered(Fixed64, Sfixed64));
        pairs.insert(unordered(Sfixed32, Sfixed64));

        // Length-delimited
        pairs.insert(unordered(String, Bytes));

        pairs
    })
}

/// Whether changing a field from `old` to `new` is silently safe.
///
/// Identity is not a change and is not in the table.
pub fn is_wire_compatible(old: ScalarKind, new: ScalarKind) -> bool {
    old != new && table().contains(&unordered(old, new))
}
