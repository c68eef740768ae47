//! Property-based tests for the string interner.

use proptest::prelude::*;
use tl_tree::StringTable;

proptest! {
    /// resolve(intern(s)) == s, and intern is idempotent.
    #[test]
    fn intern_resolve_roundtrip(strings in proptest::collection::vec("\\PC{0,32}", 0..32)) {
        let mut table = StringTable::new();
        let ids: Vec<_> = strings.iter().map(|s| table.intern(s)).collect();

        for (s, &id) in strings.iter().zip(&ids) {
            prop_assert_eq!(table.resolve(id), s.as_str());
            prop_assert_eq!(table.intern(s), id);
            prop_assert_eq!(table.find(s), Some(id));
        }
    }

    /// Distinct strings get distinct ids; the table size matches the number
    /// of distinct inputs.
    #[test]
    fn ids_are_injective(strings in proptest::collection::vec("\\PC{0,16}", 0..32)) {
        use std::collections::{HashMap, HashSet};

        let mut table = StringTable::new();
        let mut seen: HashMap<String, _> = HashMap::new();
        for s in &strings {
            let id = table.intern(s);
            if let Some(&prev) = seen.get(s) {
                prop_assert_eq!(id, prev);
            }
            seen.insert(s.clone(), id);
        }

        let distinct: HashSet<&String> = strings.iter().collect();
        prop_assert_eq!(table.len(), distinct.len());
    }
}
