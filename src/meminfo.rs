use std::collections::HashMap;

use crate::error::Error;

/// One parsed snapshot of the kernel memory counters, in kibibytes.
/// Raw keys are copied verbatim from the source text; derived keys are
/// prefixed with `@` and computed from the raw ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSet {
    counters: HashMap<String, i64>,
}

impl CounterSet {
    /// Value for `name`, or `MissingCounter` if it is not in the set.
    pub fn get(&self, name: &str) -> Result<i64, Error> {
        self.counters
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingCounter(name.to_string()))
    }

}

struct DerivedCounter {
    name: &'static str,
    deps: &'static [&'static str],
    // Receives the dep values in `deps` order.
    formula: fn(&[i64]) -> i64,
}

/// Ordered so that every entry only depends on raw keys or on entries
/// above it (`@KernelSpace` uses `@UserSpace`).
const DERIVED: &[DerivedCounter] = &[
    DerivedCounter {
        name: "@MemNotAvailable",
        deps: &["MemTotal", "MemAvailable"],
        formula: |v| v[0] - v[1],
    },
    DerivedCounter {
        name: "@UserSpace",
        deps: &["AnonPages", "Buffers", "Cached"],
        formula: |v| v[0] + v[1] + v[2],
    },
    DerivedCounter {
        name: "@FileBacked",
        deps: &["Buffers", "Cached"],
        formula: |v| v[0] + v[1],
    },
    DerivedCounter {
        name: "@Anonymous",
        deps: &["Active(anon)", "Inactive(anon)"],
        formula: |v| v[0] + v[1],
    },
    DerivedCounter {
        name: "@KernelSpace",
        deps: &["MemTotal", "MemFree", "@UserSpace"],
        formula: |v| v[0] - v[1] - v[2],
    },
];

/// Parses meminfo text into a `CounterSet` and computes the derived keys.
///
/// Each non-empty line is `<Name>: <integer> [kB]`; only the first two
/// whitespace tokens matter (hugepage counts carry no unit token). A
/// duplicate name overwrites the earlier value.
pub fn parse(raw: &str) -> Result<CounterSet, Error> {
    let mut counters = HashMap::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (name, value) = match (tokens.next(), tokens.next()) {
            (Some(name), Some(value)) => (name, value),
            _ => {
                return Err(Error::MalformedLine {
                    line: line.to_string(),
                })
            }
        };
        let value: i64 = value.parse().map_err(|_| Error::MalformedLine {
            line: line.to_string(),
        })?;
        let name = name.strip_suffix(':').unwrap_or(name);
        counters.insert(name.to_string(), value);
    }

    let mut set = CounterSet { counters };
    for derived in DERIVED {
        let deps: Vec<i64> = derived
            .deps
            .iter()
            .map(|dep| set.get(dep))
            .collect::<Result<_, _>>()?;
        let value = (derived.formula)(&deps);
        set.counters.insert(derived.name.to_string(), value);
    }
    Ok(set)
}

#[cfg(test)]
pub(crate) const SAMPLE_MEMINFO: &str = "\
MemTotal:       32802752 kB
MemFree:        28315612 kB
MemAvailable:   29904600 kB
Buffers:          551604 kB
Cached:          1700912 kB
SwapCached:            0 kB
Active:          2798744 kB
Inactive:         827776 kB
Active(anon):    1673760 kB
Inactive(anon):   198480 kB
Active(file):    1124984 kB
Inactive(file):   629296 kB
Unevictable:      298124 kB
Mlocked:           13580 kB
SwapTotal:       2097148 kB
SwapFree:        2097148 kB
Dirty:                20 kB
Writeback:             0 kB
AnonPages:       1672132 kB
Mapped:           761996 kB
Shmem:            484688 kB
KReclaimable:     304840 kB
Slab:             366624 kB
SReclaimable:     304840 kB
SUnreclaim:        61784 kB
KernelStack:       14432 kB
PageTables:        46748 kB
NFS_Unstable:          0 kB
Bounce:                0 kB
WritebackTmp:          0 kB
CommitLimit:    18498524 kB
Committed_AS:    6405440 kB
VmallocTotal:   34359738367 kB
VmallocUsed:           0 kB
VmallocChunk:          0 kB
Percpu:             2624 kB
HardwareCorrupted:     0 kB
AnonHugePages:         0 kB
ShmemHugePages:        0 kB
ShmemPmdMapped:        0 kB
CmaTotal:              0 kB
CmaFree:               0 kB
HugePages_Total:       0
HugePages_Free:        0
HugePages_Rsvd:        0
HugePages_Surp:        0
Hugepagesize:       2048 kB
Hugetlb:               0 kB
DirectMap4k:      191348 kB
DirectMap2M:     8062976 kB
DirectMap1G:    25165824 kB
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values() {
        let set = parse(SAMPLE_MEMINFO).unwrap();
        assert_eq!(set.get("MemAvailable").unwrap(), 29904600);
        assert_eq!(set.get("SReclaimable").unwrap(), 304840);
        assert_eq!(set.get("Active(anon)").unwrap(), 1673760);
        // Hugepage counts have no kB token but parse the same way.
        assert_eq!(set.get("HugePages_Total").unwrap(), 0);
    }

    #[test]
    fn parse_is_deterministic() {
        let a = parse(SAMPLE_MEMINFO).unwrap();
        let b = parse(SAMPLE_MEMINFO).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_name_last_write_wins() {
        let set = parse(concat!(
            "MemTotal: 10 kB\n",
            "MemFree: 1 kB\n",
            "MemAvailable: 1 kB\n",
            "AnonPages: 1 kB\n",
            "Buffers: 1 kB\n",
            "Cached: 1 kB\n",
            "Active(anon): 1 kB\n",
            "Inactive(anon): 1 kB\n",
            "MemAvailable: 2 kB\n",
        ))
        .unwrap();
        assert_eq!(set.get("MemAvailable").unwrap(), 2);
    }

    #[test]
    fn derived_counters_follow_formulas() {
        let set = parse(SAMPLE_MEMINFO).unwrap();
        let get = |n| set.get(n).unwrap();
        assert_eq!(
            get("@UserSpace"),
            get("AnonPages") + get("Buffers") + get("Cached")
        );
        assert_eq!(get("@MemNotAvailable"), get("MemTotal") - get("MemAvailable"));
        assert_eq!(get("@FileBacked"), get("Buffers") + get("Cached"));
        assert_eq!(get("@Anonymous"), get("Active(anon)") + get("Inactive(anon)"));
        assert_eq!(
            get("@KernelSpace"),
            get("MemTotal") - get("MemFree") - get("@UserSpace")
        );
    }

    #[test]
    fn missing_dependency_is_an_error() {
        // No MemTotal, required by @MemNotAvailable.
        let err = parse("MemFree: 100 kB\n").unwrap_err();
        match err {
            Error::MissingCounter(name) => assert_eq!(name, "MemTotal"),
            other => panic!("expected MissingCounter, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_and_non_integer_lines() {
        assert!(matches!(
            parse("MemTotal:\n"),
            Err(Error::MalformedLine { .. })
        ));
        assert!(matches!(
            parse("MemTotal: lots kB\n"),
            Err(Error::MalformedLine { .. })
        ));
    }
}
