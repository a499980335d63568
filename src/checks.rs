use crate::error::Error;
use crate::meminfo::CounterSet;

/// One accounting identity: the sum over `lhs` should equal the sum over
/// `rhs`. Kernel accounting legitimately drifts by small amounts under
/// concurrent memory pressure, so a nonzero difference is reported, never
/// treated as fatal.
struct Identity {
    label: &'static str,
    lhs: &'static [&'static str],
    rhs: &'static [&'static str],
}

const IDENTITIES: &[Identity] = &[
    Identity {
        label: "MemAvailable vs MemFree+Inactive(file)+SReclaimable",
        lhs: &["MemAvailable"],
        rhs: &["MemFree", "Inactive(file)", "SReclaimable"],
    },
    Identity {
        label: "Active vs Active(file)+Active(anon)",
        lhs: &["Active"],
        rhs: &["Active(file)", "Active(anon)"],
    },
    Identity {
        label: "Inactive vs Inactive(file)+Inactive(anon)",
        lhs: &["Inactive"],
        rhs: &["Inactive(file)", "Inactive(anon)"],
    },
    Identity {
        label: "Buffers+Cached vs Active(file)+Inactive(file)+Shmem",
        lhs: &["Buffers", "Cached"],
        rhs: &["Active(file)", "Inactive(file)", "Shmem"],
    },
    Identity {
        label: "Active(anon)+Inactive(anon) vs Shmem+AnonPages",
        lhs: &["Active(anon)", "Inactive(anon)"],
        rhs: &["Shmem", "AnonPages"],
    },
    Identity {
        label: "AnonPages+Buffers+Cached vs lru lists+Unevictable",
        lhs: &["AnonPages", "Buffers", "Cached"],
        rhs: &[
            "Active(file)",
            "Inactive(file)",
            "Unevictable",
            "Active(anon)",
            "Inactive(anon)",
        ],
    },
    Identity {
        label: "Slab vs SReclaimable+SUnreclaim",
        lhs: &["Slab"],
        rhs: &["SReclaimable", "SUnreclaim"],
    },
    Identity {
        label: "MemTotal vs sum of accounted parts",
        lhs: &["MemTotal"],
        rhs: &[
            "MemFree",
            "Active(file)",
            "Inactive(file)",
            "Unevictable",
            "Active(anon)",
            "Inactive(anon)",
            "SReclaimable",
            "SUnreclaim",
            "KernelStack",
            "PageTables",
            "VmallocUsed",
        ],
    },
];

fn sum(set: &CounterSet, names: &[&str]) -> Result<i64, Error> {
    names.iter().try_fold(0i64, |acc, n| Ok(acc + set.get(n)?))
}

/// Recomputes every identity and returns `(label, lhs - rhs)` in kB.
pub fn check(set: &CounterSet) -> Result<Vec<(&'static str, i64)>, Error> {
    IDENTITIES
        .iter()
        .map(|id| Ok((id.label, sum(set, id.lhs)? - sum(set, id.rhs)?)))
        .collect()
}
