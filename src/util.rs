const KIB_PER_GIB: f64 = 1024.0 * 1024.0;

pub fn kb_to_gib(kb: i64) -> f64 {
    kb as f64 / KIB_PER_GIB
}

// Format function: counter values are kibibytes
pub fn format_kb(kb: i64) -> String {
    const MIB: f64 = 1024.0;
    let kb_f = kb as f64;
    if kb_f.abs() >= KIB_PER_GIB {
        format!("{:.2} GiB", kb_f / KIB_PER_GIB)
    } else if kb_f.abs() >= MIB {
        format!("{:.1} MiB", kb_f / MIB)
    } else {
        format!("{} kB", kb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_a_readable_unit() {
        assert_eq!(format_kb(512), "512 kB");
        assert_eq!(format_kb(2048), "2.0 MiB");
        assert_eq!(format_kb(3 * 1024 * 1024), "3.00 GiB");
        assert_eq!(format_kb(-2048), "-2.0 MiB");
    }

    #[test]
    fn gib_conversion() {
        assert_eq!(kb_to_gib(1024 * 1024), 1.0);
    }
}
