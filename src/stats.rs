//! Lifetime and per-cycle counters. Purely observational: nothing in the
//! collector consults these to make decisions.

use std::fmt;

#[derive(Default)]
pub struct GcStatistics {
    pub total_allocated_bytes: usize,
    pub total_allocated_objects: usize,
    pub total_reads: usize,
    pub total_writes: usize,
    pub gc_cycles: usize,

    pub max_allocated_bytes: usize,
    pub max_allocated_objects: usize,

    cycle_allocated_bytes: usize,
    cycle_allocated_objects: usize,
}

impl GcStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_alloc(&mut self, size: usize) {
        self.total_allocated_bytes += size;
        self.total_allocated_objects += 1;
        self.cycle_allocated_bytes += size;
        self.cycle_allocated_objects += 1;
    }

    #[inline(always)]
    pub fn record_read(&mut self) {
        self.total_reads += 1;
    }

    #[inline(always)]
    pub fn record_write(&mut self) {
        self.total_writes += 1;
    }

    /// Increments the GC cycle count. Called from the collector itself at
    /// the point the full collection cycle completes.
    #[inline(always)]
    pub fn record_cycle(&mut self) {
        self.gc_cycles += 1;
    }

    /// Rolls the per-cycle accumulators into the residency high-water marks
    /// and resets them. Called from `alloc` right after a collection runs,
    /// not from the collector itself.
    pub fn roll_residency(&mut self) {
        self.max_allocated_bytes = self.max_allocated_bytes.max(self.cycle_allocated_bytes);
        self.max_allocated_objects = self.max_allocated_objects.max(self.cycle_allocated_objects);
        self.cycle_allocated_bytes = 0;
        self.cycle_allocated_objects = 0;
    }

    fn residency_bytes(&self) -> usize {
        self.max_allocated_bytes.max(self.cycle_allocated_bytes)
    }

    fn residency_objects(&self) -> usize {
        self.max_allocated_objects.max(self.cycle_allocated_objects)
    }
}

struct FormattedSize(usize);

impl fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kib = self.0 as f64 / 1024.0;
        if kib < 1.0 {
            return write!(f, "{}B", self.0);
        }
        let mib = kib / 1024.0;
        if mib < 1.0 {
            return write!(f, "{:.1}K", kib);
        }
        write!(f, "{:.1}M", mib)
    }
}

/// Renders the `print_gc_alloc_stats` report: lifetime totals, residency
/// high-water marks, and cycle count.
pub struct AllocStatsReport<'a>(pub &'a GcStatistics, pub &'a crate::roots::RootRegistry);

impl fmt::Display for AllocStatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        let roots = self.1;
        writeln!(
            f,
            "Total memory allocation: {} ({} objects)",
            FormattedSize(stats.total_allocated_bytes),
            stats.total_allocated_objects
        )?;
        writeln!(
            f,
            "Maximum residency:       {} ({} objects)",
            FormattedSize(stats.residency_bytes()),
            stats.residency_objects()
        )?;
        writeln!(
            f,
            "Total memory use:        {} reads and {} writes",
            stats.total_reads, stats.total_writes
        )?;
        writeln!(
            f,
            "Max GC roots stack size: {} roots",
            roots.high_water_mark()
        )?;
        write!(f, "GC cycles:               {} cycles", stats.gc_cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_residency_maxes_and_resets_accumulators() {
        let mut stats = GcStatistics::new();
        stats.record_alloc(24);
        stats.record_alloc(16);
        stats.record_cycle();
        stats.roll_residency();
        assert_eq!(stats.max_allocated_bytes, 40);
        assert_eq!(stats.max_allocated_objects, 2);
        assert_eq!(stats.gc_cycles, 1);

        stats.record_alloc(8);
        stats.record_cycle();
        stats.roll_residency();
        // second cycle allocated less than the high-water mark, so it stays.
        assert_eq!(stats.max_allocated_bytes, 40);
        assert_eq!(stats.gc_cycles, 2);
    }

    #[test]
    fn counters_never_decrease() {
        let mut stats = GcStatistics::new();
        stats.record_alloc(10);
        let before = stats.total_allocated_bytes;
        stats.record_cycle();
        stats.roll_residency();
        assert!(stats.total_allocated_bytes >= before);
    }
}
