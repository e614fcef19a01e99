//! Statistics collection and export for compilation runs.
//!
//! [`CacheStats`] is the path cache snapshot returned by the router;
//! [`CompileStats`] aggregates a whole compilation and exports to JSON,
//! CSV or a human-readable summary.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Path cache counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// hits + misses
    pub total: u64,
    /// Percentage of lookups served from the cache (0 when nothing was looked up)
    pub hit_rate: f64,
    /// Entries currently cached
    pub size: usize,
    pub capacity: usize,
    /// Entries dropped to make room
    pub evictions: u64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: usize, capacity: usize, evictions: u64) -> Self {
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            hits,
            misses,
            total,
            hit_rate,
            size,
            capacity,
            evictions,
        }
    }
}

/// Aggregate statistics for one compilation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompileStats {
    /// Graph size
    pub components: usize,
    pub connections: usize,

    /// Connections with a wire path
    pub routed: usize,

    /// Connections that could not be routed
    pub failed_routes: usize,

    /// Sum of routed path lengths in steps
    pub wire_length: usize,

    /// Delay elements written into the grid
    pub repeaters_placed: usize,

    pub safety_violations: usize,
    pub timing_violations: usize,

    /// Router cache snapshot at the end of the run
    pub cache: CacheStats,

    /// Wall-clock time in milliseconds
    pub wall_time_ms: f64,
}

impl CompileStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean path length over routed connections.
    pub fn average_wire_length(&self) -> f64 {
        if self.routed == 0 {
            0.0
        } else {
            self.wire_length as f64 / self.routed as f64
        }
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports statistics to CSV (`metric,value`).
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");

        csv.push_str(&format!("components,{}\n", self.components));
        csv.push_str(&format!("connections,{}\n", self.connections));
        csv.push_str(&format!("routed,{}\n", self.routed));
        csv.push_str(&format!("failed_routes,{}\n", self.failed_routes));
        csv.push_str(&format!("wire_length,{}\n", self.wire_length));
        csv.push_str(&format!("repeaters_placed,{}\n", self.repeaters_placed));
        csv.push_str(&format!("safety_violations,{}\n", self.safety_violations));
        csv.push_str(&format!("timing_violations,{}\n", self.timing_violations));

        csv.push_str(&format!("cache_hits,{}\n", self.cache.hits));
        csv.push_str(&format!("cache_misses,{}\n", self.cache.misses));
        csv.push_str(&format!("cache_hit_rate,{:.1}\n", self.cache.hit_rate));
        csv.push_str(&format!("cache_size,{}\n", self.cache.size));
        csv.push_str(&format!("cache_evictions,{}\n", self.cache.evictions));

        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.wall_time_ms));

        csv
    }

    /// Exports statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Compilation Statistics ===")?;
        writeln!(w)?;

        writeln!(w, "--- Graph ---")?;
        writeln!(w, "Components: {}", self.components)?;
        writeln!(w, "Connections: {}", self.connections)?;
        writeln!(w)?;

        writeln!(w, "--- Routing ---")?;
        writeln!(w, "Routed: {}", self.routed)?;
        writeln!(w, "Failed: {}", self.failed_routes)?;
        writeln!(
            w,
            "Wire length: {} (avg {:.1})",
            self.wire_length,
            self.average_wire_length()
        )?;
        writeln!(
            w,
            "Cache: {} hits, {} misses ({:.1}%), {}/{} entries, {} evicted",
            self.cache.hits,
            self.cache.misses,
            self.cache.hit_rate,
            self.cache.size,
            self.cache.capacity,
            self.cache.evictions
        )?;
        writeln!(w)?;

        writeln!(w, "--- Timing ---")?;
        writeln!(w, "Repeaters placed: {}", self.repeaters_placed)?;
        writeln!(w)?;

        writeln!(w, "--- Diagnostics ---")?;
        writeln!(w, "Safety violations: {}", self.safety_violations)?;
        writeln!(w, "Timing violations: {}", self.timing_violations)?;
        writeln!(w, "Wall time: {:.2} ms", self.wall_time_ms)?;

        Ok(())
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
