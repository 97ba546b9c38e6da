//! Durability mode for shard log writes.

/// When shard log writes reach stable storage.
///
/// | Mode | Guarantee |
/// |------|-----------|
/// | Standard | Written to the OS page cache after every write; may lose the tail on power loss |
/// | Always | fsync after every write; a returned write survives power loss |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Flush the file buffer after every write, fsync left to the OS.
    #[default]
    Standard,

    /// fsync after every write.
    Always,
}

impl DurabilityMode {
    /// Whether every write must be fsynced before it is acknowledged.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Always)
    }

    /// Parse the configuration spelling (`"standard"` / `"always"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(DurabilityMode::Standard),
            "always" => Some(DurabilityMode::Always),
            _ => None,
        }
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::Standard => "Flush per write (fast, may lose tail on power loss)",
            DurabilityMode::Always => "fsync per write (safest, slowest)",
        }
    }
}
