//! # Queue Topology
//!
//! Names and roles of every queue the pipeline touches. The three retry
//! tiers have no per-queue TTL; the tier delay is applied broker-side at
//! publish time (delayed send), so an enqueued envelope stays invisible
//! until its tier delay elapses and the DLX re-entry consumer picks it up.

/// Discovered-URL messages awaiting dedup/batch insert
pub const FRONTIER_QUEUE: &str = "frontier_queue";

/// URLs ready to be scraped
pub const WORK_QUEUE: &str = "work_queue";

/// Extracted records awaiting batch upsert
pub const RESULT_QUEUE: &str = "result_queue";

/// First retry tier (5 minute delay)
pub const RETRY_TIER_A: &str = "retry_tier_a";

/// Second retry tier (10 minute delay)
pub const RETRY_TIER_B: &str = "retry_tier_b";

/// Third retry tier (15 minute delay)
pub const RETRY_TIER_C: &str = "retry_tier_c";

/// Terminal sink for URLs that exhausted the ladder; durable, never
/// consumed by this subsystem, kept for operator inspection
pub const RETRY_TERMINAL: &str = "retry_terminal";

/// The three delay tiers, in escalation order
pub const RETRY_TIERS: [&str; 3] = [RETRY_TIER_A, RETRY_TIER_B, RETRY_TIER_C];

/// Every queue the pipeline declares at startup
pub const ALL_QUEUES: [&str; 7] = [
    FRONTIER_QUEUE,
    WORK_QUEUE,
    RESULT_QUEUE,
    RETRY_TIER_A,
    RETRY_TIER_B,
    RETRY_TIER_C,
    RETRY_TERMINAL,
];
