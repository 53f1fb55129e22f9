// Cross-run p95 comparison
//
// Two snapshots are collected independently, so host sets, process names and
// result ordering can all differ between them. Matching is a plain
// first-hit linear scan: host by kind, then series by resource plus kind
// (or the kind's historical alias). Every matched pair whose new p95 leaves
// the relative band around the old p95 becomes a Finding; every old host or
// series without a counterpart becomes a mismatch warning.

mod config;
mod matching;
mod verdict;

pub use config::{ComparisonConfig, ProcessAliases, DEFAULT_TOLERANCE};
pub use matching::{find_host, find_summary};
pub use verdict::{compare, out_of_band, ComparisonReport, Finding};
