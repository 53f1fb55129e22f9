// First-hit correspondence between an old and a new snapshot

use crate::host::{Host, SeriesSummary};
use crate::regression::config::ProcessAliases;

/// First host in `hosts` whose kind equals `kind`
pub fn find_host<'a>(hosts: &'a [Host], kind: &str) -> Option<&'a Host> {
    hosts.iter().find(|h| h.kind == kind)
}

/// First summary on `host` that corresponds to `old`
///
/// Resource must match exactly. Kind matches either exactly or through
/// `aliases[old.kind]`. When a host carries the same `(kind, resource)`
/// twice, the earlier one wins.
pub fn find_summary<'a>(
    host: &'a Host,
    old: &SeriesSummary,
    aliases: &ProcessAliases,
) -> Option<&'a SeriesSummary> {
    let alias = aliases.get(&old.kind);
    host.summaries.iter().find(|candidate| {
        candidate.resource == old.resource
            && (candidate.kind == old.kind || Some(candidate.kind.as_str()) == alias)
    })
}
