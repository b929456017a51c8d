//! Shortest-unique display names for projects.
//!
//! Given the canonical path of every project, each gets the shortest
//! trailing-segment suffix that is unique across the set. Depth starts at
//! one (the last segment) and grows only for projects that actually
//! collide; a project that runs out of segments keeps its full path and is
//! accepted even if still ambiguous.

use indexmap::IndexMap;
use tracing::trace;

use crate::identity::ProjectIdentity;

/// Compute a minimal unique display name per project id.
///
/// Output order follows input order. Where two projects share an identical
/// canonical path, both keep the full path as an accepted collision.
#[must_use]
pub fn disambiguate(projects: &[ProjectIdentity]) -> IndexMap<String, String> {
    let paths: Vec<(&str, Vec<&str>)> = projects
        .iter()
        .map(|p| {
            let segments: Vec<&str> = p
                .canonical_path
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            (p.id.as_str(), segments)
        })
        .collect();

    let mut depths: Vec<usize> = vec![1; paths.len()];
    let mut accepted: Vec<bool> = paths.iter().map(|(_, segs)| segs.is_empty()).collect();

    // Each round deepens every colliding project by exactly one segment, so
    // the maximum segment count bounds the number of rounds.
    let max_rounds = paths
        .iter()
        .map(|(_, segs)| segs.len())
        .max()
        .unwrap_or(0)
        .max(1);

    for round in 0..max_rounds {
        let names: Vec<String> = paths
            .iter()
            .zip(&depths)
            .map(|((_, segs), depth)| trailing_name(segs, *depth))
            .collect();

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for name in &names {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }

        let mut any_collision = false;
        for i in 0..paths.len() {
            if accepted[i] || counts[names[i].as_str()] == 1 {
                continue;
            }
            if depths[i] >= paths[i].1.len() {
                // Out of segments: keep the full path, accept the collision.
                accepted[i] = true;
            } else {
                depths[i] += 1;
                any_collision = true;
            }
        }

        if !any_collision {
            trace!(rounds = round + 1, "display names settled");
            break;
        }
    }

    paths
        .iter()
        .zip(&depths)
        .map(|((id, segs), depth)| ((*id).to_string(), trailing_name(segs, *depth)))
        .collect()
}

fn trailing_name(segments: &[&str], depth: usize) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let start = segments.len().saturating_sub(depth);
    segments[start..].join("/")
}
