use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use super::graph::ReferralGraph;

/// Breadth-first walk below `root`, one `children_of` call per layer.
/// Layer 0 is the root's direct referrals. Every node is visited at most
/// once, so a corrupted cycle cannot loop.
pub async fn downline_layers<G: ReferralGraph + ?Sized>(
    graph: &G,
    root: Uuid,
) -> anyhow::Result<Vec<Vec<Uuid>>> {
    let mut visited = HashSet::from([root]);
    let mut frontier = vec![root];
    let mut layers = Vec::new();

    loop {
        let next: Vec<Uuid> = graph
            .children_of(&frontier)
            .await?
            .into_iter()
            .filter(|id| visited.insert(*id))
            .collect();

        if next.is_empty() {
            break;
        }

        layers.push(next.clone());
        frontier = next;
    }

    Ok(layers)
}

/// All descendants of `root`, excluding `root` itself.
pub async fn all_downline_users<G: ReferralGraph + ?Sized>(
    graph: &G,
    root: Uuid,
) -> anyhow::Result<HashSet<Uuid>> {
    let layers = downline_layers(graph, root).await?;
    Ok(layers.into_iter().flatten().collect())
}

/// Number of levels below `root`; 0 for a user with no referrals.
pub async fn max_downline_depth<G: ReferralGraph + ?Sized>(
    graph: &G,
    root: Uuid,
) -> anyhow::Result<usize> {
    Ok(downline_layers(graph, root).await?.len())
}

pub async fn direct_referral_count<G: ReferralGraph + ?Sized>(
    graph: &G,
    user_id: Uuid,
) -> anyhow::Result<usize> {
    Ok(graph.children_of(&[user_id]).await?.len())
}

/// Size and shape of a user's team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub user_id: Uuid,
    pub direct_referrals: usize,
    pub team_size: usize,
    pub max_depth: usize,
}

/// One BFS for all three team figures.
pub async fn team_summary<G: ReferralGraph + ?Sized>(
    graph: &G,
    user_id: Uuid,
) -> anyhow::Result<TeamSummary> {
    let layers = downline_layers(graph, user_id).await?;

    Ok(TeamSummary {
        user_id,
        direct_referrals: layers.first().map_or(0, Vec::len),
        team_size: layers.iter().map(Vec::len).sum(),
        max_depth: layers.len(),
    })
}

/// Referrers above `start`, nearest first, at most `max_hops` of them.
/// Stops at a root or when a parent repeats.
pub async fn upline<G: ReferralGraph + ?Sized>(
    graph: &G,
    start: Uuid,
    max_hops: usize,
) -> anyhow::Result<Vec<Uuid>> {
    let mut visited = HashSet::from([start]);
    let mut chain = Vec::with_capacity(max_hops);
    let mut current = start;

    while chain.len() < max_hops {
        match graph.parent_of(current).await? {
            Some(parent) if visited.insert(parent) => {
                chain.push(parent);
                current = parent;
            }
            Some(parent) => {
                tracing::warn!(user_id = %start, repeated = %parent, "Referral cycle in upline walk");
                break;
            }
            None => break,
        }
    }

    Ok(chain)
}
