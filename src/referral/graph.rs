use std::collections::HashMap;
use std::future::Future;

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::user_repo;
use crate::models::{Role, UserEdge};

/// Read access to the referral tree. Only role = user nodes are visible:
/// admins are neither returned as children nor as parents.
pub trait ReferralGraph {
    /// Children of every id in `parents`, fetched together (one round trip per BFS layer).
    fn children_of(&self, parents: &[Uuid]) -> impl Future<Output = anyhow::Result<Vec<Uuid>>> + Send;

    /// The referrer of `user_id`, `None` at a tree root.
    fn parent_of(&self, user_id: Uuid) -> impl Future<Output = anyhow::Result<Option<Uuid>>> + Send;
}

impl ReferralGraph for PgPool {
    async fn children_of(&self, parents: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        Ok(user_repo::children_of(self, parents).await?)
    }

    async fn parent_of(&self, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        Ok(user_repo::parent_of(self, user_id).await?)
    }
}

/// The whole referral forest held in memory, loaded with one query.
/// Jobs that traverse from every user work off a snapshot instead of
/// issuing queries per node.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    users: Vec<Uuid>,
    parents: HashMap<Uuid, Uuid>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl GraphSnapshot {
    pub async fn load(db: impl PgExecutor<'_>) -> anyhow::Result<Self> {
        let edges = user_repo::load_edges(db).await?;
        Ok(Self::from_edges(&edges))
    }

    /// Build from parent edges. Child order follows edge order.
    pub fn from_edges(edges: &[UserEdge]) -> Self {
        let users: Vec<Uuid> = edges
            .iter()
            .filter(|e| e.role == Role::User)
            .map(|e| e.id)
            .collect();
        let is_user: std::collections::HashSet<Uuid> = users.iter().copied().collect();

        let mut parents = HashMap::new();
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        for edge in edges.iter().filter(|e| e.role == Role::User) {
            let Some(parent) = edge.referred_by else {
                continue;
            };
            if !is_user.contains(&parent) {
                continue;
            }
            parents.insert(edge.id, parent);
            children.entry(parent).or_default().push(edge.id);
        }

        Self {
            users,
            parents,
            children,
        }
    }

    /// Every role = user node, in load order.
    pub fn users(&self) -> &[Uuid] {
        &self.users
    }

    pub fn direct_referral_count(&self, user_id: Uuid) -> usize {
        self.children.get(&user_id).map_or(0, Vec::len)
    }

    pub fn parent(&self, user_id: Uuid) -> Option<Uuid> {
        self.parents.get(&user_id).copied()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl ReferralGraph for GraphSnapshot {
    async fn children_of(&self, parents: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        Ok(parents
            .iter()
            .filter_map(|p| self.children.get(p))
            .flatten()
            .copied()
            .collect())
    }

    async fn parent_of(&self, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        Ok(self.parent(user_id))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// `n` users in a straight line: ids[0] is the root, ids[i] refers ids[i + 1].
    pub fn chain(n: usize) -> (Vec<Uuid>, GraphSnapshot) {
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let edges: Vec<UserEdge> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| UserEdge {
                id,
                referred_by: if i == 0 { None } else { Some(ids[i - 1]) },
                role: Role::User,
            })
            .collect();
        (ids, GraphSnapshot::from_edges(&edges))
    }

    /// A root with `n` direct children.
    pub fn star(n: usize) -> (Uuid, Vec<Uuid>, GraphSnapshot) {
        let root = Uuid::new_v4();
        let kids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let mut edges = vec![UserEdge {
            id: root,
            referred_by: None,
            role: Role::User,
        }];
        edges.extend(kids.iter().map(|&id| UserEdge {
            id,
            referred_by: Some(root),
            role: Role::User,
        }));
        (root, kids, GraphSnapshot::from_edges(&edges))
    }
}
