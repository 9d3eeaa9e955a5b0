use super::access_key::PrivateRef;
use super::node::PrivateNode;
use super::FsError;
use crate::forest::PrivateForest;
use crate::store::BlockStore;

/// A directory entry: either a pointer to a stored revision, or a node
/// already held in memory.
#[derive(Debug, Clone)]
pub enum PrivateLink {
    Stored(PrivateRef),
    Loaded(PrivateNode),
}

impl PrivateLink {
    /// The node behind this link, loading it if necessary
    pub(crate) async fn resolve_node<S: BlockStore>(
        &self,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<PrivateNode, FsError> {
        match self {
            PrivateLink::Stored(private_ref) => {
                PrivateNode::from_private_ref(private_ref, forest, store).await
            }
            PrivateLink::Loaded(node) => Ok(node.clone()),
        }
    }

    /// The node behind this link, loading it in place if necessary
    pub(crate) async fn resolve_node_mut<S: BlockStore>(
        &mut self,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<&mut PrivateNode, FsError> {
        if let PrivateLink::Stored(private_ref) = self {
            let node = PrivateNode::from_private_ref(private_ref, forest, store).await?;
            *self = PrivateLink::Loaded(node);
        }
        match self {
            PrivateLink::Loaded(node) => Ok(node),
            PrivateLink::Stored(_) => unreachable!("link was resolved above"),
        }
    }

    pub(crate) async fn store<S: BlockStore>(
        &mut self,
        forest: &mut PrivateForest,
        store: &S,
    ) -> Result<PrivateRef, FsError> {
        match self {
            PrivateLink::Stored(private_ref) => Ok(private_ref.clone()),
            PrivateLink::Loaded(node) => node.store(forest, store).await,
        }
    }
}
