use ahash::AHashMap as HashMap;
use gbp_policy_controller_core::{renderer::Renderer, NodeId, RendererName};
use std::collections::BTreeSet;

/// Maps infrastructure nodes to the renderer responsible for them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RendererTopology {
    by_node: HashMap<NodeId, RendererName>,
}

// === impl RendererTopology ===

impl RendererTopology {
    /// Builds the node ownership map from the renderers' declared nodes.
    ///
    /// When several renderers declare the same node, the first one in the collection owns it.
    pub fn new(renderers: &[Renderer]) -> Self {
        let mut by_node = HashMap::<NodeId, RendererName>::default();
        for renderer in renderers {
            for node in &renderer.renderer_nodes {
                match by_node.get(node) {
                    Some(owner) if *owner != renderer.name => {
                        tracing::debug!(
                            %node,
                            %owner,
                            renderer = %renderer.name,
                            "Node is already owned by another renderer"
                        );
                    }
                    Some(_) => {}
                    None => {
                        by_node.insert(node.clone(), renderer.name.clone());
                    }
                }
            }
        }
        Self { by_node }
    }

    pub fn renderer(&self, node: &NodeId) -> Option<&RendererName> {
        self.by_node.get(node)
    }

    /// Returns every renderer that owns at least one node, in name order.
    pub fn renderer_names(&self) -> BTreeSet<RendererName> {
        self.by_node.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}
