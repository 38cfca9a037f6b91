//! # Block Tree
//!
//! Runtime composition of block instances for one policy.
//!
//! Instances live in an arena and refer to each other by index: a child
//! records its parent index (navigation only) and a parent owns the ordered
//! list of its children. Since a child can only be attached to an instance
//! that already exists, the structure is a tree by construction.

use crate::domain::config::{BlockConfig, EventLink, PolicyConfig};
use crate::domain::registry::BlockRegistry;
use crate::error::{TreeError, TreeResult};
use serde_json::Value;
use shared_types::{BlockDescriptor, BlockId, BlockRef, Capabilities, PolicyId, TopicId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A block instance of a compiled policy.
#[derive(Debug, Clone)]
pub struct BlockInstance {
    pub id: BlockId,
    pub tag: String,
    pub block_type: String,
    pub policy_id: PolicyId,
    pub topic_id: Option<TopicId>,
    /// Raw options; typed per block type by the block implementation.
    pub options: Value,
    pub descriptor: Arc<BlockDescriptor>,
    pub events: Vec<EventLink>,
    index: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl BlockInstance {
    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            id: self.id.clone(),
            block_type: self.block_type.clone(),
            tag: self.tag.clone(),
            policy_id: self.policy_id.clone(),
            topic_id: self.topic_id.clone(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.descriptor.capabilities
    }

    /// Arena index of this instance.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Incrementally assembles a `BlockTree`, enforcing the structural rules.
pub struct BlockTreeBuilder<'r> {
    registry: &'r BlockRegistry,
    policy_id: PolicyId,
    topic_id: Option<TopicId>,
    instances: Vec<BlockInstance>,
    by_id: HashMap<BlockId, usize>,
    by_tag: HashMap<String, usize>,
    root: Option<usize>,
}

impl<'r> BlockTreeBuilder<'r> {
    pub fn new(registry: &'r BlockRegistry, policy_id: PolicyId, topic_id: Option<TopicId>) -> Self {
        Self {
            registry,
            policy_id,
            topic_id,
            instances: Vec::new(),
            by_id: HashMap::new(),
            by_tag: HashMap::new(),
            root: None,
        }
    }

    /// Add the root instance.
    pub fn root(&mut self, config: &BlockConfig) -> TreeResult<usize> {
        if self.root.is_some() {
            return Err(TreeError::RootAlreadySet);
        }
        let descriptor = self.registry.describe(&config.block_type)?;
        let index = self.insert(None, descriptor, config)?;
        self.root = Some(index);
        Ok(index)
    }

    /// Attach a new instance as the last child of `parent`.
    pub fn attach(&mut self, parent: usize, config: &BlockConfig) -> TreeResult<usize> {
        let parent_descriptor = self
            .instances
            .get(parent)
            .map(|instance| instance.descriptor.clone())
            .ok_or_else(|| TreeError::BlockNotFound(format!("#{parent}")))?;

        let descriptor = self.registry.describe(&config.block_type)?;
        if !parent_descriptor.allows_child(&config.block_type) {
            return Err(TreeError::ChildrenNotAllowed {
                parent_type: parent_descriptor.block_type.clone(),
                child_type: config.block_type.clone(),
            });
        }

        let index = self.insert(Some(parent), descriptor, config)?;
        self.instances[parent].children.push(index);
        Ok(index)
    }

    fn insert(
        &mut self,
        parent: Option<usize>,
        descriptor: Arc<BlockDescriptor>,
        config: &BlockConfig,
    ) -> TreeResult<usize> {
        let id = config.id.clone().unwrap_or_else(BlockId::generate);
        if self.by_id.contains_key(&id) {
            return Err(TreeError::DuplicateBlockId(id));
        }
        if self.by_tag.contains_key(&config.tag) {
            return Err(TreeError::DuplicateTag(config.tag.clone()));
        }

        let inherited = match parent {
            Some(p) => self.instances[p].topic_id.clone(),
            None => self.topic_id.clone(),
        };

        let index = self.instances.len();
        self.instances.push(BlockInstance {
            id: id.clone(),
            tag: config.tag.clone(),
            block_type: config.block_type.clone(),
            policy_id: self.policy_id.clone(),
            topic_id: config.topic_id.clone().or(inherited),
            options: config.options.clone(),
            descriptor,
            events: config.events.clone(),
            index,
            parent,
            children: Vec::new(),
        });
        self.by_id.insert(id, index);
        self.by_tag.insert(config.tag.clone(), index);
        Ok(index)
    }

    pub fn build(self) -> TreeResult<BlockTree> {
        let root = self.root.ok_or(TreeError::MissingRoot)?;
        Ok(BlockTree {
            policy_id: self.policy_id,
            instances: self.instances,
            by_id: self.by_id,
            by_tag: self.by_tag,
            root,
        })
    }
}

// =============================================================================
// TREE
// =============================================================================

/// The immutable instance tree of a compiled policy.
#[derive(Debug, Clone)]
pub struct BlockTree {
    policy_id: PolicyId,
    instances: Vec<BlockInstance>,
    by_id: HashMap<BlockId, usize>,
    by_tag: HashMap<String, usize>,
    root: usize,
}

impl BlockTree {
    /// Compile an authored policy against the registry.
    pub fn compile(policy: &PolicyConfig, registry: &BlockRegistry) -> TreeResult<Self> {
        let mut builder =
            BlockTreeBuilder::new(registry, policy.id.clone(), policy.topic_id.clone());
        let root = builder.root(&policy.root)?;

        let mut pending: Vec<(usize, &BlockConfig)> = policy
            .root
            .children
            .iter()
            .rev()
            .map(|child| (root, child))
            .collect();
        while let Some((parent, config)) = pending.pop() {
            let index = builder.attach(parent, config)?;
            pending.extend(config.children.iter().rev().map(|child| (index, child)));
        }

        let tree = builder.build()?;
        info!(
            policy_id = %tree.policy_id,
            blocks = tree.len(),
            "Compiled policy block tree"
        );
        Ok(tree)
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn root(&self) -> &BlockInstance {
        &self.instances[self.root]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn resolve(&self, id: &BlockId) -> TreeResult<&BlockInstance> {
        self.by_id
            .get(id)
            .map(|&index| &self.instances[index])
            .ok_or_else(|| TreeError::BlockNotFound(id.to_string()))
    }

    pub fn resolve_tag(&self, tag: &str) -> TreeResult<&BlockInstance> {
        self.by_tag
            .get(tag)
            .map(|&index| &self.instances[index])
            .ok_or_else(|| TreeError::BlockNotFound(format!("tag {tag}")))
    }

    pub fn get(&self, index: usize) -> Option<&BlockInstance> {
        self.instances.get(index)
    }

    pub fn parent(&self, instance: &BlockInstance) -> Option<&BlockInstance> {
        instance.parent.map(|index| &self.instances[index])
    }

    pub fn children<'a>(
        &'a self,
        instance: &'a BlockInstance,
    ) -> impl Iterator<Item = &'a BlockInstance> + 'a {
        instance.children.iter().map(move |&index| &self.instances[index])
    }

    /// The sibling that directly follows `instance`, if any.
    pub fn next_sibling(&self, instance: &BlockInstance) -> Option<&BlockInstance> {
        let parent = self.parent(instance)?;
        let position = parent.children.iter().position(|&c| c == instance.index)?;
        parent
            .children
            .get(position + 1)
            .map(|&index| &self.instances[index])
    }

    /// Every instance, root first, in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockInstance> + '_ {
        std::iter::once(self.root()).chain(self.find_children_by_capability(self.root, |_| true))
    }

    /// Descendants of `node` (excluding `node`) whose capabilities satisfy
    /// `predicate`, in pre-order. The iterator is lazy and can be cloned to
    /// restart from the current position.
    pub fn find_children_by_capability<P>(&self, node: usize, predicate: P) -> Descendants<'_, P>
    where
        P: Fn(&Capabilities) -> bool + Clone,
    {
        let stack: Vec<usize> = self
            .instances
            .get(node)
            .map(|instance| instance.children.iter().rev().copied().collect())
            .unwrap_or_default();
        debug!(node, "Walking block descendants");
        Descendants {
            tree: self,
            stack,
            predicate,
        }
    }

    /// Same as `find_children_by_capability`, addressed by block id.
    pub fn find_children_of<P>(&self, id: &BlockId, predicate: P) -> TreeResult<Descendants<'_, P>>
    where
        P: Fn(&Capabilities) -> bool + Clone,
    {
        let node = self.resolve(id)?.index;
        Ok(self.find_children_by_capability(node, predicate))
    }
}

/// Lazy pre-order walk over the descendants of one instance.
#[derive(Clone)]
pub struct Descendants<'t, P> {
    tree: &'t BlockTree,
    stack: Vec<usize>,
    predicate: P,
}

impl<'t, P> Iterator for Descendants<'t, P>
where
    P: Fn(&Capabilities) -> bool,
{
    type Item = &'t BlockInstance;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(index) = self.stack.pop() {
            let instance = &self.tree.instances[index];
            self.stack.extend(instance.children.iter().rev().copied());
            if (self.predicate)(instance.capabilities()) {
                return Some(instance);
            }
        }
        None
    }
}
