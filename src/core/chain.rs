use serde::{Deserialize, Serialize};

use crate::core::types::{algo_tag, BlockHeader};

/// What retargeting needs to remember about an accepted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainNode {
    pub version: u32,
    pub time: u32,
    pub bits: u32,
}

impl From<&BlockHeader> for ChainNode {
    fn from(header: &BlockHeader) -> Self {
        ChainNode { version: header.version, time: header.time, bits: header.bits }
    }
}

// ─── Chain ──────────────────────────────────────────────────────────

/// Accepted chain as an arena indexed by height. Node `i` has height `i` and
/// its predecessor is node `i - 1`; node 0 is genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIndex {
    nodes: Vec<ChainNode>,
}

impl ChainIndex {
    pub fn new(genesis: ChainNode) -> Self {
        ChainIndex { nodes: vec![genesis] }
    }

    /// Build from nodes ordered from genesis. `None` when empty.
    pub fn from_nodes(nodes: Vec<ChainNode>) -> Option<Self> {
        if nodes.is_empty() { None } else { Some(ChainIndex { nodes }) }
    }

    /// Parse a JSON array of `{version, time, bits}` objects, genesis first.
    pub fn from_json(json: &str) -> Result<Option<Self>, serde_json::Error> {
        let nodes: Vec<ChainNode> = serde_json::from_str(json)?;
        Ok(Self::from_nodes(nodes))
    }

    /// Append a block on top of the tip and return its height.
    pub fn push(&mut self, node: ChainNode) -> u32 {
        self.nodes.push(node);
        self.height()
    }

    pub fn push_header(&mut self, header: &BlockHeader) -> u32 {
        self.push(ChainNode::from(header))
    }

    pub fn height(&self) -> u32 { (self.nodes.len() - 1) as u32 }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn tip(&self) -> BlockIndex<'_> {
        BlockIndex { chain: self, height: self.height() }
    }

    pub fn at(&self, height: u32) -> Option<BlockIndex<'_>> {
        if (height as usize) < self.nodes.len() {
            Some(BlockIndex { chain: self, height })
        } else {
            None
        }
    }
}

/// Read-only cursor on one block of a [`ChainIndex`].
#[derive(Clone, Copy)]
pub struct BlockIndex<'a> {
    chain: &'a ChainIndex,
    height: u32,
}

impl<'a> BlockIndex<'a> {
    fn node(&self) -> &'a ChainNode { &self.chain.nodes[self.height as usize] }

    pub fn height(&self) -> u32 { self.height }
    pub fn bits(&self) -> u32 { self.node().bits }
    pub fn version(&self) -> u32 { self.node().version }
    pub fn time(&self) -> u32 { self.node().time }
    pub fn block_time(&self) -> i64 { self.node().time as i64 }
    pub fn algo_tag(&self) -> u32 { algo_tag(self.node().version) }

    /// Predecessor, or `None` at genesis.
    pub fn prev(&self) -> Option<BlockIndex<'a>> {
        self.height.checked_sub(1).map(|height| BlockIndex { chain: self.chain, height })
    }

    /// Predecessor of a block that must have one. Panics at genesis: the walk
    /// asked for history the local chain cannot have.
    pub fn expect_prev(&self) -> BlockIndex<'a> {
        match self.prev() {
            Some(prev) => prev,
            None => {
                tracing::error!("ancestor walk ran past genesis");
                panic!("chain index: genesis has no predecessor");
            }
        }
    }

    /// Ancestor at `height`, which must not be above this block.
    pub fn ancestor(&self, height: u32) -> Option<BlockIndex<'a>> {
        if height <= self.height { self.chain.at(height) } else { None }
    }
}

impl std::fmt::Debug for BlockIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockIndex")
            .field("height", &self.height)
            .field("node", self.node())
            .finish()
    }
}

impl PartialEq for BlockIndex<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.chain, other.chain) && self.height == other.height
    }
}
