use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::block_types::BlockKind;
use crate::catalog::{self, SlotType};
use crate::error::EditError;

// ────────────────────────────────────────────────────────────────────────────
// Parameter values
// ────────────────────────────────────────────────────────────────────────────

/// A parameter value attached to a block instance. Mirrors the slot types of
/// the [`catalog`](crate::catalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Number(f64),
    /// Selected choice value (not its label).
    Choice(String),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(s) | ParamValue::Text(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Choice(_) => "choice",
            ParamValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::Choice(s) | ParamValue::Text(s) => f.write_str(s),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block identity
// ────────────────────────────────────────────────────────────────────────────

/// Stable identity of a block for as long as it stays in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        BlockId(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ProgramBlock – detached subtree
// ────────────────────────────────────────────────────────────────────────────

/// A block together with its owned child lists, detached from any program.
///
/// This is what the catalog factory produces, what gets inserted into a
/// [`Program`], and what a removal hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub params: Vec<ParamValue>,
    pub body: Vec<ProgramBlock>,
    pub else_body: Vec<ProgramBlock>,
}

impl ProgramBlock {
    /// Fresh block of `kind` with default parameters and empty child lists.
    pub fn new(kind: BlockKind) -> Self {
        ProgramBlock {
            id: BlockId::new(),
            kind,
            params: catalog::default_params(kind),
            body: Vec::new(),
            else_body: Vec::new(),
        }
    }

    /// Replace the parameters, validating them against the kind's slots.
    pub fn with_params(mut self, params: Vec<ParamValue>) -> Result<Self, EditError> {
        catalog::validate_params(self.kind, &params)?;
        self.params = params;
        Ok(self)
    }

    pub fn with_body(mut self, body: Vec<ProgramBlock>) -> Self {
        self.body = body;
        self
    }

    pub fn with_else_body(mut self, else_body: Vec<ProgramBlock>) -> Self {
        self.else_body = else_body;
        self
    }

    /// Check arity/type invariants and child-list shape for the whole subtree.
    pub fn validate(&self) -> Result<(), EditError> {
        if !self.kind.is_sequenceable() {
            return Err(EditError::illegal("the start marker cannot be placed in a sequence"));
        }
        catalog::validate_params(self.kind, &self.params)?;
        if !self.kind.has_body() && !self.body.is_empty() {
            return Err(EditError::illegal(format!("{} has no body", self.kind)));
        }
        if !self.kind.has_else_body() && !self.else_body.is_empty() {
            return Err(EditError::illegal(format!("{} has no else body", self.kind)));
        }
        self.body
            .iter()
            .chain(self.else_body.iter())
            .try_for_each(ProgramBlock::validate)
    }

    pub fn to_wire(&self) -> WireBlock {
        WireBlock {
            kind: self.kind,
            params: self.params.clone(),
            body: self.body.iter().map(ProgramBlock::to_wire).collect(),
            else_body: self.else_body.iter().map(ProgramBlock::to_wire).collect(),
        }
    }

    /// Number of blocks in this subtree, including the block itself.
    pub fn count(&self) -> usize {
        1 + self
            .body
            .iter()
            .chain(self.else_body.iter())
            .map(ProgramBlock::count)
            .sum::<usize>()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Program – arena of nodes addressed by id
// ────────────────────────────────────────────────────────────────────────────

/// Identifies one sibling list of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListRef {
    /// The top-level sequence following the start marker.
    Top,
    /// The body of a compound block.
    Body(BlockId),
    /// The else body of a compound block.
    Else(BlockId),
}

/// A block stored in a [`Program`]. Children are referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub id: BlockId,
    pub kind: BlockKind,
    pub params: Vec<ParamValue>,
    pub body: Vec<BlockId>,
    pub else_body: Vec<BlockId>,
    /// The sibling list this node lives in.
    pub parent: ListRef,
}

impl BlockNode {
    /// Number parameter at `slot`. Parameters are validated at edit time, so a
    /// mismatch only happens for a slot the kind does not declare.
    pub fn number(&self, slot: usize) -> f64 {
        self.params.get(slot).and_then(ParamValue::as_number).unwrap_or(0.0)
    }

    /// Choice or text parameter at `slot`.
    pub fn text(&self, slot: usize) -> &str {
        self.params.get(slot).and_then(ParamValue::as_str).unwrap_or("")
    }

    /// Short `label: value` rendering of the parameters, e.g. `"L: 100, R: 80"`.
    /// Choice values are shown with their display label.
    pub fn summary(&self) -> String {
        catalog::slots(self.kind)
            .iter()
            .zip(&self.params)
            .map(|(slot, value)| {
                let shown = match (&slot.ty, value) {
                    (SlotType::Choice { options, .. }, ParamValue::Choice(v)) => options
                        .iter()
                        .find(|(_, ov)| ov == v)
                        .map(|(label, _)| label.clone())
                        .unwrap_or_else(|| v.clone()),
                    _ => value.to_string(),
                };
                format!("{}: {}", slot.label, shown)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A block program: an implicit start marker followed by an ordered
/// top-level sequence of blocks, each of which may own child sequences.
///
/// Blocks live in an arena keyed by [`BlockId`]; sibling lists hold ids, so
/// reordering is index manipulation on a `Vec<BlockId>`.
#[derive(Debug, Clone)]
pub struct Program {
    start_id: BlockId,
    top: Vec<BlockId>,
    nodes: HashMap<BlockId, BlockNode>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Program {
            start_id: BlockId::new(),
            top: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Build a program from detached blocks, validating every one of them.
    pub fn from_blocks(blocks: Vec<ProgramBlock>) -> Result<Self, EditError> {
        let mut program = Program::new();
        for block in blocks {
            block.validate()?;
            let index = program.top.len();
            program.attach(ListRef::Top, index, block)?;
        }
        Ok(program)
    }

    /// Id of the implicit start marker. It is never stored as a node.
    pub fn start_id(&self) -> BlockId {
        self.start_id
    }

    pub fn top(&self) -> &[BlockId] {
        &self.top
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total number of blocks, nested ones included. The start marker is not counted.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The ids of the given sibling list.
    pub fn list(&self, list: ListRef) -> Result<&[BlockId], EditError> {
        match list {
            ListRef::Top => Ok(&self.top),
            ListRef::Body(id) => {
                let node = self.parent_node(id)?;
                if !node.kind.has_body() {
                    return Err(EditError::illegal(format!("{} has no body", node.kind)));
                }
                Ok(&node.body)
            }
            ListRef::Else(id) => {
                let node = self.parent_node(id)?;
                if !node.kind.has_else_body() {
                    return Err(EditError::illegal(format!("{} has no else body", node.kind)));
                }
                Ok(&node.else_body)
            }
        }
    }

    fn parent_node(&self, id: BlockId) -> Result<&BlockNode, EditError> {
        self.nodes
            .get(&id)
            .ok_or_else(|| EditError::illegal(format!("parent block {} does not exist", id)))
    }

    fn list_mut(&mut self, list: ListRef) -> Result<&mut Vec<BlockId>, EditError> {
        // Shape checks happen in `list`; re-borrow mutably afterwards.
        self.list(list)?;
        match list {
            ListRef::Top => Ok(&mut self.top),
            ListRef::Body(id) => self
                .nodes
                .get_mut(&id)
                .map(|n| &mut n.body)
                .ok_or(EditError::UnknownBlock(id)),
            ListRef::Else(id) => self
                .nodes
                .get_mut(&id)
                .map(|n| &mut n.else_body)
                .ok_or(EditError::UnknownBlock(id)),
        }
    }

    /// Position of `id` within its sibling list.
    pub fn position(&self, id: BlockId) -> Result<(ListRef, usize), EditError> {
        let node = self.nodes.get(&id).ok_or(EditError::UnknownBlock(id))?;
        let siblings = self.list(node.parent)?;
        let index = siblings
            .iter()
            .position(|s| *s == id)
            .ok_or(EditError::UnknownBlock(id))?;
        Ok((node.parent, index))
    }

    /// Copy the subtree rooted at `id` out of the arena.
    pub fn block(&self, id: BlockId) -> Option<ProgramBlock> {
        let node = self.nodes.get(&id)?;
        Some(ProgramBlock {
            id: node.id,
            kind: node.kind,
            params: node.params.clone(),
            body: node.body.iter().filter_map(|c| self.block(*c)).collect(),
            else_body: node.else_body.iter().filter_map(|c| self.block(*c)).collect(),
        })
    }

    /// All top-level blocks as detached subtrees.
    pub fn blocks(&self) -> Vec<ProgramBlock> {
        self.top.iter().filter_map(|id| self.block(*id)).collect()
    }

    /// Ids of every block in depth-first, left-to-right order (body before else body).
    pub fn iter_preorder(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<BlockId> = self.top.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.else_body.iter().rev());
                stack.extend(node.body.iter().rev());
            }
        }
        out
    }

    pub(crate) fn node_mut(&mut self, id: BlockId) -> Option<&mut BlockNode> {
        self.nodes.get_mut(&id)
    }

    /// Insert a detached subtree into `list` at `index` (clamped to the list bounds).
    /// Returns the index actually used.
    pub(crate) fn attach(
        &mut self,
        list: ListRef,
        index: usize,
        block: ProgramBlock,
    ) -> Result<usize, EditError> {
        if !block.kind.is_sequenceable() {
            return Err(EditError::illegal("the start marker cannot be inserted"));
        }
        let mut seen = HashSet::new();
        for id in self.subtree_ids_of(&block) {
            if !seen.insert(id) {
                return Err(EditError::illegal(format!("block {} appears twice in the inserted subtree", id)));
            }
            if self.contains(id) || id == self.start_id {
                return Err(EditError::illegal(format!("block {} is already in the program", id)));
            }
        }
        let siblings = self.list_mut(list)?;
        let index = index.min(siblings.len());
        siblings.insert(index, block.id);
        self.store(list, block);
        Ok(index)
    }

    fn subtree_ids_of(&self, block: &ProgramBlock) -> Vec<BlockId> {
        let mut ids = vec![block.id];
        for child in block.body.iter().chain(block.else_body.iter()) {
            ids.extend(self.subtree_ids_of(child));
        }
        ids
    }

    fn store(&mut self, parent: ListRef, block: ProgramBlock) {
        let id = block.id;
        let body = block.body.iter().map(|b| b.id).collect();
        let else_body = block.else_body.iter().map(|b| b.id).collect();
        self.nodes.insert(
            id,
            BlockNode {
                id,
                kind: block.kind,
                params: block.params,
                body,
                else_body,
                parent,
            },
        );
        for child in block.body {
            self.store(ListRef::Body(id), child);
        }
        for child in block.else_body {
            self.store(ListRef::Else(id), child);
        }
    }

    /// Remove the subtree rooted at `id`, returning it with its former position.
    pub(crate) fn detach(&mut self, id: BlockId) -> Result<(ListRef, usize, ProgramBlock), EditError> {
        if id == self.start_id {
            return Err(EditError::illegal("the start marker cannot be removed"));
        }
        let (list, index) = self.position(id)?;
        let block = self.block(id).ok_or(EditError::UnknownBlock(id))?;
        self.list_mut(list)?.remove(index);
        self.forget(id);
        Ok((list, index, block))
    }

    fn forget(&mut self, id: BlockId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.body.into_iter().chain(node.else_body) {
                self.forget(child);
            }
        }
    }

    /// Swap the entries at `from` and `to` of one sibling list.
    pub(crate) fn swap_in_list(&mut self, list: ListRef, from: usize, to: usize) -> Result<(), EditError> {
        let siblings = self.list_mut(list)?;
        if from >= siblings.len() || to >= siblings.len() {
            return Err(EditError::illegal("move outside the sibling list"));
        }
        siblings.swap(from, to);
        Ok(())
    }

    /// Remove every block. The start marker stays.
    pub(crate) fn take_all(&mut self) -> Vec<ProgramBlock> {
        let blocks = self.blocks();
        self.top.clear();
        self.nodes.clear();
        blocks
    }

    // ── wire shape ──────────────────────────────────────────────────────

    pub fn to_wire(&self) -> Vec<WireBlock> {
        self.blocks().iter().map(ProgramBlock::to_wire).collect()
    }

    /// Rebuild a program from its wire shape. Fresh ids are assigned.
    pub fn from_wire(blocks: &[WireBlock]) -> Result<Self, EditError> {
        Program::from_blocks(blocks.iter().map(WireBlock::to_block).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shape and documents
// ────────────────────────────────────────────────────────────────────────────

/// Serialized form of a block: `(kind, params, body, else_body)`, recursively.
/// Ids are not part of the wire shape and the start marker is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBlock {
    pub kind: BlockKind,
    pub params: Vec<ParamValue>,
    #[serde(default)]
    pub body: Vec<WireBlock>,
    #[serde(default)]
    pub else_body: Vec<WireBlock>,
}

impl WireBlock {
    pub fn to_block(&self) -> ProgramBlock {
        ProgramBlock {
            id: BlockId::new(),
            kind: self.kind,
            params: self.params.clone(),
            body: self.body.iter().map(WireBlock::to_block).collect(),
            else_body: self.else_body.iter().map(WireBlock::to_block).collect(),
        }
    }
}

const MAGIC: &[u8; 10] = b"ROBOBLOCKS";
const FORMAT_VERSION: u32 = 1;

/// A saved program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDoc {
    pub name: String,
    pub blocks: Vec<WireBlock>,
}

impl ProgramDoc {
    pub fn from_program(name: impl Into<String>, program: &Program) -> Self {
        ProgramDoc {
            name: name.into(),
            blocks: program.to_wire(),
        }
    }

    pub fn to_program(&self) -> Result<Program, EditError> {
        Program::from_wire(&self.blocks)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_json<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))
    }

    /// Save to a binary file with magic bytes and versioning.
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, MAGIC)?;
        std::io::Write::write_all(&mut writer, &FORMAT_VERSION.to_le_bytes())?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .with_context(|| format!("Failed to encode {}", path.display()))?;
        std::io::Write::flush(&mut writer)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load from a binary file, checking magic bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 10];
        std::io::Read::read_exact(&mut reader, &mut magic)
            .with_context(|| format!("{} is too short for a program document", path.display()))?;
        if &magic != MAGIC {
            anyhow::bail!("Invalid magic bytes: expected 'ROBOBLOCKS'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != FORMAT_VERSION {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let doc: ProgramDoc =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .with_context(|| format!("Failed to decode {}", path.display()))?;
        Ok(doc)
    }

    /// Load by file extension: `.rbk` is binary, anything else JSON.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        if is_binary_path(path.as_ref()) {
            Self::load_from_binary(path)
        } else {
            Self::load_from_json(path)
        }
    }

    /// Save by file extension: `.rbk` is binary, anything else JSON.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        if is_binary_path(path.as_ref()) {
            self.save_to_binary(path)
        } else {
            self.save_to_json(path)
        }
    }
}

fn is_binary_path(path: &std::path::Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("rbk")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        let body = vec![
            ProgramBlock::new(BlockKind::RobotMove),
            ProgramBlock::new(BlockKind::WaitSeconds),
        ];
        let state_if = ProgramBlock::new(BlockKind::StateIf)
            .with_body(vec![ProgramBlock::new(BlockKind::RobotStop)])
            .with_else_body(vec![ProgramBlock::new(BlockKind::GoHome)]);
        Program::from_blocks(vec![
            ProgramBlock::new(BlockKind::StateSet),
            ProgramBlock::new(BlockKind::LoopRepeat).with_body(body),
            state_if,
        ])
        .unwrap()
    }

    #[test]
    fn test_arena_shape() {
        let p = sample();
        assert_eq!(p.top().len(), 3);
        assert_eq!(p.len(), 7);
        let lp = p.get(p.top()[1]).unwrap();
        assert_eq!(lp.kind, BlockKind::LoopRepeat);
        assert_eq!(lp.body.len(), 2);
        let child = p.get(lp.body[0]).unwrap();
        assert_eq!(child.parent, ListRef::Body(lp.id));
        assert_eq!(p.position(lp.body[1]).unwrap(), (ListRef::Body(lp.id), 1));
    }

    #[test]
    fn test_preorder_visits_body_before_else() {
        let p = sample();
        let kinds: Vec<_> = p.iter_preorder().iter().map(|id| p.get(*id).unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::StateSet,
                BlockKind::LoopRepeat,
                BlockKind::RobotMove,
                BlockKind::WaitSeconds,
                BlockKind::StateIf,
                BlockKind::RobotStop,
                BlockKind::GoHome,
            ]
        );
    }

    #[test]
    fn test_wire_round_trip_is_structural() {
        let p = sample();
        let wire = p.to_wire();
        let back = Program::from_wire(&wire).unwrap();
        assert_eq!(back.to_wire(), wire);
        assert_ne!(back.top()[0], p.top()[0]);
    }

    #[test]
    fn test_from_wire_rejects_bad_shapes() {
        let start = WireBlock {
            kind: BlockKind::StartHat,
            params: vec![],
            body: vec![],
            else_body: vec![],
        };
        assert!(matches!(
            Program::from_wire(&[start]),
            Err(EditError::IllegalStructuralEdit(_))
        ));

        let mut wait = ProgramBlock::new(BlockKind::WaitSeconds).to_wire();
        wait.params = vec![ParamValue::Number(99.0)];
        assert!(matches!(
            Program::from_wire(&[wait.clone()]),
            Err(EditError::InvalidParameter { .. })
        ));

        wait.params = vec![ParamValue::Number(1.0)];
        wait.body = vec![ProgramBlock::new(BlockKind::RobotStop).to_wire()];
        assert!(Program::from_wire(&[wait]).is_err());
    }

    #[test]
    fn test_summary_uses_choice_labels() {
        let p = Program::from_blocks(vec![ProgramBlock::new(BlockKind::RobotTurn)]).unwrap();
        let node = p.get(p.top()[0]).unwrap();
        assert_eq!(node.summary(), "Direction: Left ⬅️, Sec: 0.5");
    }

    #[test]
    fn test_subtree_with_repeated_block_is_rejected() {
        let stop = ProgramBlock::new(BlockKind::RobotStop);
        let lp = ProgramBlock::new(BlockKind::LoopRepeat).with_body(vec![stop.clone(), stop.clone()]);
        assert!(matches!(
            Program::from_blocks(vec![lp.clone()]),
            Err(EditError::IllegalStructuralEdit(_))
        ));

        let mut p = sample();
        let before = p.len();
        assert!(p.attach(ListRef::Top, 0, lp).is_err());
        assert_eq!(p.len(), before);
        assert_eq!(p.top().len(), 3);

        // The same block twice at the top level is caught as well.
        assert!(Program::from_blocks(vec![stop.clone(), stop]).is_err());
    }

    #[test]
    fn test_list_rejects_missing_or_shapeless_parent() {
        let p = sample();
        let stop = p.top()[0];
        assert!(p.list(ListRef::Body(stop)).is_err());
        assert!(p.list(ListRef::Else(p.top()[1])).is_err());
        assert!(p.list(ListRef::Body(BlockId::new())).is_err());
    }
}
