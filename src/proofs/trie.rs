use thiserror::Error;

use crate::proofs::common::evm::keccak256;
use crate::proofs::rlp::{self, Item, RlpError};

/// Error produced when a proof cannot be checked at all: a node hash
/// mismatch, a malformed node, or a proof that ends on a non-terminal
/// node. Provable exclusion is *not* an error; `verify` reports it as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid proof: {reason}")]
    Invalid { reason: String },
}

impl VerifyError {
    /// Create an invalid-proof error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

impl From<RlpError> for VerifyError {
    fn from(err: RlpError) -> Self {
        VerifyError::invalid(err.to_string())
    }
}

/// Walk a chain of RLP-encoded trie nodes from `root` towards `key`.
///
/// Returns `Some(value)` when the proof shows the key is present,
/// `None` when the proof shows the key is provably absent (a missing
/// branch child or a diverging leaf/extension path), and
/// [`VerifyError::Invalid`] for anything that does not hash-link back to
/// `root`. Nodes whose encoding is shorter than 32 bytes are embedded in
/// their parent and descended in place.
pub fn verify(
    root: &[u8; 32],
    key: &[u8],
    proof: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, VerifyError> {
    let nibbles = to_nibbles(key);
    let mut offset = 0usize;
    let mut nodes = proof.iter();
    let mut current = next_node(&mut nodes, root)?;

    loop {
        let mut elems = match current {
            Item::List(elems) => elems,
            Item::Bytes(_) => return Err(VerifyError::invalid("node is not a list")),
        };

        match elems.len() {
            17 => {
                if offset == nibbles.len() {
                    let value = elems[16].as_bytes()?.to_vec();
                    ensure_exhausted(&mut nodes)?;
                    return Ok(if value.is_empty() { None } else { Some(value) });
                }
                let child = elems.swap_remove(nibbles[offset] as usize);
                offset += 1;
                current = descend(child, &mut nodes)?;
                if matches!(current, Item::Bytes(_)) {
                    // empty child slot: the key cannot exist below here
                    ensure_exhausted(&mut nodes)?;
                    return Ok(None);
                }
            }
            2 => {
                let second = elems.pop().expect("two elements");
                let first = elems.pop().expect("one element");
                let (path, is_leaf) = decode_path(first.as_bytes()?)?;

                if is_leaf {
                    let value = second.as_bytes()?.to_vec();
                    let matched = nibbles[offset..] == path[..];
                    ensure_exhausted(&mut nodes)?;
                    return Ok(if matched && !value.is_empty() {
                        Some(value)
                    } else {
                        None
                    });
                }

                if !nibbles[offset..].starts_with(&path) {
                    ensure_exhausted(&mut nodes)?;
                    return Ok(None);
                }
                offset += path.len();
                current = descend(second, &mut nodes)?;
                if matches!(current, Item::Bytes(_)) {
                    return Err(VerifyError::invalid("extension child is empty"));
                }
            }
            n => {
                return Err(VerifyError::invalid(format!(
                    "node has {n} elements, expected 2 or 17"
                )))
            }
        }
    }
}

/// Minimal insert-only Merkle-Patricia trie, used to reconstruct a
/// block's receipts trie and extract root-to-leaf proof paths.
#[derive(Default)]
pub struct Trie {
    root: Option<Node>,
}

enum Node {
    Leaf {
        path: Vec<u8>,
        value: Vec<u8>,
    },
    Extension {
        path: Vec<u8>,
        child: Box<Node>,
    },
    Branch {
        children: Box<[Option<Node>; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key/value pair, replacing any existing value for the key.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) {
        let path = to_nibbles(key);
        let root = self.root.take();
        self.root = Some(insert_node(root, &path, value));
    }

    /// Hash of the root node (the fixed empty-trie hash when no key was
    /// inserted).
    pub fn root_hash(&self) -> [u8; 32] {
        match &self.root {
            Some(node) => keccak256(rlp::encode(&encode_node(node))),
            None => keccak256([0x80u8]),
        }
    }

    /// Collect the encoded nodes on the path from the root towards `key`,
    /// root first. Nodes embedded inline in their parent are skipped; the
    /// root is always included. The result is exactly what [`verify`]
    /// consumes.
    pub fn prove(&self, key: &[u8]) -> Vec<Vec<u8>> {
        let mut proof = Vec::new();
        let Some(mut node) = self.root.as_ref() else {
            return proof;
        };
        let nibbles = to_nibbles(key);
        let mut offset = 0usize;

        loop {
            let encoded = rlp::encode(&encode_node(node));
            if proof.is_empty() || encoded.len() >= 32 {
                proof.push(encoded);
            }
            match node {
                Node::Leaf { .. } => break,
                Node::Extension { path, child } => {
                    if !nibbles[offset..].starts_with(path) {
                        break;
                    }
                    offset += path.len();
                    node = child;
                }
                Node::Branch { children, .. } => {
                    if offset == nibbles.len() {
                        break;
                    }
                    match &children[nibbles[offset] as usize] {
                        Some(child) => {
                            offset += 1;
                            node = child;
                        }
                        None => break,
                    }
                }
            }
        }
        proof
    }
}

// --- Helper Functions ---

fn next_node<'a, I>(nodes: &mut I, expected: &[u8]) -> Result<Item, VerifyError>
where
    I: Iterator<Item = &'a Vec<u8>>,
{
    let raw = nodes
        .next()
        .ok_or_else(|| VerifyError::invalid("proof ends before a terminal node"))?;
    if keccak256(raw) != expected {
        return Err(VerifyError::invalid("node hash mismatch"));
    }
    Ok(rlp::decode(raw)?)
}

/// Resolve a child reference: a 32-byte hash pulls the next proof node,
/// an inline list is descended in place, and an empty byte string stays
/// as-is so the caller can report exclusion.
fn descend<'a, I>(child: Item, nodes: &mut I) -> Result<Item, VerifyError>
where
    I: Iterator<Item = &'a Vec<u8>>,
{
    match child {
        Item::Bytes(bytes) if bytes.is_empty() => Ok(Item::Bytes(bytes)),
        Item::Bytes(bytes) if bytes.len() == 32 => next_node(nodes, &bytes),
        Item::Bytes(_) => Err(VerifyError::invalid("child reference is not a hash")),
        Item::List(elems) => Ok(Item::List(elems)),
    }
}

fn ensure_exhausted<'a, I>(nodes: &mut I) -> Result<(), VerifyError>
where
    I: Iterator<Item = &'a Vec<u8>>,
{
    if nodes.next().is_some() {
        return Err(VerifyError::invalid("unused trailing proof nodes"));
    }
    Ok(())
}

fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Decode a hex-prefix encoded path into nibbles and the leaf flag.
fn decode_path(encoded: &[u8]) -> Result<(Vec<u8>, bool), VerifyError> {
    let first = *encoded
        .first()
        .ok_or_else(|| VerifyError::invalid("empty node path"))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(VerifyError::invalid("bad path prefix flag"));
    }
    let is_leaf = flag >= 2;
    let mut nibbles = Vec::new();
    if flag & 1 == 1 {
        nibbles.push(first & 0x0f);
    }
    for byte in &encoded[1..] {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    Ok((nibbles, is_leaf))
}

/// Hex-prefix encode a nibble path.
fn encode_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let flag = (if is_leaf { 2u8 } else { 0 }) | (odd as u8);
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd {
        out.push(flag << 4 | nibbles[0]);
        &nibbles[1..]
    } else {
        out.push(flag << 4);
        nibbles
    };
    for pair in rest.chunks(2) {
        out.push(pair[0] << 4 | pair[1]);
    }
    out
}

fn insert_node(node: Option<Node>, path: &[u8], value: Vec<u8>) -> Node {
    match node {
        None => Node::Leaf {
            path: path.to_vec(),
            value,
        },
        Some(Node::Leaf {
            path: leaf_path,
            value: leaf_value,
        }) => {
            if leaf_path == path {
                return Node::Leaf {
                    path: leaf_path,
                    value,
                };
            }
            let common = common_prefix(&leaf_path, path);
            let mut branch = empty_branch();
            attach(&mut branch, &leaf_path[common..], leaf_value);
            attach(&mut branch, &path[common..], value);
            wrap_extension(&path[..common], branch)
        }
        Some(Node::Extension {
            path: ext_path,
            child,
        }) => {
            let common = common_prefix(&ext_path, path);
            if common == ext_path.len() {
                return Node::Extension {
                    path: ext_path,
                    child: Box::new(insert_node(Some(*child), &path[common..], value)),
                };
            }
            let mut branch = empty_branch();
            // Reattach the shortened extension below the split point.
            let ext_nibble = ext_path[common] as usize;
            let remainder = &ext_path[common + 1..];
            let reattached = if remainder.is_empty() {
                *child
            } else {
                Node::Extension {
                    path: remainder.to_vec(),
                    child,
                }
            };
            if let Node::Branch { children, .. } = &mut branch {
                children[ext_nibble] = Some(reattached);
            }
            attach(&mut branch, &path[common..], value);
            wrap_extension(&path[..common], branch)
        }
        Some(Node::Branch {
            mut children,
            value: branch_value,
        }) => {
            if path.is_empty() {
                return Node::Branch {
                    children,
                    value: Some(value),
                };
            }
            let idx = path[0] as usize;
            let child = children[idx].take();
            children[idx] = Some(insert_node(child, &path[1..], value));
            Node::Branch {
                children,
                value: branch_value,
            }
        }
    }
}

fn empty_branch() -> Node {
    Node::Branch {
        children: Box::new(std::array::from_fn(|_| None)),
        value: None,
    }
}

/// Attach a leaf (or branch value) for the given remaining path.
fn attach(branch: &mut Node, path: &[u8], value: Vec<u8>) {
    let Node::Branch {
        children,
        value: branch_value,
    } = branch
    else {
        unreachable!("attach target is always a branch");
    };
    if path.is_empty() {
        *branch_value = Some(value);
    } else {
        children[path[0] as usize] = Some(Node::Leaf {
            path: path[1..].to_vec(),
            value,
        });
    }
}

fn wrap_extension(prefix: &[u8], node: Node) -> Node {
    if prefix.is_empty() {
        node
    } else {
        Node::Extension {
            path: prefix.to_vec(),
            child: Box::new(node),
        }
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn encode_node(node: &Node) -> Item {
    match node {
        Node::Leaf { path, value } => Item::List(vec![
            Item::Bytes(encode_path(path, true)),
            Item::Bytes(value.clone()),
        ]),
        Node::Extension { path, child } => Item::List(vec![
            Item::Bytes(encode_path(path, false)),
            child_ref(child),
        ]),
        Node::Branch { children, value } => {
            let mut elems = Vec::with_capacity(17);
            for child in children.iter() {
                elems.push(match child {
                    Some(node) => child_ref(node),
                    None => Item::Bytes(Vec::new()),
                });
            }
            elems.push(Item::Bytes(value.clone().unwrap_or_default()));
            Item::List(elems)
        }
    }
}

/// Reference a child node: by hash when its encoding is 32 bytes or
/// longer, embedded verbatim otherwise.
fn child_ref(node: &Node) -> Item {
    let item = encode_node(node);
    let encoded = rlp::encode(&item);
    if encoded.len() >= 32 {
        Item::Bytes(keccak256(encoded).to_vec())
    } else {
        item
    }
}
