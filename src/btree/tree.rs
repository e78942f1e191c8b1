//! # Copy-on-Write B+Tree
//!
//! The tree algorithms: lookup, insert with up to 3-way split, and delete
//! with sibling merging. Mutations never touch a persisted node in place;
//! every node on the path from the root to the change is rebuilt into a
//! fresh page, and the functions return the id of the new root.
//!
//! ## Page store capability
//!
//! The tree runs against any [`PageStore`]: three operations that fetch a
//! node by page id, register a freshly built node under a new id, and
//! retire an id that is no longer reachable. The mmap-backed
//! [`Pager`](crate::storage::Pager) and the in-memory
//! [`MemPageStore`](crate::storage::MemPageStore) both implement it.
//!
//! ## Root handling
//!
//! Page id 0 is the master page, so `root == 0` doubles as "empty tree".
//! The first insert seeds the root leaf with an empty sentinel key at
//! index 0; every later key is `>=` that sentinel, so the in-node search
//! always finds a containing position and needs no boundary case. Rebuilds
//! of the root preserve the sentinel because index 0 is copied like any
//! other entry.
//!
//! ## Insert
//!
//! ```text
//! 1. Rebuild the leaf with the new pair (buffer may reach 2 pages)
//! 2. Split into 1-3 page-sized nodes
//! 3. Parent replaces the old child entry with the 1-3 new ones
//! 4. Repeat upward; if the root itself split, a new root is built over
//!    the pieces (tree grows one level)
//! ```
//!
//! ## Delete
//!
//! A shrunken child merges into its left or right sibling when the result
//! fits a page and the child fell below a quarter page; otherwise the
//! undersized child is tolerated. A root internal node left with exactly
//! one child collapses into that child (tree loses one level).

use smallvec::{smallvec, SmallVec};

use super::node::{BNode, NodeType};
use crate::config::{HEADER_SIZE, MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE};

/// The page-store capability the tree consumes.
///
/// Implementations own the mapping from page ids to node bytes. Ids handed
/// out by `create` must be stable until retired; handing an unknown id to
/// `page` is a programming error and panics.
pub trait PageStore {
    /// Returns a copy of the node registered under `pid`.
    fn page(&self, pid: u64) -> BNode;

    /// Registers a page-sized node and returns its new page id.
    fn create(&mut self, node: BNode) -> u64;

    /// Marks `pid` as unreachable from the tree.
    fn retire(&mut self, pid: u64);
}

/// Looks up `key` starting from `root`. Returns `None` for the empty tree
/// or a missing key.
pub fn lookup<S: PageStore>(store: &S, root: u64, key: &[u8]) -> Option<Vec<u8>> {
    if root == 0 {
        return None;
    }
    let mut node = store.page(root);
    loop {
        let idx = lookup_le(&node, key);
        match node.btype() {
            NodeType::Leaf => {
                if idx < node.nkeys() && node.get_key(idx) == key {
                    return Some(node.get_val(idx).to_vec());
                }
                return None;
            }
            NodeType::Internal => node = store.page(node.get_ptr(idx)),
        }
    }
}

/// Inserts or updates `key`, returning the new root id.
pub fn insert<S: PageStore>(store: &mut S, root: u64, key: &[u8], val: &[u8]) -> u64 {
    assert!(
        !key.is_empty() && key.len() <= MAX_KEY_SIZE,
        "key length {} out of range",
        key.len()
    );
    assert!(
        val.len() <= MAX_VAL_SIZE,
        "value length {} out of range",
        val.len()
    );

    if root == 0 {
        // Seed the first leaf with the sentinel entry covering the whole
        // key space, then the real pair.
        let mut first = BNode::new(PAGE_SIZE);
        first.set_header(NodeType::Leaf, 2);
        first.append_kv(0, 0, b"", b"");
        first.append_kv(1, 0, key, val);
        return store.create(first);
    }

    let node = store.page(root);
    store.retire(root);
    let node = tree_insert(store, node, key, val);

    let mut split = node_split3(node);
    if split.len() == 1 {
        return store.create(split.remove(0));
    }

    // The root itself split: grow the tree by one level.
    let mut new_root = BNode::new(PAGE_SIZE);
    new_root.set_header(NodeType::Internal, split.len() as u16);
    for (i, kid) in split.into_iter().enumerate() {
        let first_key = kid.first_key().to_vec();
        let pid = store.create(kid);
        new_root.append_kv(i as u16, pid, &first_key, b"");
    }
    store.create(new_root)
}

/// Removes `key`. Returns the new root id, or `None` if the key was not
/// present (the tree is unchanged in that case).
pub fn remove<S: PageStore>(store: &mut S, root: u64, key: &[u8]) -> Option<u64> {
    if root == 0 {
        return None;
    }
    let node = store.page(root);
    let updated = tree_delete(store, node, key)?;
    store.retire(root);

    if updated.btype() == NodeType::Internal && updated.nkeys() == 1 {
        // The root is down to a single child: drop a level.
        Some(updated.get_ptr(0))
    } else {
        Some(store.create(updated))
    }
}

/// Largest index whose key compares `<=` the target. Index 0 (the sentinel
/// chain) is never compared, so the result is always a valid position.
fn lookup_le(node: &BNode, key: &[u8]) -> u16 {
    let nkeys = node.nkeys();
    let mut found = 0;
    for i in 1..nkeys {
        let cmp = node.get_key(i).cmp(key);
        if cmp.is_le() {
            found = i;
        }
        if cmp.is_ge() {
            break;
        }
    }
    found
}

/// Rebuilds `node` with `key` inserted or updated. The result may exceed
/// one page and must go through [`node_split3`] before it is stored.
fn tree_insert<S: PageStore>(store: &mut S, node: BNode, key: &[u8], val: &[u8]) -> BNode {
    let mut new = BNode::new(2 * PAGE_SIZE);
    let idx = lookup_le(&node, key);
    match node.btype() {
        NodeType::Leaf => {
            if node.nkeys() == 0 {
                // A keyless leaf has nothing to compare against; insert at
                // the front.
                leaf_insert(&mut new, &node, 0, key, val);
            } else if node.get_key(idx) == key {
                leaf_update(&mut new, &node, idx, key, val);
            } else {
                leaf_insert(&mut new, &node, idx + 1, key, val);
            }
        }
        NodeType::Internal => node_insert(store, &mut new, &node, idx, key, val),
    }
    new
}

/// Internal-node step of the insert: recurse into child `idx`, split the
/// rebuilt child, and graft the 1-3 pieces in its place.
fn node_insert<S: PageStore>(
    store: &mut S,
    new: &mut BNode,
    node: &BNode,
    idx: u16,
    key: &[u8],
    val: &[u8],
) {
    let kptr = node.get_ptr(idx);
    let knode = store.page(kptr);
    store.retire(kptr);

    let knode = tree_insert(store, knode, key, val);
    let split = node_split3(knode);
    node_replace_kid_n(store, new, node, idx, split);
}

/// New leaf with `(key, val)` inserted at position `idx`.
fn leaf_insert(new: &mut BNode, old: &BNode, idx: u16, key: &[u8], val: &[u8]) {
    new.set_header(NodeType::Leaf, old.nkeys() + 1);
    new.append_range(old, 0, 0, idx);
    new.append_kv(idx, 0, key, val);
    new.append_range(old, idx + 1, idx, old.nkeys() - idx);
}

/// New leaf with the value at `idx` replaced.
fn leaf_update(new: &mut BNode, old: &BNode, idx: u16, key: &[u8], val: &[u8]) {
    new.set_header(NodeType::Leaf, old.nkeys());
    new.append_range(old, 0, 0, idx);
    new.append_kv(idx, 0, key, val);
    new.append_range(old, idx + 1, idx + 1, old.nkeys() - idx - 1);
}

/// New leaf with the entry at `idx` removed.
fn leaf_delete(new: &mut BNode, old: &BNode, idx: u16) {
    new.set_header(NodeType::Leaf, old.nkeys() - 1);
    new.append_range(old, 0, 0, idx);
    new.append_range(old, idx, idx + 1, old.nkeys() - idx - 1);
}

/// Splits `old` in half by key count. `left` keeps a double-size buffer
/// because an unbalanced pair distribution can leave it oversized.
fn node_split2(left: &mut BNode, right: &mut BNode, old: &BNode) {
    let nkeys = old.nkeys();
    let split_idx = nkeys / 2;

    left.set_header(old.btype(), split_idx);
    left.append_range(old, 0, 0, split_idx);

    right.set_header(old.btype(), nkeys - split_idx);
    right.append_range(old, 0, split_idx, nkeys - split_idx);
}

/// Cuts a possibly-oversized node into 1, 2 or 3 page-sized nodes. Three
/// pieces happen when one half of the first cut still exceeds a page,
/// which a single maximal pair among many small ones can force.
fn node_split3(mut old: BNode) -> SmallVec<[BNode; 3]> {
    if old.nbytes() <= PAGE_SIZE {
        old.shrink_to_page();
        return smallvec![old];
    }

    let mut left = BNode::new(2 * PAGE_SIZE);
    let mut right = BNode::new(PAGE_SIZE);
    node_split2(&mut left, &mut right, &old);

    if left.nbytes() <= PAGE_SIZE {
        left.shrink_to_page();
        return smallvec![left, right];
    }

    let mut leftleft = BNode::new(PAGE_SIZE);
    let mut middle = BNode::new(PAGE_SIZE);
    node_split2(&mut leftleft, &mut middle, &left);
    smallvec![leftleft, middle, right]
}

/// New internal node in which entry `idx` is replaced by one entry per
/// kid, each keyed by the kid's first key and pointing at its new page.
fn node_replace_kid_n<S: PageStore>(
    store: &mut S,
    new: &mut BNode,
    old: &BNode,
    idx: u16,
    kids: SmallVec<[BNode; 3]>,
) {
    let inc = kids.len() as u16;
    new.set_header(NodeType::Internal, old.nkeys() + inc - 1);
    new.append_range(old, 0, 0, idx);
    for (i, kid) in kids.into_iter().enumerate() {
        let first_key = kid.first_key().to_vec();
        let pid = store.create(kid);
        new.append_kv(idx + i as u16, pid, &first_key, b"");
    }
    new.append_range(old, idx + inc, idx + 1, old.nkeys() - (idx + 1));
}

/// New internal node in which the two consecutive entries `idx` and
/// `idx + 1` collapse into one entry for the merged child.
fn node_replace_2_kid(new: &mut BNode, old: &BNode, idx: u16, ptr: u64, key: &[u8]) {
    new.set_header(NodeType::Internal, old.nkeys() - 1);
    new.append_range(old, 0, 0, idx);
    new.append_kv(idx, ptr, key, b"");
    new.append_range(old, idx + 1, idx + 2, old.nkeys() - (idx + 2));
}

/// Concatenates `left` and `right` into `new`.
fn node_merge(new: &mut BNode, left: &BNode, right: &BNode) {
    new.set_header(left.btype(), left.nkeys() + right.nkeys());
    new.append_range(left, 0, 0, left.nkeys());
    new.append_range(right, left.nkeys(), 0, right.nkeys());
}

/// Merge decision for the rebuilt child at `idx`, carrying the chosen
/// sibling out so the caller does not fetch it twice.
enum MergeDir {
    Left(BNode),
    Right(BNode),
    None,
}

/// A child merges only once it falls below a quarter page, and only if the
/// merged node fits a page. The left sibling is preferred.
fn should_merge<S: PageStore>(store: &S, node: &BNode, idx: u16, updated: &BNode) -> MergeDir {
    if updated.nbytes() > PAGE_SIZE / 4 {
        return MergeDir::None;
    }
    if idx > 0 {
        let sibling = store.page(node.get_ptr(idx - 1));
        if sibling.nbytes() + updated.nbytes() - HEADER_SIZE <= PAGE_SIZE {
            return MergeDir::Left(sibling);
        }
    }
    if idx + 1 < node.nkeys() {
        let sibling = store.page(node.get_ptr(idx + 1));
        if sibling.nbytes() + updated.nbytes() - HEADER_SIZE <= PAGE_SIZE {
            return MergeDir::Right(sibling);
        }
    }
    MergeDir::None
}

/// Rebuilds `node` without `key`, or `None` if the key is absent.
fn tree_delete<S: PageStore>(store: &mut S, node: BNode, key: &[u8]) -> Option<BNode> {
    let idx = lookup_le(&node, key);
    match node.btype() {
        NodeType::Leaf => {
            if idx >= node.nkeys() || node.get_key(idx) != key {
                return None;
            }
            let mut new = BNode::new(PAGE_SIZE);
            leaf_delete(&mut new, &node, idx);
            Some(new)
        }
        NodeType::Internal => node_delete(store, node, idx, key),
    }
}

/// Internal-node step of the delete: recurse into child `idx`, then merge
/// the shrunken child with a sibling or graft it back in place.
fn node_delete<S: PageStore>(store: &mut S, node: BNode, idx: u16, key: &[u8]) -> Option<BNode> {
    let kptr = node.get_ptr(idx);
    let kid = store.page(kptr);
    let updated = tree_delete(store, kid, key)?;
    store.retire(kptr);

    let mut new = BNode::new(PAGE_SIZE);
    match should_merge(store, &node, idx, &updated) {
        MergeDir::Left(sibling) => {
            let mut merged = BNode::new(PAGE_SIZE);
            node_merge(&mut merged, &sibling, &updated);
            store.retire(node.get_ptr(idx - 1));
            let first_key = merged.first_key().to_vec();
            let pid = store.create(merged);
            node_replace_2_kid(&mut new, &node, idx - 1, pid, &first_key);
        }
        MergeDir::Right(sibling) => {
            let mut merged = BNode::new(PAGE_SIZE);
            node_merge(&mut merged, &updated, &sibling);
            store.retire(node.get_ptr(idx + 1));
            let first_key = merged.first_key().to_vec();
            let pid = store.create(merged);
            node_replace_2_kid(&mut new, &node, idx, pid, &first_key);
        }
        MergeDir::None => {
            node_replace_kid_n(store, &mut new, &node, idx, smallvec![updated]);
        }
    }
    Some(new)
}
