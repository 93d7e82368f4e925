//! Merkle authentication paths over the public commitment tree.

use anyhow::{bail, ensure, Result};
use async_trait::async_trait;
use ppool_common::{FieldElement, HashOracle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Depth of the pool's commitment tree.
pub const DEFAULT_TREE_DEPTH: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    pub root: FieldElement,
    /// Sibling at each level, leaf level first.
    pub path_elements: Vec<FieldElement>,
    /// `1` where the path node is a right child.
    pub path_indices: Vec<u8>,
}

impl MerkleProof {
    pub fn depth(&self) -> usize {
        self.path_elements.len()
    }

    pub fn is_well_formed(&self) -> bool {
        self.path_elements.len() == self.path_indices.len()
            && self.path_indices.iter().all(|bit| *bit <= 1)
    }

    /// Recompute the root from `leaf` and compare.
    pub fn verify<H: HashOracle>(&self, oracle: &H, leaf: FieldElement) -> Result<bool> {
        ensure!(self.is_well_formed(), "malformed merkle path");
        let mut node = leaf;
        for (sibling, bit) in self.path_elements.iter().zip(&self.path_indices) {
            node = if *bit == 1 {
                oracle.hash(&[*sibling, node])?
            } else {
                oracle.hash(&[node, *sibling])?
            };
        }
        Ok(node == self.root)
    }
}

/// Source of authentication paths, typically a remote indexer.
#[async_trait]
pub trait MerkleProofSource: Send + Sync {
    /// Path for `target` in the tree built from `leaves` (insertion order).
    /// Fails if `target` is not among `leaves`.
    async fn proof(&self, leaves: &[FieldElement], target: FieldElement) -> Result<MerkleProof>;
}

/// Fixed-depth binary tree computed in memory, empty slots filled with
/// zero subtrees (`z[0] = 0`, `z[i+1] = H(z[i], z[i])`).
#[derive(Clone, Debug)]
pub struct LocalMerkleTree<H> {
    oracle: H,
    depth: usize,
}

impl<H: HashOracle> LocalMerkleTree<H> {
    pub fn new(oracle: H) -> Self {
        Self::with_depth(oracle, DEFAULT_TREE_DEPTH)
    }

    pub fn with_depth(oracle: H, depth: usize) -> Self {
        Self { oracle, depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Leaves the tree can hold, or `None` when it exceeds `usize`.
    pub fn capacity(&self) -> Option<usize> {
        u32::try_from(self.depth)
            .ok()
            .and_then(|d| 1usize.checked_shl(d))
    }

    fn zero_subtrees(&self) -> Result<Vec<FieldElement>> {
        let mut zeros = Vec::with_capacity(self.depth + 1);
        let mut current = FieldElement::zero();
        zeros.push(current);
        for _ in 0..self.depth {
            current = self.oracle.hash(&[current, current])?;
            zeros.push(current);
        }
        Ok(zeros)
    }

    pub fn root(&self, leaves: &[FieldElement]) -> Result<FieldElement> {
        Ok(self.walk(leaves, None)?.0)
    }

    pub fn compute_proof(&self, leaves: &[FieldElement], target: FieldElement) -> Result<MerkleProof> {
        let Some(index) = leaves.iter().position(|leaf| *leaf == target) else {
            bail!("target leaf {} is not in the tree", target);
        };
        let (root, path) = self.walk(leaves, Some(index))?;
        let (path_elements, path_indices) = path.into_iter().unzip();
        debug!(leaf_index = index, depth = self.depth, %root, "merkle proof computed");
        Ok(MerkleProof {
            root,
            path_elements,
            path_indices,
        })
    }

    /// Hash level by level, collecting the path of `index` if given.
    fn walk(
        &self,
        leaves: &[FieldElement],
        mut index: Option<usize>,
    ) -> Result<(FieldElement, Vec<(FieldElement, u8)>)> {
        if let Some(capacity) = self.capacity() {
            ensure!(
                leaves.len() <= capacity,
                "{} leaves exceed tree capacity {} (depth {})",
                leaves.len(),
                capacity,
                self.depth
            );
        }
        let zeros = self.zero_subtrees()?;
        let mut level = leaves.to_vec();
        let mut path = Vec::with_capacity(self.depth);

        for zero in zeros.iter().take(self.depth) {
            if let Some(i) = index {
                let sibling = level.get(i ^ 1).copied().unwrap_or(*zero);
                path.push((sibling, (i & 1) as u8));
                index = Some(i >> 1);
            }
            level = level
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(*zero);
                    self.oracle.hash(&[pair[0], right])
                })
                .collect::<Result<Vec<_>, _>>()?;
        }

        let root = level.first().copied().unwrap_or(zeros[self.depth]);
        Ok((root, path))
    }
}

#[async_trait]
impl<H: HashOracle + Send + Sync> MerkleProofSource for LocalMerkleTree<H> {
    async fn proof(&self, leaves: &[FieldElement], target: FieldElement) -> Result<MerkleProof> {
        self.compute_proof(leaves, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppool_common::PoseidonOracle;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn h(a: FieldElement, b: FieldElement) -> FieldElement {
        PoseidonOracle.hash(&[a, b]).unwrap()
    }

    #[test]
    fn two_level_tree_by_hand() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 2);
        let leaves = [fe(1), fe(2), fe(3)];
        let z0 = FieldElement::zero();
        let expected_root = h(h(fe(1), fe(2)), h(fe(3), z0));
        assert_eq!(tree.root(&leaves).unwrap(), expected_root);

        let proof = tree.compute_proof(&leaves, fe(3)).unwrap();
        assert_eq!(proof.root, expected_root);
        assert_eq!(proof.path_elements, vec![z0, h(fe(1), fe(2))]);
        assert_eq!(proof.path_indices, vec![0, 1]);
        assert!(proof.verify(&PoseidonOracle, fe(3)).unwrap());
        assert!(!proof.verify(&PoseidonOracle, fe(4)).unwrap());
    }

    #[test]
    fn every_leaf_verifies() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 4);
        let leaves: Vec<_> = (10..17).map(fe).collect();
        let root = tree.root(&leaves).unwrap();
        for leaf in &leaves {
            let proof = tree.compute_proof(&leaves, *leaf).unwrap();
            assert_eq!(proof.depth(), 4);
            assert_eq!(proof.root, root);
            assert!(proof.verify(&PoseidonOracle, *leaf).unwrap());
        }
    }

    #[test]
    fn empty_tree_root_is_top_zero_subtree() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 3);
        let z1 = h(FieldElement::zero(), FieldElement::zero());
        let z2 = h(z1, z1);
        assert_eq!(tree.root(&[]).unwrap(), h(z2, z2));
    }

    #[test]
    fn missing_target_fails() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 2);
        assert!(tree.compute_proof(&[fe(1)], fe(2)).is_err());
    }

    #[test]
    fn capacity_is_enforced() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 1);
        let err = tree.compute_proof(&[fe(1), fe(2), fe(3)], fe(1)).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[tokio::test]
    async fn async_source_matches_sync_path() {
        let tree = LocalMerkleTree::with_depth(PoseidonOracle, 3);
        let leaves = [fe(5), fe(6)];
        let source: &dyn MerkleProofSource = &tree;
        let proof = source.proof(&leaves, fe(6)).await.unwrap();
        assert_eq!(proof, tree.compute_proof(&leaves, fe(6)).unwrap());
    }
}
