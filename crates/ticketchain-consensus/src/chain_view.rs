//! Read-only traversal of a block tree.

use crate::header::Header;
use std::fmt::Debug;

/// Ancestor access needed by the difficulty computations.
///
/// `Node` is a cheap handle into whatever structure owns the headers.
pub trait ChainView {
    type Node: Copy + Eq + Debug;

    fn header(&self, node: Self::Node) -> &Header;

    /// Parent of `node`, `None` for genesis.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn height(&self, node: Self::Node) -> i64 {
        self.header(node).height as i64
    }

    /// Ancestor of `node` at `height`, `None` when out of range.
    fn ancestor(&self, node: Self::Node, height: i64) -> Option<Self::Node> {
        if height < 0 || height > self.height(node) {
            return None;
        }
        let mut current = node;
        while self.height(current) > height {
            current = self.parent(current)?;
        }
        Some(current)
    }
}

/// A linear chain stored by height, genesis first. Handles are indices.
impl ChainView for [Header] {
    type Node = usize;

    fn header(&self, node: usize) -> &Header {
        &self[node]
    }

    fn parent(&self, node: usize) -> Option<usize> {
        node.checked_sub(1)
    }

    fn height(&self, node: usize) -> i64 {
        node as i64
    }

    fn ancestor(&self, node: usize, height: i64) -> Option<usize> {
        (0..=node as i64).contains(&height).then_some(height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: u32) -> Vec<Header> {
        (0..len)
            .map(|height| Header {
                height,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_slice_view() {
        let headers = chain(10);
        let view: &[Header] = &headers;
        assert_eq!(view.parent(0), None);
        assert_eq!(view.parent(4), Some(3));
        assert_eq!(view.ancestor(9, 2), Some(2));
        assert_eq!(view.ancestor(3, 4), None);
        assert_eq!(view.ancestor(3, -1), None);
    }

    struct Walk<'a>(&'a [Header]);

    impl ChainView for Walk<'_> {
        type Node = usize;

        fn header(&self, node: usize) -> &Header {
            &self.0[node]
        }

        fn parent(&self, node: usize) -> Option<usize> {
            node.checked_sub(1)
        }
    }

    #[test]
    fn test_default_ancestor_walks_parents() {
        let headers = chain(6);
        let walk = Walk(&headers);
        assert_eq!(walk.ancestor(5, 0), Some(0));
        assert_eq!(walk.ancestor(5, 5), Some(5));
        assert_eq!(walk.ancestor(2, 3), None);
    }
}
