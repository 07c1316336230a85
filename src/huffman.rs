use crate::error::{decompression, Result};

enum Node<V> {
    Empty,
    Value(V),
    Branch(Box<[Node<V>; 2]>),
}

/// A prefix-code decoder built by repeated insertion of `(length, code, value)`
/// triples, as a binary tree rather than a canonical-code lookup table: the
/// spec only requires that insertion order be arbitrary and that collisions
/// (two codes sharing a prefix, or a longer code running into an existing
/// shorter leaf) be rejected.
pub struct HuffmanTree<V> {
    root: Node<V>,
}

impl<V> Default for HuffmanTree<V> {
    fn default() -> Self {
        HuffmanTree { root: Node::Empty }
    }
}

impl<V> HuffmanTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `value` at the node reached by interpreting `code`'s `length`
    /// bits from the root, most significant bit first (bit 0 of the path is
    /// the root's first branch).
    pub fn insert(&mut self, length: u32, code: u32, value: V) -> Result<()> {
        if length == 0 {
            return Err(decompression("huffman insert: zero-length code"));
        }
        let mut node = &mut self.root;
        for i in (0..length).rev() {
            let bit = ((code >> i) & 1) as usize;
            match node {
                Node::Value(_) => {
                    return Err(decompression(
                        "huffman insert: code collides with a shorter existing prefix",
                    ))
                }
                Node::Empty => {
                    *node = Node::Branch(Box::new([Node::Empty, Node::Empty]));
                }
                Node::Branch(_) => {}
            }
            let Node::Branch(children) = node else {
                unreachable!()
            };
            node = &mut children[bit];
        }
        match node {
            Node::Empty => {
                *node = Node::Value(value);
                Ok(())
            }
            _ => Err(decompression(
                "huffman insert: value already present at this code",
            )),
        }
    }

    /// Walks the tree from the root, calling `read_bit` for each edge, and
    /// returns the first value reached.
    pub fn decode(&self, mut read_bit: impl FnMut() -> Result<bool>) -> Result<&V> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Value(v) => return Ok(v),
                Node::Empty => return Err(decompression("huffman decode: walked into empty node")),
                Node::Branch(children) => {
                    let bit = read_bit()? as usize;
                    node = &children[bit];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn decodes_simple_codes() {
        let mut tree = HuffmanTree::new();
        tree.insert(1, 0b0, 'a').unwrap();
        tree.insert(2, 0b10, 'b').unwrap();
        tree.insert(2, 0b11, 'c').unwrap();

        let bits = [false, true, false, true, true];
        let mut idx = 0;
        let mut next = || {
            let b = bits[idx];
            idx += 1;
            Ok(b)
        };
        assert_eq!(*tree.decode(&mut next).unwrap(), 'a');
        assert_eq!(*tree.decode(&mut next).unwrap(), 'b');
        assert_eq!(*tree.decode(&mut next).unwrap(), 'c');
    }

    #[test_log::test]
    fn rejects_prefix_collision() {
        let mut tree = HuffmanTree::new();
        tree.insert(1, 0b0, 'a').unwrap();
        assert!(tree.insert(2, 0b00, 'b').is_err());
    }

    #[test_log::test]
    fn rejects_duplicate_code() {
        let mut tree = HuffmanTree::new();
        tree.insert(2, 0b01, 'a').unwrap();
        assert!(tree.insert(2, 0b01, 'b').is_err());
    }

    #[test_log::test]
    fn decode_fails_on_incomplete_tree() {
        let mut tree = HuffmanTree::<char>::new();
        tree.insert(2, 0b00, 'a').unwrap();
        let mut bits = [true, false].into_iter();
        let err = tree.decode(|| Ok(bits.next().unwrap()));
        assert!(err.is_err());
    }
}
