use crate::bvh::{Bvh, NodeKind};

/// Iterator over the leaves of a [`Bvh`] in depth-first, left-to-right order.
///
/// Yields the node index of each leaf together with its slice of the primitive
/// index array. The root of an empty hierarchy is yielded as a leaf with an
/// empty slice.
pub struct Leaves<'bvh, 'a> {
    /// Reference to the [`Bvh`] to traverse
    bvh: &'bvh Bvh<'a>,
    /// Traversal stack
    stack: Vec<u32>,
}

impl<'bvh, 'a> Leaves<'bvh, 'a> {
    /// Creates a new [`Leaves`] iterator starting at the root.
    pub fn new(bvh: &'bvh Bvh<'a>) -> Self {
        Self::from_node(bvh, 0)
    }

    /// Creates a new [`Leaves`] iterator over the subtree below `node_index`.
    pub fn from_node(bvh: &'bvh Bvh<'a>, node_index: u32) -> Self {
        let mut stack = Vec::with_capacity(64);
        stack.push(node_index);
        Leaves { bvh, stack }
    }
}

impl<'bvh> Iterator for Leaves<'bvh, '_> {
    type Item = (u32, &'bvh [u32]);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node_index) = self.stack.pop() {
            match self.bvh.nodes()[node_index as usize].kind() {
                NodeKind::Interior { left, right } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
                NodeKind::Leaf { first, count } => {
                    let first = first as usize;
                    let range = &self.bvh.indices()[first..first + count as usize];
                    return Some((node_index, range));
                }
            }
        }
        None
    }
}
