//! Shadow Atlas Layout
//!
//! A greedy guillotine packer for square-ish tiles inside a fixed-size
//! texture. Nodes form a binary tree stored in a flat arena; each leaf is
//! either free or holds exactly one element.
//!
//! Insertion walks the tree depth first. A free leaf that fits the element
//! exactly is claimed; a larger free leaf is split in two along the axis
//! with the larger excess and the element goes into the first half.

#[derive(Debug, Clone, Copy)]
struct LayoutNode {
    min_x: u32,
    min_y: u32,
    size_x: u32,
    size_y: u32,
    children: Option<(usize, usize)>,
    used: bool,
}

impl LayoutNode {
    const fn new(min_x: u32, min_y: u32, size_x: u32, size_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            size_x,
            size_y,
            children: None,
            used: false,
        }
    }
}

/// 2D bin packer over a `max_size_x × max_size_y` area.
#[derive(Debug, Clone)]
pub struct TextureLayout {
    min_size_x: u32,
    min_size_y: u32,
    max_size_x: u32,
    max_size_y: u32,
    nodes: Vec<LayoutNode>,
}

impl TextureLayout {
    /// Creates an empty layout. Element sizes are rounded up to multiples
    /// of `min_size_x` / `min_size_y`.
    #[must_use]
    pub fn new(min_size_x: u32, min_size_y: u32, max_size_x: u32, max_size_y: u32) -> Self {
        Self {
            min_size_x: min_size_x.max(1),
            min_size_y: min_size_y.max(1),
            max_size_x,
            max_size_y,
            nodes: vec![LayoutNode::new(0, 0, max_size_x, max_size_y)],
        }
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.max_size_x, self.max_size_y)
    }

    /// Reserves a `size_x × size_y` rectangle, returning its top-left corner.
    /// `None` when no free region is large enough.
    pub fn add_element(&mut self, size_x: u32, size_y: u32) -> Option<(u32, u32)> {
        if size_x == 0 || size_y == 0 {
            return None;
        }
        let size_x = size_x.div_ceil(self.min_size_x) * self.min_size_x;
        let size_y = size_y.div_ceil(self.min_size_y) * self.min_size_y;

        let node = self.add_surface(0, size_x, size_y)?;
        let node = &self.nodes[node];
        Some((node.min_x, node.min_y))
    }

    fn add_surface(&mut self, index: usize, size_x: u32, size_y: u32) -> Option<usize> {
        let node = self.nodes[index];

        if let Some((a, b)) = node.children {
            return self
                .add_surface(a, size_x, size_y)
                .or_else(|| self.add_surface(b, size_x, size_y));
        }

        if node.used || size_x > node.size_x || size_y > node.size_y {
            return None;
        }

        if size_x == node.size_x && size_y == node.size_y {
            self.nodes[index].used = true;
            return Some(index);
        }

        let excess_x = node.size_x - size_x;
        let excess_y = node.size_y - size_y;

        let (child_a, child_b) = if excess_x > excess_y {
            (
                LayoutNode::new(node.min_x, node.min_y, size_x, node.size_y),
                LayoutNode::new(node.min_x + size_x, node.min_y, excess_x, node.size_y),
            )
        } else {
            (
                LayoutNode::new(node.min_x, node.min_y, node.size_x, size_y),
                LayoutNode::new(node.min_x, node.min_y + size_y, node.size_x, excess_y),
            )
        };

        let a = self.nodes.len();
        self.nodes.push(child_a);
        self.nodes.push(child_b);
        self.nodes[index].children = Some((a, a + 1));

        self.add_surface(a, size_x, size_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_claims_whole_layout() {
        let mut layout = TextureLayout::new(1, 1, 64, 64);
        assert_eq!(layout.add_element(64, 64), Some((0, 0)));
        assert_eq!(layout.add_element(1, 1), None);
    }

    #[test]
    fn split_follows_larger_excess() {
        let mut layout = TextureLayout::new(1, 1, 100, 40);
        // Excess x = 80 > excess y = 20: the first child is the left column.
        assert_eq!(layout.add_element(20, 20), Some((0, 0)));
        assert_eq!(layout.add_element(20, 20), Some((0, 20)));
        assert_eq!(layout.add_element(20, 20), Some((20, 0)));
    }

    #[test]
    fn zero_sized_elements_are_rejected() {
        let mut layout = TextureLayout::new(1, 1, 16, 16);
        assert_eq!(layout.add_element(0, 4), None);
    }
}
