//! Arena-indexed disjoint-set forest tracking component size and
//! internal difference.
//!
//! Components are addressed by `u32` index into flat `parent`, `size`,
//! and `internal_diff` arrays. Only the entries of root indices carry
//! meaningful `size` and `internal_diff` values.

/// Union-find over `len` singleton components.
#[derive(Debug, Clone)]
pub struct DisjointForest {
    parent: Vec<u32>,
    size: Vec<u32>,
    internal_diff: Vec<f32>,
    components: usize,
}

impl DisjointForest {
    /// Create `len` singleton components with `size = 1` and
    /// `internal_diff = 0`.
    ///
    /// `len` must fit in `u32`; the segmenter rejects larger images
    /// before building a forest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
            size: vec![1; len],
            internal_diff: vec![0.0; len],
            components: len,
        }
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether the forest has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Number of distinct components.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.components
    }

    /// Root of the component containing `x`, compressing the path
    /// walked so later lookups are O(1).
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut node = x;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    /// Pixel count of the component rooted at `root`.
    #[must_use]
    pub fn size(&self, root: u32) -> u32 {
        self.size[root as usize]
    }

    /// Largest edge weight merged into the component rooted at `root`.
    #[must_use]
    pub fn internal_diff(&self, root: u32) -> f32 {
        self.internal_diff[root as usize]
    }

    /// Merge the components rooted at `a` and `b`, recording `weight` as
    /// the merged component's internal difference. The smaller component
    /// is attached under the larger; on equal sizes `a` becomes the
    /// root. Returns the new root.
    ///
    /// Both arguments must be distinct roots.
    pub fn union(&mut self, a: u32, b: u32, weight: f32) -> u32 {
        debug_assert_ne!(a, b, "union of a component with itself");
        let (root, child) = if self.size[a as usize] >= self.size[b as usize] {
            (a, b)
        } else {
            (b, a)
        };
        self.parent[child as usize] = root;
        self.size[root as usize] += self.size[child as usize];
        self.internal_diff[root as usize] = weight;
        self.components -= 1;
        root
    }
}
