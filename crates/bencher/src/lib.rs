#[derive(Debug, Copy, Clone)]
pub struct StackCase {
    name: &'static str,
    depth: usize,
    shape: StackShape,
}

impl StackCase {
    pub const fn new(name: &'static str, depth: usize, shape: StackShape) -> Self {
        Self { name, depth, shape }
    }

    pub const fn direct(name: &'static str, depth: usize) -> Self {
        Self::new(name, depth, StackShape::Direct)
    }

    pub const fn queued(name: &'static str, depth: usize) -> Self {
        Self::new(name, depth, StackShape::Queued)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn shape(&self) -> StackShape {
        self.shape
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackShape {
    Direct,
    Queued,
}
