use crate::compile::tree::{Block, Statement};

/// A compiled [`Template`] that can be rendered with a `Store`.
///
/// A `Template` owns its source text and is immutable, so it can be shared
/// between threads behind an `Arc` and rendered concurrently.
#[derive(Debug, Clone)]
pub struct Template {
    /// The name of the [`Template`].
    name: Option<String>,
    /// The source text from which this [`Template`] was generated.
    source: String,
    /// The statements generated during compilation.
    block: Block,
}

impl Template {
    /// Create a new [`Template`].
    pub(crate) fn new(name: Option<String>, source: String, block: Block) -> Self {
        Self {
            name,
            source,
            block,
        }
    }

    /// Return the name of the [`Template`].
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the source text of the [`Template`].
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Return the top level statements of the [`Template`].
    #[inline]
    pub fn block(&self) -> &[Statement] {
        &self.block
    }
}
