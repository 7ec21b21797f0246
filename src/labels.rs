use std::collections::HashMap;

/// Monotonic counters for unique label generation, keyed by an arbitrary
/// string (a statement kind, a comparison mnemonic, a function name).
///
/// Both code-generating stages use one: the compilation engine resets its
/// allocator per subroutine for `IF_*`/`WHILE_*` labels, the VM translator
/// keeps its allocators live for the whole translation unit.
#[derive(Default)]
pub struct LabelAllocator {
    counters: HashMap<String, u32>,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index for `key`, post-incrementing the counter.
    pub fn next_index(&mut self, key: &str) -> u32 {
        let counter = self.counters.entry(key.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }

    /// Reset every counter to zero.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
