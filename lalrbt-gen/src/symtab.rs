use indexmap::IndexSet;

/// Interned names in insertion order.
#[derive(Default, Debug, Clone)]
pub struct Symtab {
    names: IndexSet<String>,
}

impl Symtab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `sym`, returning its index.
    pub fn add(&mut self, sym: &str) -> usize {
        if let Some(idx) = self.names.get_index_of(sym) {
            return idx;
        }
        self.names.insert_full(sym.to_owned()).0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn idx(&self, sym: &str) -> Option<usize> {
        self.names.get_index_of(sym)
    }

    pub fn sym(&self, idx: usize) -> Option<&str> {
        self.names.get_index(idx).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
