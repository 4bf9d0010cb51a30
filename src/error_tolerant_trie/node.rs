use std::collections::BTreeMap;

/// A node of the trie, one per distinct prefix.
///
/// A node is terminal iff its count is positive.
#[derive(Debug)]
pub(super) struct TrieNode<Payload> {
    /// `None` only for the root, which represents the empty prefix.
    pub(super) character: Option<u8>,
    pub(super) count: usize,
    pub(super) payload: Option<Payload>,
    pub(super) children: BTreeMap<u8, TrieNode<Payload>>,
}

impl<Payload> TrieNode<Payload> {
    pub(super) fn root() -> Self {
        Self {
            character: None,
            count: 0,
            payload: None,
            children: Default::default(),
        }
    }

    fn new(character: u8) -> Self {
        Self {
            character: Some(character),
            ..Self::root()
        }
    }

    pub(super) fn is_terminal(&self) -> bool {
        self.count > 0
    }

    pub(super) fn child_or_insert(&mut self, character: u8) -> &mut Self {
        self.children
            .entry(character)
            .or_insert_with(|| Self::new(character))
    }

    pub(super) fn descendant(&self, path: &[u8]) -> Option<&Self> {
        path.iter()
            .try_fold(self, |node, character| node.children.get(character))
    }

    pub(super) fn descendant_mut(&mut self, path: &[u8]) -> Option<&mut Self> {
        path.iter()
            .try_fold(self, |node, character| node.children.get_mut(character))
    }

    /// Calls `visit` with the full path of every terminal node below and including `self`.
    pub(super) fn for_each_terminal(&self, path: &mut Vec<u8>, visit: &mut impl FnMut(&[u8], &Self)) {
        if self.is_terminal() {
            visit(path, self);
        }

        for child in self.children.values() {
            path.extend(child.character);
            child.for_each_terminal(path, visit);
            path.pop();
        }
    }
}
