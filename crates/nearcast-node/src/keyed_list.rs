use nearcast_core::PeerId;

/// Element that exposes the key it is looked up by.
pub trait Keyed {
    type Key: PartialEq;

    fn key(&self) -> &Self::Key;
}

impl Keyed for PeerId {
    type Key = PeerId;

    fn key(&self) -> &PeerId {
        self
    }
}

/// Insertion-ordered collection holding at most one element per key.
///
/// Lookups are linear; the lists this backs (subscribers of one service,
/// reachable devices, managed services) stay small on a proximity network.
#[derive(Debug, Clone)]
pub struct KeyedList<E> {
    entries: Vec<E>,
}

impl<E> Default for KeyedList<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Keyed> KeyedList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &E::Key) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }

    /// Appends `element` unless an element with the same key exists.
    /// Returns true when inserted.
    pub fn insert_if_absent(&mut self, element: E) -> bool {
        if self.contains(element.key()) {
            return false;
        }
        self.entries.push(element);
        true
    }

    pub fn find(&self, key: &E::Key) -> Option<&E> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn find_mut(&mut self, key: &E::Key) -> Option<&mut E> {
        self.entries.iter_mut().find(|e| e.key() == key)
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.position(key).is_some()
    }

    /// Removes and returns the element for `key`, keeping the order of the rest.
    pub fn take(&mut self, key: &E::Key) -> Option<E> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx))
    }

    /// Removes the element for `key` and drops it. Returns true when found.
    pub fn remove(&mut self, key: &E::Key) -> bool {
        self.take(key).is_some()
    }

    /// Removes the element for `key` and hands it to `dispose`.
    ///
    /// `dispose` runs at most once, and only when the key was present.
    pub fn remove_with<F>(&mut self, key: &E::Key, dispose: F) -> bool
    where
        F: FnOnce(E),
    {
        match self.take(key) {
            Some(element) => {
                dispose(element);
                true
            }
            None => false,
        }
    }

    /// Keeps only elements for which `keep` returns true.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&E) -> bool,
    {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }
}

impl<'a, E: Keyed> IntoIterator for &'a KeyedList<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
