/// Opaque element identifier assigned by the document store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Document version counter.
///
/// The counter changes on every committed mutation, but it is *not*
/// monotonic: undo moves it backwards. Consumers must compare versions
/// with `!=`, never `<` — "different" always means "rebuild".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DocVersion(pub u64);
