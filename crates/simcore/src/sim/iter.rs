use crate::world::SimEntity;

/// Lazy walk over the live entities of a region's dense array.
///
/// Deleted entities are skipped even before the region is reconciled. A clone
/// resumes from the current position; call [`SimRegion::iter`] again to start
/// over.
///
/// [`SimRegion::iter`]: super::SimRegion::iter
#[derive(Debug, Clone)]
pub struct EntityIter<'a> {
    entities: &'a [SimEntity],
    index: usize,
}

impl<'a> EntityIter<'a> {
    pub(crate) fn new(entities: &'a [SimEntity]) -> Self {
        Self { entities, index: 0 }
    }
}

impl<'a> Iterator for EntityIter<'a> {
    type Item = &'a SimEntity;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entity) = self.entities.get(self.index) {
            self.index += 1;
            if !entity.is_deleted() {
                return Some(entity);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entities.len().saturating_sub(self.index)))
    }
}
