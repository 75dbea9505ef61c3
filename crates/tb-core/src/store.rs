//! Two-level annotation store: image → annotation id → annotation.
//!
//! Per-image maps are created lazily and live for the whole session, so
//! switching images never drops work. Insertion order is tracked alongside
//! the map so exports and snapshots are deterministic.

use crate::id::{AnnotationId, ImageKey};
use crate::model::Annotation;
use crate::transform::Point;
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

/// Annotations of a single image.
#[derive(Debug, Clone, Default)]
pub struct ImageAnnotations {
    order: Vec<AnnotationId>,
    by_id: HashMap<AnnotationId, Annotation>,
}

impl ImageAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.by_id.get_mut(&id)
    }

    /// Annotations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn ids(&self) -> &[AnnotationId] {
        &self.order
    }

    /// Insert an annotation keyed by its id.
    ///
    /// # Panics
    ///
    /// Panics if the id is already present. Ids are generated fresh on
    /// construction, so a collision means an annotation was inserted twice.
    pub fn insert(&mut self, annotation: Annotation) {
        let id = annotation.id();
        assert!(
            !self.by_id.contains_key(&id),
            "annotation id collision: {id} is already stored"
        );
        self.order.push(id);
        self.by_id.insert(id, annotation);
    }

    /// Remove an annotation and scrub every edge pointing at it.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.by_id.remove(&id)?;
        self.order.retain(|other| *other != id);
        for annotation in self.by_id.values_mut() {
            annotation.remove_association(id);
        }
        Some(removed)
    }

    /// Ids of every annotation whose bounds contain `p` (all of them, not
    /// just the topmost), in insertion order.
    pub fn hits_at(&self, p: Point) -> Vec<AnnotationId> {
        self.iter()
            .filter(|a| a.contains(p))
            .map(|a| a.id())
            .collect()
    }

    /// Link `a` and `b` in both directions. Returns `true` if either half of
    /// the edge was new. Unknown ids and self-links are ignored.
    pub fn associate(&mut self, a: AnnotationId, b: AnnotationId) -> bool {
        if a == b || !self.contains(a) || !self.contains(b) {
            return false;
        }
        let mut changed = false;
        if let Some(ann) = self.by_id.get_mut(&a) {
            changed |= ann.add_association(b);
        }
        if let Some(ann) = self.by_id.get_mut(&b) {
            changed |= ann.add_association(a);
        }
        changed
    }

    /// Remove the edge between `a` and `b` in both directions.
    pub fn dissociate(&mut self, a: AnnotationId, b: AnnotationId) -> bool {
        let mut changed = false;
        if let Some(ann) = self.by_id.get_mut(&a) {
            changed |= ann.remove_association(b);
        }
        if let Some(ann) = self.by_id.get_mut(&b) {
            changed |= ann.remove_association(a);
        }
        changed
    }

    /// Remove every edge touching `id`.
    pub fn dissociate_all(&mut self, id: AnnotationId) -> bool {
        let linked = match self.by_id.get(&id) {
            Some(a) => a.associations.clone(),
            None => return false,
        };
        let mut changed = false;
        for other in linked {
            changed |= self.dissociate(id, other);
        }
        changed
    }

    /// Connected components of the association graph with at least two
    /// members. Groups and their members follow insertion order.
    pub fn association_groups(&self) -> Vec<Vec<AnnotationId>> {
        let index: HashMap<AnnotationId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let mut sets = UnionFind::<usize>::new(self.order.len());
        for (i, id) in self.order.iter().enumerate() {
            let Some(annotation) = self.by_id.get(id) else {
                continue;
            };
            for other in &annotation.associations {
                if let Some(&j) = index.get(other) {
                    sets.union(i, j);
                }
            }
        }
        let labels = sets.into_labeling();

        let mut groups: Vec<Vec<AnnotationId>> = Vec::new();
        let mut slot_of_label: HashMap<usize, usize> = HashMap::new();
        for (i, id) in self.order.iter().enumerate() {
            let slot = *slot_of_label.entry(labels[i]).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(*id);
        }
        groups.retain(|g| g.len() > 1);
        groups
    }
}

/// All annotations of the session, grouped by image.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    image_order: Vec<ImageKey>,
    images: HashMap<ImageKey, ImageAnnotations>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the sub-map for `key`, creating it on first use.
    pub fn ensure_image(&mut self, key: ImageKey) -> &mut ImageAnnotations {
        if !self.images.contains_key(&key) {
            log::debug!("store: created annotation map for {key}");
            self.image_order.push(key);
        }
        self.images.entry(key).or_default()
    }

    pub fn image(&self, key: ImageKey) -> Option<&ImageAnnotations> {
        self.images.get(&key)
    }

    pub fn image_mut(&mut self, key: ImageKey) -> Option<&mut ImageAnnotations> {
        self.images.get_mut(&key)
    }

    /// Images in the order they were first opened.
    pub fn images(&self) -> impl Iterator<Item = (ImageKey, &ImageAnnotations)> + '_ {
        self.image_order
            .iter()
            .filter_map(|key| self.images.get(key).map(|anns| (*key, anns)))
    }

    pub fn image_count(&self) -> usize {
        self.image_order.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.images.values().map(ImageAnnotations::len).sum()
    }
}
