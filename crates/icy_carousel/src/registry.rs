//! Explicit table of live carousels, shared by reference between the
//! carousels of one host.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::carousel::{Carousel, CarouselInner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarouselId(u64);

impl fmt::Display for CarouselId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "carousel-{}", self.0)
    }
}

/// Holds weak references only; a dropped carousel disappears on its own
#[derive(Default)]
pub struct CarouselRegistry {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<CarouselId, Weak<CarouselInner>>>,
}

impl CarouselRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, carousel: &Carousel) -> CarouselId {
        let id = CarouselId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.entries.lock().insert(id, carousel.downgrade());
        id
    }

    pub fn unregister(&self, id: CarouselId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    pub fn get(&self, id: CarouselId) -> Option<Carousel> {
        self.entries.lock().get(&id).and_then(Carousel::upgrade)
    }

    /// Live carousels; entries of dropped carousels are pruned
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<CarouselId> {
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.keys().copied().collect()
    }
}
