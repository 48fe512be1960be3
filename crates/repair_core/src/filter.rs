//! Allowance filters shared by the damaged-item and ingredient searches.

use crate::{GameContent, ItemState, ThingCategory, ThingDefId, ThingFilter};

impl ThingFilter {
    /// Allows every category.
    pub fn allow_all() -> Self {
        Self {
            categories: [
                ThingCategory::Weapon,
                ThingCategory::Apparel,
                ThingCategory::Item,
                ThingCategory::Resource,
                ThingCategory::Unfinished,
            ]
            .into_iter()
            .collect(),
            ..Self::default()
        }
    }

    /// Default target filter for a repair station: weapons, apparel and
    /// general items. Unfinished things are never offered for repair.
    pub fn repairable_goods() -> Self {
        Self {
            categories: [
                ThingCategory::Weapon,
                ThingCategory::Apparel,
                ThingCategory::Item,
            ]
            .into_iter()
            .collect(),
            ..Self::default()
        }
    }

    pub fn allows_def(&self, def: &ThingDefId, category: ThingCategory) -> bool {
        if self.denied.contains(def) {
            return false;
        }
        self.categories.contains(&category) || self.defs.contains(def)
    }

    /// False for items whose def is unknown to content.
    pub fn allows(&self, item: &ItemState, content: &GameContent) -> bool {
        content
            .def(&item.def)
            .is_some_and(|def| self.allows_def(&item.def, def.category))
    }

    pub fn clear(&mut self) {
        self.categories.clear();
        self.defs.clear();
        self.denied.clear();
    }
}
