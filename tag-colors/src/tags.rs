//! Tag path normalization and the sibling order registry.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::resolver::SiblingOrders;

/// Canonical form of a tag path: no `#`, no whitespace, no empty segments,
/// lowercase. Returns `None` when nothing is left.
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| *ch != '#' && !ch.is_whitespace())
        .collect();

    let normalized = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
        .to_lowercase();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Wrap any index, negative ones included, into `0..len`.
pub fn normalize_palette_index(index: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.rem_euclid(len as i64) as usize
}

fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn depth_of(path: &str) -> usize {
    path.split('/').count()
}

/// Every known tag path (ancestors included) with its 1-based rank among the
/// siblings under the same parent, plus the set of tags already rendered.
///
/// Ranks are handed out on first sight and never change afterwards.
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    orders: BTreeMap<String, u32>,
    rendered: HashSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a previously exported order map.
    ///
    /// Stored keys may carry their display case, so they are normalized on
    /// the way in. Keys that collapse into one keep the smallest order; keys
    /// that normalize to nothing are dropped.
    pub fn from_known_tags(known: BTreeMap<String, u32>) -> Self {
        let mut orders = BTreeMap::new();
        for (tag, order) in known {
            let Some(tag) = normalize_tag_name(&tag) else {
                continue;
            };
            orders
                .entry(tag)
                .and_modify(|kept: &mut u32| *kept = (*kept).min(order))
                .or_insert(order);
        }

        Self {
            orders,
            rendered: HashSet::new(),
        }
    }

    pub fn order_of(&self, tag_path: &str) -> Option<u32> {
        self.orders.get(tag_path).copied()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.orders
            .iter()
            .map(|(path, order)| (path.as_str(), *order))
    }

    /// Register freshly observed tags. Returns `true` if any path was new.
    ///
    /// New paths are processed shallowest first, then lexicographically, so
    /// the ranks they receive do not depend on the order of `tags`.
    pub fn update_known_tags<I, S>(&mut self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut observed: Vec<String> = tags
            .into_iter()
            .filter_map(|tag| normalize_tag_name(tag.as_ref()))
            .collect();
        observed.sort_by(|a, b| depth_of(a).cmp(&depth_of(b)).then_with(|| a.cmp(b)));
        observed.dedup();

        let before = self.orders.len();
        for tag in &observed {
            self.register_path(tag);
        }

        let added = self.orders.len() - before;
        if added > 0 {
            debug!(added, total = self.orders.len(), "registered new tag paths");
        }
        added > 0
    }

    fn register_path(&mut self, tag: &str) {
        let mut end = 0;
        for segment in tag.split('/') {
            end += segment.len();
            let key = &tag[..end];
            if !self.orders.contains_key(key) {
                let order = self.next_sibling_order(parent_of(key));
                self.orders.insert(key.to_string(), order);
            }
            // skip the separator
            end += 1;
        }
    }

    fn next_sibling_order(&self, parent: Option<&str>) -> u32 {
        self.orders
            .iter()
            .filter(|(path, _)| parent_of(path) == parent)
            .map(|(_, order)| *order)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Record that `tag` has styles. Returns `false` if it already had.
    pub fn mark_rendered(&mut self, tag: &str) -> bool {
        self.rendered.insert(tag.to_string())
    }

    pub fn is_rendered(&self, tag: &str) -> bool {
        self.rendered.contains(tag)
    }

    pub fn clear_rendered(&mut self) {
        self.rendered.clear();
    }

    pub fn export_known_tags(&self) -> BTreeMap<String, u32> {
        self.orders.clone()
    }
}

impl SiblingOrders for TagRegistry {
    fn order_of(&self, tag_path: &str) -> Option<u32> {
        TagRegistry::order_of(self, tag_path)
    }
}
