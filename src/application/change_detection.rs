//! New-item detection over an ordered listing snapshot.
//!
//! Two mechanisms compose: the head cursor bounds the scan to rows that
//! are in front of the last run's newest row, and the persisted id set
//! drops anything already seen even when the listing reorders. Both
//! must agree before an item counts as new.

use std::collections::BTreeSet;

use crate::domain::{ListingItem, SiteState};

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub new_items: Vec<ListingItem>,
    /// Full replacement state for the next run.
    pub next_state: SiteState,
}

/// Prefix of `items` strictly before the row carrying `head_id`.
/// An empty or unmatched head keeps the whole list.
pub fn window_until_head<'a>(items: &'a [ListingItem], head_id: &str) -> &'a [ListingItem] {
    if head_id.is_empty() {
        return items;
    }
    match items.iter().position(|item| item.id == head_id) {
        Some(idx) => &items[..idx],
        None => items,
    }
}

/// Detect new items against the previous state and produce the state
/// to persist afterwards.
///
/// The id set is replaced, not merged: rows that fell off the listing
/// drop out of the state, so a later reappearance is reported again.
pub fn detect_new(items: &[ListingItem], prev: &SiteState) -> ChangeSet {
    let current: BTreeSet<String> = items
        .iter()
        .map(|item| item.id.clone())
        .filter(|id| !id.is_empty())
        .collect();

    let window = window_until_head(items, &prev.head_id);
    let new_items: Vec<ListingItem> = window
        .iter()
        .filter(|item| current.contains(&item.id) && !prev.ids.contains(&item.id))
        .cloned()
        .collect();

    let head_id = items
        .first()
        .map(|item| item.id.clone())
        .unwrap_or_else(|| prev.head_id.clone());

    ChangeSet {
        new_items,
        next_state: SiteState {
            ids: current,
            head_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> ListingItem {
        ListingItem::new(id, format!("item {id}"), format!("https://x/{id}"))
    }

    fn state(ids: &[&str], head: &str) -> SiteState {
        SiteState {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            head_id: head.to_string(),
        }
    }

    #[test]
    fn first_run_reports_everything() {
        let items = vec![item("c"), item("b"), item("a")];
        let change = detect_new(&items, &SiteState::default());
        assert_eq!(change.new_items, items);
        assert_eq!(change.next_state.head_id, "c");
        assert_eq!(change.next_state.ids.len(), 3);
    }

    #[test]
    fn head_cursor_bounds_the_window() {
        // Previous head "b": only the rows in front of it are candidates.
        let items = vec![item("d"), item("c"), item("b"), item("a")];
        let change = detect_new(&items, &state(&["a", "b"], "b"));
        let ids: Vec<&str> = change.new_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
        assert_eq!(change.next_state.head_id, "d");
    }

    #[test]
    fn id_set_drops_known_rows_inside_the_window() {
        // "c" moved back above the head but was already seen.
        let items = vec![item("d"), item("c"), item("b")];
        let change = detect_new(&items, &state(&["b", "c"], "b"));
        let ids: Vec<&str> = change.new_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["d"]);
    }

    #[test]
    fn missing_head_degrades_to_set_only_detection() {
        // The head row fell off the listing: scan everything, rely on ids.
        let items = vec![item("e"), item("a")];
        let change = detect_new(&items, &state(&["a", "b"], "b"));
        let ids: Vec<&str> = change.new_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["e"]);
        // State is replaced: "b" is forgotten.
        assert!(!change.next_state.ids.contains("b"));
    }

    #[test]
    fn empty_listing_keeps_previous_head() {
        let change = detect_new(&[], &state(&["a"], "a"));
        assert!(change.new_items.is_empty());
        assert_eq!(change.next_state.head_id, "a");
        assert!(change.next_state.ids.is_empty());
    }

    #[test]
    fn window_until_head_edge_cases() {
        let items = vec![item("c"), item("b"), item("a")];
        assert_eq!(window_until_head(&items, "").len(), 3);
        assert_eq!(window_until_head(&items, "c").len(), 0);
        assert_eq!(window_until_head(&items, "a").len(), 2);
        assert_eq!(window_until_head(&items, "zzz").len(), 3);
    }
}
