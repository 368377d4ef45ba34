//! Tag frequency counts and the filter button panel built from them.

use std::collections::{BTreeSet, HashMap};

use catalog_core::Book;

use crate::filter::compare_names;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Counts every tag occurrence across `books`, most frequent first with ties
/// in alphabetical order.
pub fn count_tags<'a>(books: impl IntoIterator<Item = &'a Book>) -> Vec<TagCount> {
    let mut by_name: HashMap<&'a str, usize> = HashMap::new();
    for book in books {
        for tag in &book.tags {
            if tag.is_empty() {
                continue;
            }
            *by_name.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut out: Vec<TagCount> = by_name
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| compare_names(&a.tag, &b.tag))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagButton {
    pub tag: String,
    pub count: usize,
    pub active: bool,
    pub disabled: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPanel {
    pub buttons: Vec<TagButton>,
    /// More tags exist than fit before the "show more" toggle.
    pub has_more: bool,
    pub expanded: bool,
}

impl TagPanel {
    pub fn shown(&self) -> impl Iterator<Item = &TagButton> {
        self.buttons.iter().filter(|button| !button.hidden)
    }

    pub fn find(&self, tag: &str) -> Option<&TagButton> {
        self.buttons.iter().find(|button| button.tag == tag)
    }
}

/// Lays out one button per tag in `ranking` (the full-catalog order), with the
/// count taken from `population`. Tags absent from `population` stay listed but
/// disabled, unless already active so they can still be switched off.
pub fn tag_panel(
    ranking: &[TagCount],
    population: &[TagCount],
    active: &BTreeSet<String>,
    max_visible: usize,
    expanded: bool,
) -> TagPanel {
    let counts: HashMap<&str, usize> = population
        .iter()
        .map(|entry| (entry.tag.as_str(), entry.count))
        .collect();

    let buttons = ranking
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            let count = counts.get(entry.tag.as_str()).copied().unwrap_or(0);
            let is_active = active.contains(&entry.tag);
            TagButton {
                tag: entry.tag.clone(),
                count,
                active: is_active,
                disabled: count == 0 && !is_active,
                hidden: !expanded && rank >= max_visible && !is_active,
            }
        })
        .collect();

    TagPanel {
        buttons,
        has_more: ranking.len() > max_visible,
        expanded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(name: &str, tags: &[&str]) -> Book {
        Book {
            name: name.to_string(),
            release_year: "2000".to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image: String::new(),
            link: String::new(),
        }
    }

    fn pairs(counts: &[TagCount]) -> Vec<(&str, usize)> {
        counts.iter().map(|c| (c.tag.as_str(), c.count)).collect()
    }

    #[test]
    fn counts_sort_by_frequency_then_name() {
        let books = [
            book("A", &["romance", "drama"]),
            book("B", &["drama", "aventura"]),
            book("C", &["romance", "drama"]),
            book("D", &["biografia"]),
        ];
        let counts = count_tags(&books);
        assert_eq!(
            pairs(&counts),
            vec![
                ("drama", 3),
                ("romance", 2),
                ("aventura", 1),
                ("biografia", 1)
            ]
        );
    }

    #[test]
    fn duplicate_tags_count_each_occurrence() {
        let books = [book("A", &["x", "x", ""])];
        assert_eq!(pairs(&count_tags(&books)), vec![("x", 2)]);
    }

    #[test]
    fn counts_cover_every_tagged_book() {
        let books = [
            book("A", &["x", "y"]),
            book("B", &["y"]),
            book("C", &["z"]),
        ];
        let total: usize = count_tags(&books).iter().map(|c| c.count).sum();
        assert!(total >= books.len());
    }

    #[test]
    fn panel_disables_tags_missing_from_population() {
        let all = [book("A", &["x"]), book("B", &["y"])];
        let ranking = count_tags(&all);
        let population = count_tags(&all[..1]);
        let panel = tag_panel(&ranking, &population, &BTreeSet::new(), 10, false);
        assert_eq!(panel.find("x").map(|b| (b.count, b.disabled)), Some((1, false)));
        assert_eq!(panel.find("y").map(|b| (b.count, b.disabled)), Some((0, true)));
        assert!(!panel.has_more);
    }

    #[test]
    fn active_tag_stays_enabled_with_zero_count() {
        let all = [book("A", &["x"]), book("B", &["y"])];
        let ranking = count_tags(&all);
        let active: BTreeSet<String> = ["y".to_string()].into_iter().collect();
        let panel = tag_panel(&ranking, &[], &active, 10, false);
        let y = panel.find("y").unwrap();
        assert!(y.active);
        assert!(!y.disabled);
    }

    #[test]
    fn panel_hides_low_rank_tags_until_expanded() {
        let all = [book("A", &["a", "b", "c", "d"])];
        let ranking = count_tags(&all);
        let active: BTreeSet<String> = ["d".to_string()].into_iter().collect();

        let collapsed = tag_panel(&ranking, &ranking, &active, 2, false);
        assert!(collapsed.has_more);
        let shown: Vec<&str> = collapsed.shown().map(|b| b.tag.as_str()).collect();
        assert_eq!(shown, vec!["a", "b", "d"]);

        let expanded = tag_panel(&ranking, &ranking, &active, 2, true);
        assert_eq!(expanded.shown().count(), 4);
    }
}
