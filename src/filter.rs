//! Keyword matching over one iteration's item collection.

use crate::item::Item;

/// Returns the items whose title contains `keyword`, case-insensitively.
///
/// Order-preserving and side-effect free. Matching says nothing about
/// stock: availability gating happens at the notification boundary, not
/// here.
pub fn matching_items(items: Vec<Item>, keyword: &str) -> Vec<Item> {
    let needle = keyword.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(sku: &str, title: &str) -> Item {
        Item {
            sku: sku.into(),
            title: title.into(),
            price: None,
            stock: Default::default(),
            url_path: String::new(),
            assets: Vec::new(),
        }
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let items = vec![
            titled("1", "Kelly To Go wallet"),
            titled("2", "Birkin 25"),
            titled("3", "Mini KELLY II"),
        ];
        let matched = matching_items(items, "kelly");
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].sku, "1");
        assert_eq!(matched[1].sku, "3");
    }

    #[test]
    fn no_match_yields_empty() {
        let items = vec![titled("1", "Kelly Bag")];
        assert!(matching_items(items, "birkin").is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let items = vec![
            titled("b", "Picotin 18"),
            titled("a", "Picotin 22"),
        ];
        let matched = matching_items(items, "picotin");
        let skus: Vec<&str> = matched.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, ["b", "a"]);
    }
}
