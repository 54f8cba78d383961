//! Slicing helpers for synthetic paginated backends.

/// Items of a 1-based page number.
pub fn page_of<T: Clone>(items: &[T], page: u32, size: usize) -> Vec<T> {
    let start = (page.saturating_sub(1) as usize).saturating_mul(size);

    items.iter().skip(start).take(size).cloned().collect()
}

/// Items after an offset cursor, plus the next cursor when more remain.
pub fn cursor_page<T: Clone>(items: &[T], cursor: Option<&str>, size: usize) -> (Vec<T>, Option<String>) {
    let start = cursor.and_then(|x| x.parse::<usize>().ok()).unwrap_or_default();
    let end = (start + size).min(items.len());

    let page = items.get(start..end).map(|x| x.to_vec()).unwrap_or_default();
    let next = (end < items.len()).then(|| end.to_string());

    (page, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_everything_once() {
        let items: Vec<u32> = (0..103).collect();

        assert_eq!(page_of(&items, 1, 100).len(), 100);
        assert_eq!(page_of(&items, 2, 100), (100..103).collect::<Vec<_>>());
        assert!(page_of(&items, 3, 100).is_empty());
    }

    #[test]
    fn cursors_run_out() {
        let items: Vec<u32> = (0..5).collect();

        let (first, next) = cursor_page(&items, None, 3);
        assert_eq!(first, vec![0, 1, 2]);

        let (second, next) = cursor_page(&items, next.as_deref(), 3);
        assert_eq!(second, vec![3, 4]);
        assert_eq!(next, None);
    }
}
