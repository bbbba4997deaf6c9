//! Pagination utilities for group listings
//!
//! Clients page through their groups with an `offset` and `count`. Both must
//! be given for slicing to happen; with either one missing the full list is
//! returned. Out-of-range offsets yield an empty page, never an error.

/// Slice `items` to the requested page
///
/// # Examples
/// ```
/// use strawberry_hub::pagination::slice_page;
///
/// let items = vec![0, 1, 2, 3, 4];
/// assert_eq!(slice_page(items.clone(), Some(3), Some(10)), vec![3, 4]);
/// assert_eq!(slice_page(items.clone(), Some(1), None), items);
/// assert!(slice_page(items, Some(9), Some(2)).is_empty());
/// ```
pub fn slice_page<T>(items: Vec<T>, offset: Option<usize>, count: Option<usize>) -> Vec<T> {
    match (offset, count) {
        (Some(offset), Some(count)) => items.into_iter().skip(offset).take(count).collect(),
        _ => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> Vec<u32> {
        vec![0, 1, 2, 3, 4]
    }

    #[test]
    fn test_page_normal() {
        assert_eq!(slice_page(five(), Some(1), Some(2)), vec![1, 2]);
    }

    #[test]
    fn test_page_clamped_to_length() {
        assert_eq!(slice_page(five(), Some(3), Some(10)), vec![3, 4]);
    }

    #[test]
    fn test_page_offset_past_end() {
        assert!(slice_page(five(), Some(5), Some(1)).is_empty());
        assert!(slice_page(five(), Some(usize::MAX), Some(usize::MAX)).is_empty());
    }

    #[test]
    fn test_page_missing_bound_returns_all() {
        assert_eq!(slice_page(five(), None, Some(2)), five());
        assert_eq!(slice_page(five(), Some(2), None), five());
        assert_eq!(slice_page(five(), None, None), five());
    }

    #[test]
    fn test_page_zero_count() {
        assert!(slice_page(five(), Some(0), Some(0)).is_empty());
    }

    #[test]
    fn test_page_empty() {
        assert!(slice_page(Vec::<u32>::new(), Some(0), Some(10)).is_empty());
    }
}
