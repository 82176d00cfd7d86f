//! Paginated result shapes and the page-window calculation behind page controls.

use serde::{Deserialize, Serialize};

/// Up to this many pages are listed without any ellipsis.
const MAX_UNCOMPRESSED_PAGES: u32 = 7;

/// One page of an offset-paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total_count: u64,
  pub page_size: u32,
  pub offset: u32,
}

impl<T> Page<T> {
  /// 1-based page number this page was requested for.
  pub fn current_page(&self) -> u32 {
    if self.page_size == 0 {
      1
    } else {
      self.offset / self.page_size + 1
    }
  }

  pub fn total_pages(&self) -> u32 {
    total_pages(self.total_count, self.page_size)
  }

  pub fn window(&self) -> PageWindow {
    compute_page_window(self.total_count, self.page_size, self.current_page())
  }
}

/// One page of a cursor-paginated list. `next_offset == None` means exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPage<T> {
  pub items: Vec<T>,
  pub total_count: u64,
  pub has_more: bool,
  pub next_offset: Option<u32>,
}

/// Pages accumulated by a "load more" list, oldest request first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfinitePages<T> {
  pub pages: Vec<CursorPage<T>>,
}

impl<T> Default for InfinitePages<T> {
  fn default() -> Self {
    Self { pages: Vec::new() }
  }
}

impl<T> InfinitePages<T> {
  pub fn is_empty(&self) -> bool {
    self.pages.is_empty()
  }

  /// Offset to request next, forwarded verbatim from the last page.
  pub fn next_offset(&self) -> Option<u32> {
    self.pages.last().and_then(|p| p.next_offset)
  }

  /// Whether another page may be requested. An empty list has not started yet.
  pub fn has_next_page(&self) -> bool {
    self.pages.is_empty() || self.next_offset().is_some()
  }

  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.pages.iter().flat_map(|p| p.items.iter())
  }

  pub fn total_count(&self) -> u64 {
    self.pages.last().map(|p| p.total_count).unwrap_or(0)
  }

  pub fn push(&mut self, page: CursorPage<T>) {
    self.pages.push(page);
  }
}

/// An entry in the visible page-number sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
  Page(u32),
  Ellipsis,
}

/// Whether page controls should be drawn at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageControls {
  /// Zero or one page: nothing to paginate
  Hidden,
  Shown(Vec<PageItem>),
}

/// Display metadata for an offset-paginated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
  /// 1-based index of the first visible item (0 when the list is empty)
  pub range_start: u64,
  /// 1-based index of the last visible item (0 when the list is empty)
  pub range_end: u64,
  pub current_page: u32,
  pub total_pages: u32,
  pub controls: PageControls,
}

impl PageWindow {
  /// Page `delta` steps away from the current one, if it exists.
  pub fn step(&self, delta: i64) -> Option<u32> {
    let target = i64::from(self.current_page) + delta;
    if target < 1 || target > i64::from(self.total_pages) || delta == 0 {
      return None;
    }
    u32::try_from(target).ok()
  }
}

/// Offset of the first item on 1-based `page`.
pub fn page_offset(page: u32, page_size: u32) -> u32 {
  page.saturating_sub(1).saturating_mul(page_size)
}

pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
  if page_size == 0 {
    return 0;
  }
  let pages = total_count.div_ceil(u64::from(page_size));
  u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Compute the visible range and page-number sequence for `current_page`.
///
/// `current_page` is 1-based and clamped into `1..=total_pages`.
pub fn compute_page_window(total_count: u64, page_size: u32, current_page: u32) -> PageWindow {
  let total = total_pages(total_count, page_size);
  let current = current_page.clamp(1, total.max(1));

  let (range_start, range_end) = if total_count == 0 || page_size == 0 {
    (0, 0)
  } else {
    let size = u64::from(page_size);
    let start = u64::from(current - 1) * size + 1;
    let end = (u64::from(current) * size).min(total_count);
    (start, end)
  };

  let controls = if total <= 1 {
    PageControls::Hidden
  } else {
    PageControls::Shown(page_numbers(total, current))
  };

  PageWindow {
    range_start,
    range_end,
    current_page: current,
    total_pages: total,
    controls,
  }
}

fn page_numbers(total: u32, current: u32) -> Vec<PageItem> {
  if total <= MAX_UNCOMPRESSED_PAGES {
    return (1..=total).map(PageItem::Page).collect();
  }

  let mut items = vec![PageItem::Page(1)];
  if current > 3 {
    items.push(PageItem::Ellipsis);
  }

  let window_start = current.saturating_sub(1).max(2);
  let window_end = current.saturating_add(1).min(total - 1);
  items.extend((window_start..=window_end).map(PageItem::Page));

  if current < total - 2 {
    items.push(PageItem::Ellipsis);
  }
  items.push(PageItem::Page(total));
  items
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::PageItem::{Ellipsis, Page as P};

  fn shown(window: &PageWindow) -> &[PageItem] {
    match &window.controls {
      PageControls::Shown(items) => items,
      PageControls::Hidden => panic!("expected page controls"),
    }
  }

  #[test]
  fn test_small_page_counts_list_everything() {
    for total_pages in 2..=7u32 {
      let total_count = u64::from(total_pages) * 10;
      for current in 1..=total_pages {
        let window = compute_page_window(total_count, 10, current);
        let expected: Vec<PageItem> = (1..=total_pages).map(P).collect();
        assert_eq!(shown(&window), expected.as_slice());
      }
    }
  }

  #[test]
  fn test_middle_page_has_both_ellipses() {
    let window = compute_page_window(100, 10, 5);
    assert_eq!(
      shown(&window),
      &[P(1), Ellipsis, P(4), P(5), P(6), Ellipsis, P(10)]
    );
  }

  #[test]
  fn test_first_page_has_no_leading_ellipsis() {
    let window = compute_page_window(100, 10, 1);
    assert_eq!(shown(&window), &[P(1), P(2), Ellipsis, P(10)]);
  }

  #[test]
  fn test_last_page_at_the_page_number_limit() {
    let window = compute_page_window(u64::from(u32::MAX) + 10, 1, u32::MAX);
    assert_eq!(window.current_page, u32::MAX);
    assert_eq!(shown(&window), &[P(1), Ellipsis, P(u32::MAX - 1), P(u32::MAX)]);
  }

  #[test]
  fn test_last_page() {
    let window = compute_page_window(100, 10, 10);
    assert_eq!(shown(&window), &[P(1), Ellipsis, P(9), P(10)]);
  }

  #[test]
  fn test_near_end_drops_trailing_ellipsis() {
    let window = compute_page_window(100, 10, 8);
    assert_eq!(shown(&window), &[P(1), Ellipsis, P(7), P(8), P(9), P(10)]);
  }

  #[test]
  fn test_no_repeats_or_adjacent_ellipses() {
    for total in 8..=30u32 {
      for current in 1..=total {
        let window = compute_page_window(u64::from(total) * 5, 5, current);
        let items = shown(&window);
        let pages: Vec<u32> = items
          .iter()
          .filter_map(|i| match i {
            P(n) => Some(*n),
            Ellipsis => None,
          })
          .collect();
        let mut sorted = pages.clone();
        sorted.dedup();
        assert_eq!(pages, sorted, "total={} current={}", total, current);
        assert!(pages.windows(2).all(|w| w[0] < w[1]));
        assert!(!items.windows(2).any(|w| w == [Ellipsis, Ellipsis]));
        assert_eq!(items.first(), Some(&P(1)));
        assert_eq!(items.last(), Some(&P(total)));
      }
    }
  }

  #[test]
  fn test_range_on_partial_last_page() {
    let window = compute_page_window(45, 20, 3);
    assert_eq!(window.range_start, 41);
    assert_eq!(window.range_end, 45);
    assert_eq!(window.total_pages, 3);
  }

  #[test]
  fn test_single_page_hides_controls() {
    let window = compute_page_window(5, 20, 1);
    assert_eq!(window.controls, PageControls::Hidden);
    assert_eq!((window.range_start, window.range_end), (1, 5));
  }

  #[test]
  fn test_empty_list() {
    let window = compute_page_window(0, 20, 1);
    assert_eq!(window.controls, PageControls::Hidden);
    assert_eq!((window.range_start, window.range_end), (0, 0));
    assert_eq!(window.total_pages, 0);
  }

  #[test]
  fn test_current_page_is_clamped() {
    let window = compute_page_window(45, 20, 9);
    assert_eq!(window.current_page, 3);
    assert_eq!(window.range_start, 41);
  }

  #[test]
  fn test_page_derives_current_page_from_offset() {
    let page: Page<u32> = Page {
      items: vec![1, 2, 3],
      total_count: 63,
      page_size: 20,
      offset: 40,
    };
    assert_eq!(page.current_page(), 3);
    assert_eq!(page.total_pages(), 4);
    assert_eq!(page.window().range_start, 41);
  }

  #[test]
  fn test_step_stays_within_pages() {
    let window = compute_page_window(45, 20, 2);
    assert_eq!(window.step(1), Some(3));
    assert_eq!(window.step(-1), Some(1));
    assert_eq!(window.step(2), None);
    assert_eq!(window.step(-2), None);

    let empty = compute_page_window(0, 20, 1);
    assert_eq!(empty.step(1), None);
  }

  #[test]
  fn test_page_offset() {
    assert_eq!(page_offset(1, 20), 0);
    assert_eq!(page_offset(3, 20), 40);
    assert_eq!(page_offset(0, 20), 0);
  }

  #[test]
  fn test_infinite_pages_forward_next_offset() {
    let mut pages = InfinitePages::default();
    assert!(pages.has_next_page());

    pages.push(CursorPage {
      items: vec![1, 2],
      total_count: 3,
      has_more: true,
      next_offset: Some(2),
    });
    assert_eq!(pages.next_offset(), Some(2));

    pages.push(CursorPage {
      items: vec![3],
      total_count: 3,
      has_more: false,
      next_offset: None,
    });
    assert!(!pages.has_next_page());
    assert_eq!(pages.items().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
  }
}
