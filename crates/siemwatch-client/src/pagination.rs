//! Pagination controls for the event list.

use serde::Serialize;

/// Pages shown on each side of the current one.
pub const PAGE_WINDOW_RADIUS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageControl {
    Previous { target: u32, enabled: bool },
    Page { number: u32, current: bool },
    Ellipsis,
    Next { target: u32, enabled: bool },
}

/// Controls for `page` out of `pages`.
///
/// Nothing is produced for a single page. Otherwise the list is
/// previous, a window of up to five pages around `page` clamped to
/// `[1, pages]`, and next. When the window does not reach the first or last
/// page a jump link to it is added, with an ellipsis if pages are skipped.
pub fn page_controls(page: u32, pages: u32) -> Vec<PageControl> {
    if pages <= 1 {
        return Vec::new();
    }

    let start = page.saturating_sub(PAGE_WINDOW_RADIUS).max(1);
    let end = page.saturating_add(PAGE_WINDOW_RADIUS).min(pages);

    let mut controls = vec![PageControl::Previous {
        target: page.saturating_sub(1),
        enabled: page > 1,
    }];

    if start > 1 {
        controls.push(PageControl::Page {
            number: 1,
            current: false,
        });
        if start > 2 {
            controls.push(PageControl::Ellipsis);
        }
    }

    controls.extend((start..=end).map(|number| PageControl::Page {
        number,
        current: number == page,
    }));

    if end < pages {
        if end < pages - 1 {
            controls.push(PageControl::Ellipsis);
        }
        controls.push(PageControl::Page {
            number: pages,
            current: false,
        });
    }

    controls.push(PageControl::Next {
        target: page.saturating_add(1),
        enabled: page < pages,
    });
    controls
}

/// The "showing from-to of total" line under the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShowingRange {
    pub from: u64,
    pub to: u64,
    pub total: u64,
}

impl ShowingRange {
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let page = u64::from(page.max(1));
        let per_page = u64::from(per_page);
        let from = if total > 0 { (page - 1) * per_page + 1 } else { 0 };
        Self {
            from,
            to: (page * per_page).min(total),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(controls: &[PageControl]) -> String {
        controls
            .iter()
            .map(|c| match c {
                PageControl::Previous { enabled, .. } => (if *enabled { "<" } else { "(<)" }).to_string(),
                PageControl::Next { enabled, .. } => (if *enabled { ">" } else { "(>)" }).to_string(),
                PageControl::Ellipsis => "...".to_string(),
                PageControl::Page { number, current: true } => format!("[{number}]"),
                PageControl::Page { number, .. } => number.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn single_page_has_no_controls() {
        assert!(page_controls(1, 1).is_empty());
        assert!(page_controls(1, 0).is_empty());
    }

    #[test]
    fn first_page_disables_previous() {
        assert_eq!(numbers(&page_controls(1, 10)), "(<) [1] 2 3 ... 10 >");
    }

    #[test]
    fn last_page_disables_next() {
        assert_eq!(numbers(&page_controls(10, 10)), "< 1 ... 8 9 [10] (>)");
    }

    #[test]
    fn middle_page_has_both_jumps() {
        assert_eq!(numbers(&page_controls(5, 10)), "< 1 ... 3 4 [5] 6 7 ... 10 >");
    }

    #[test]
    fn adjacent_boundary_has_jump_without_ellipsis() {
        assert_eq!(numbers(&page_controls(4, 7)), "< 1 2 3 [4] 5 6 7 >");
        assert_eq!(numbers(&page_controls(5, 8)), "< 1 ... 3 4 [5] 6 7 8 >");
    }

    #[test]
    fn small_page_counts_show_everything() {
        assert_eq!(numbers(&page_controls(2, 3)), "< 1 [2] 3 >");
    }

    #[test]
    fn window_never_exceeds_five_pages() {
        for pages in 2..30 {
            for page in 1..=pages {
                let in_window = page_controls(page, pages)
                    .iter()
                    .filter(|c| matches!(c, PageControl::Page { number, .. } if number.abs_diff(page) <= PAGE_WINDOW_RADIUS))
                    .count();
                assert!(in_window <= 5, "page {page} of {pages}");
            }
        }
    }

    #[test]
    fn showing_range() {
        assert_eq!(ShowingRange::new(1, 50, 120), ShowingRange { from: 1, to: 50, total: 120 });
        assert_eq!(ShowingRange::new(3, 50, 120), ShowingRange { from: 101, to: 120, total: 120 });
        assert_eq!(ShowingRange::new(1, 50, 0), ShowingRange { from: 0, to: 0, total: 0 });
    }
}
