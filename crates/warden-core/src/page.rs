//! Normalized pagination metadata.

use serde::{Deserialize, Serialize};

/// Sort direction for one column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Parse a server `sortType` such as `"ASC"` or `"desc"`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Single-column sort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column or attribute name
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

/// How a backend numbers its pages.
///
/// Only [`PaginationStrategy::Ranged`] backends report a start index from which
/// `number`, `first` and `last` can be derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationStrategy {
    /// Page-parameter numbering; page fields are taken as reported
    #[default]
    PageNumbered,
    /// Start-index windows (`startIndex`/`pageSize`); zero-based `number` is computed
    Ranged,
}

/// Pagination metadata for one fetched page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// Total matching records on the server
    pub total_elements: u64,
    /// Total pages at the current page size
    pub total_pages: u64,
    /// Records in this page
    pub number_of_elements: u64,
    /// Page size
    pub size: u64,
    /// Index of the first record of this page
    pub start_index: u64,
    /// Active sort, if the server reported one
    pub sort: Option<SortSpec>,
    /// Zero-based page index (ranged backends)
    pub number: Option<u64>,
    /// Whether this is the first page (ranged backends)
    pub first: Option<bool>,
    /// Whether this is the last page (ranged backends)
    pub last: Option<bool>,
}

impl PageState {
    /// `ceil(total / size)`, zero when the page size is zero.
    pub fn total_pages_for(total: u64, size: u64) -> u64 {
        if size == 0 {
            0
        } else {
            total.div_ceil(size)
        }
    }

    /// Whether the server reported more than one page.
    pub fn has_multiple_pages(&self) -> bool {
        self.total_pages > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(PageState::total_pages_for(95, 20), 5);
        assert_eq!(PageState::total_pages_for(100, 20), 5);
        assert_eq!(PageState::total_pages_for(0, 20), 0);
        assert_eq!(PageState::total_pages_for(10, 0), 0);
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
    }

    #[test]
    fn test_page_state_wire_names() {
        let state = PageState {
            total_elements: 3,
            ..PageState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["totalElements"], 3);
        assert!(json.get("numberOfElements").is_some());
    }

    proptest! {
        #[test]
        fn total_pages_covers_every_record(total in 0u64..100_000, size in 1u64..500) {
            let pages = PageState::total_pages_for(total, size);
            prop_assert!(pages * size >= total);
            prop_assert!(pages == 0 || (pages - 1) * size < total);
        }
    }
}
