//! Warden App - Screen-Level Building Blocks
//!
//! Glue between the stores in `warden-client` and what a console screen
//! renders:
//!
//! - [`handlers`]: success/error continuations that settle a collection handle
//! - [`table`]: the paginated table view model (sorting, resizing, skeletons)
//! - [`pager`]: page navigation writing into query params
//! - [`submit`]: validate-then-save for reactive forms
//! - [`services`]: startup wiring from [`warden_core::WardenConfig`]

#![forbid(unsafe_code)]

/// Response continuations
pub mod handlers;

/// Pager state
pub mod pager;

/// Service wiring
pub mod services;

/// Client-side sorting
pub mod sort;

/// Persistent key-value storage seam
pub mod storage;

/// Form submission
pub mod submit;

/// Paginated table view model
pub mod table;

/// Server error message templates
pub mod templates;

/// Column width persistence
pub mod widths;

pub use handlers::{parse_error_payload, ErrorOptions, ModalControls, ResponseHandlers};
pub use pager::{Pager, DEFAULT_PAGE_SIZES, PAGE_PARAM, SIZE_PARAM};
pub use services::{load_config, Services};
pub use sort::{compare_values, next_sort, stable_sort};
pub use storage::KeyValueStorage;
pub use submit::{submit_form, SubmitError};
pub use table::{
    Column, HeaderCell, PaginatedTable, RowView, TableAttrs, TableBody, TableRow, TableView,
    EMPTY_MESSAGE,
};
pub use templates::{ErrorTemplates, FALLBACK_MESSAGE};
pub use widths::{ColumnWidths, COLUMN_WIDTHS_KEY};
