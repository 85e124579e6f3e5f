//! # Paginated Table
//!
//! Headless table view model. [`PaginatedTable::view`] turns a collection
//! handle into a [`TableView`]: header cells with their sort state, an
//! optional filter row and a body that is exactly one of
//!
//! - a skeleton while the handle is pending or loading
//! - an empty-state message when there are no rows
//! - a custom body produced by a caller-supplied renderer
//! - one row per model, each optionally rendered by a row renderer
//!
//! Sorting is client-side and stable. Column widths can be persisted through
//! [`ColumnWidths`] and must be re-synced whenever the loading state flips,
//! since row content reflows the columns.

use crate::sort::{next_sort, stable_sort};
use crate::widths::ColumnWidths;
use serde_json::Value;
use std::sync::Arc;
use warden_core::{CollectionHandle, SortDirection, SortSpec};

/// Default empty-state text.
pub const EMPTY_MESSAGE: &str = "No data available";

/// Access to a model's cell values.
pub trait TableRow: Clone + Send + Sync + 'static {
    /// Value shown (and sorted on) in column `field`.
    fn cell(&self, field: &str) -> Value;
}

impl TableRow for Value {
    fn cell(&self, field: &str) -> Value {
        field
            .split('.')
            .try_fold(self, |value, segment| value.get(segment))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Column definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// Model field (dot paths reach nested values)
    pub field: String,
    /// Header text
    pub label: String,
    /// Whether the column takes part in sorting
    pub sortable: bool,
    /// Initial width in pixels
    pub width: Option<u32>,
}

impl Column {
    /// Sortable column.
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            sortable: true,
            width: None,
        }
    }

    /// Exclude the column from sorting.
    #[must_use]
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Set an initial width.
    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }
}

/// Table behaviour switches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableAttrs {
    /// Headers toggle client-side sorting
    pub sorting_enabled: bool,
    /// Render a filter row under the header
    pub filter_row: bool,
    /// Persist column widths under this table id
    pub resizable_id: Option<String>,
    /// Empty-state text; [`EMPTY_MESSAGE`] when unset
    pub empty_message: Option<String>,
}

/// One header cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderCell {
    /// Column field
    pub field: String,
    /// Header text
    pub label: String,
    /// Whether clicking sorts
    pub sortable: bool,
    /// Active direction when this column is sorted
    pub sorted: Option<SortDirection>,
    /// Width in pixels
    pub width: Option<u32>,
}

/// One body row.
#[derive(Clone, Debug, PartialEq)]
pub struct RowView<M> {
    /// The record
    pub model: M,
    /// Cell values in column order
    pub cells: Vec<Value>,
    /// Output of the row renderer, when one is set
    pub custom: Option<String>,
}

/// Table body.
#[derive(Clone, Debug, PartialEq)]
pub enum TableBody<M> {
    /// Placeholder while pending or loading
    Skeleton,
    /// No rows
    Empty(String),
    /// Output of the body renderer
    Custom(String),
    /// Rows in display order
    Rows(Vec<RowView<M>>),
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TableView<M> {
    /// Header row
    pub header: Vec<HeaderCell>,
    /// Whether to draw the filter row
    pub filter_row: bool,
    /// Body
    pub body: TableBody<M>,
}

type BodyRenderer<M> = Arc<dyn Fn(&[M]) -> String + Send + Sync>;
type RowRenderer<M> = Arc<dyn Fn(&M) -> String + Send + Sync>;

/// Table view model over a collection handle.
pub struct PaginatedTable<M: TableRow> {
    columns: Vec<Column>,
    attrs: TableAttrs,
    sort: Option<SortSpec>,
    widths: Arc<ColumnWidths>,
    body_renderer: Option<BodyRenderer<M>>,
    row_renderer: Option<RowRenderer<M>>,
    last_loading: Option<bool>,
    resyncs: u64,
}

impl<M: TableRow> PaginatedTable<M> {
    /// Table with in-memory column widths.
    pub fn new(columns: Vec<Column>, attrs: TableAttrs) -> Self {
        Self::with_widths(columns, attrs, Arc::new(ColumnWidths::in_memory()))
    }

    /// Table persisting widths through `widths`. Saved widths for the
    /// table's id replace the columns' initial widths.
    pub fn with_widths(mut columns: Vec<Column>, attrs: TableAttrs, widths: Arc<ColumnWidths>) -> Self {
        if let Some(saved) = attrs.resizable_id.as_deref().and_then(|id| widths.load(id)) {
            if saved.len() == columns.len() {
                for (column, width) in columns.iter_mut().zip(saved) {
                    column.width = Some(width);
                }
            }
        }
        Self {
            columns,
            attrs,
            sort: None,
            widths,
            body_renderer: None,
            row_renderer: None,
            last_loading: None,
            resyncs: 0,
        }
    }

    /// Render the whole body with `renderer`.
    #[must_use]
    pub fn body_renderer(mut self, renderer: impl Fn(&[M]) -> String + Send + Sync + 'static) -> Self {
        self.body_renderer = Some(Arc::new(renderer));
        self
    }

    /// Render each row with `renderer`.
    #[must_use]
    pub fn row_renderer(mut self, renderer: impl Fn(&M) -> String + Send + Sync + 'static) -> Self {
        self.row_renderer = Some(Arc::new(renderer));
        self
    }

    /// Columns in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Active sort.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    // ─── Interaction ─────────────────────────────────────────

    /// Header click. Returns the new sort, or `None` when sorting is off or
    /// the column is not sortable.
    pub fn click_header(&mut self, field: &str) -> Option<&SortSpec> {
        if !self.attrs.sorting_enabled {
            return None;
        }
        let sortable = self.columns.iter().any(|c| c.field == field && c.sortable);
        if !sortable {
            return None;
        }
        self.sort = Some(next_sort(self.sort.as_ref(), field));
        self.sort.as_ref()
    }

    /// Record resized widths and persist them when the table is resizable.
    pub fn resize(&mut self, widths: &[u32]) {
        for (column, width) in self.columns.iter_mut().zip(widths) {
            column.width = Some(*width);
        }
        if let Some(id) = &self.attrs.resizable_id {
            let current: Vec<u32> = self.columns.iter().map(|c| c.width.unwrap_or(0)).collect();
            self.widths.save(id, &current);
        }
    }

    /// Feed the handle's loading flag. Returns `true` when it changed since
    /// the last call, meaning resize handles must be re-synced.
    pub fn observe_loading(&mut self, loading: bool) -> bool {
        let changed = self.last_loading.is_some_and(|last| last != loading);
        self.last_loading = Some(loading);
        if changed && self.attrs.resizable_id.is_some() {
            self.resyncs += 1;
            tracing::trace!(loading, "column resize handles need re-sync");
            return true;
        }
        false
    }

    /// How many re-syncs loading transitions have requested.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    // ─── Rendering ───────────────────────────────────────────

    /// Header cells with the current sort marked.
    pub fn header(&self) -> Vec<HeaderCell> {
        self.columns
            .iter()
            .map(|column| HeaderCell {
                field: column.field.clone(),
                label: column.label.clone(),
                sortable: self.attrs.sorting_enabled && column.sortable,
                sorted: self
                    .sort
                    .as_ref()
                    .filter(|s| s.field == column.field)
                    .map(|s| s.direction),
                width: column.width,
            })
            .collect()
    }

    /// Models in display order.
    pub fn sorted(&self, models: Vec<M>) -> Vec<M> {
        match (&self.sort, self.attrs.sorting_enabled) {
            (Some(spec), true) => {
                let field = spec.field.clone();
                stable_sort(models, move |m| m.cell(&field), spec.direction)
            }
            _ => models,
        }
    }

    /// View of `handle` for one frame.
    pub fn view(&mut self, handle: &CollectionHandle<M>) -> TableView<M> {
        let loading = handle.is_loading();
        self.observe_loading(loading);

        let body = if loading || handle.is_pending() {
            TableBody::Skeleton
        } else {
            let models = self.sorted(handle.models());
            if models.is_empty() {
                TableBody::Empty(
                    self.attrs
                        .empty_message
                        .clone()
                        .unwrap_or_else(|| EMPTY_MESSAGE.to_string()),
                )
            } else if let Some(render) = &self.body_renderer {
                TableBody::Custom(render(&models))
            } else {
                TableBody::Rows(models.into_iter().map(|m| self.row(m)).collect())
            }
        };

        TableView {
            header: self.header(),
            filter_row: self.attrs.filter_row,
            body,
        }
    }

    fn row(&self, model: M) -> RowView<M> {
        let cells = self.columns.iter().map(|c| model.cell(&c.field)).collect();
        let custom = self.row_renderer.as_ref().map(|render| render(&model));
        RowView {
            model,
            cells,
            custom,
        }
    }
}

impl<M: TableRow> std::fmt::Debug for PaginatedTable<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedTable")
            .field("columns", &self.columns)
            .field("attrs", &self.attrs)
            .field("sort", &self.sort)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::PageState;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name"),
            Column::new("owner.team", "Team"),
            Column::new("actions", "").unsortable(),
        ]
    }

    fn sortable() -> TableAttrs {
        TableAttrs {
            sorting_enabled: true,
            ..TableAttrs::default()
        }
    }

    fn loaded(models: Vec<Value>) -> CollectionHandle<Value> {
        let handle = CollectionHandle::default();
        handle.reset(models, Some(PageState::default()));
        handle
    }

    #[test]
    fn test_nested_cells() {
        let row = json!({"owner": {"team": "infra"}});
        assert_eq!(row.cell("owner.team"), json!("infra"));
        assert_eq!(row.cell("owner.missing"), Value::Null);
    }

    #[test]
    fn test_skeleton_while_loading_or_pending() {
        let mut table = PaginatedTable::<Value>::new(columns(), sortable());
        let pending = CollectionHandle::<Value>::pending();
        assert_eq!(table.view(&pending).body, TableBody::Skeleton);

        let handle = loaded(vec![json!({"name": "a"})]);
        handle.before_fetch();
        assert_eq!(table.view(&handle).body, TableBody::Skeleton);
    }

    #[test]
    fn test_empty_state() {
        let mut table = PaginatedTable::<Value>::new(
            columns(),
            TableAttrs {
                empty_message: Some("No policies".into()),
                ..TableAttrs::default()
            },
        );
        assert_eq!(table.view(&loaded(vec![])).body, TableBody::Empty("No policies".into()));
    }

    #[test]
    fn test_header_click_sorts_rows() {
        let mut table = PaginatedTable::<Value>::new(columns(), sortable());
        let handle = loaded(vec![
            json!({"name": "b", "owner": {"team": "x"}}),
            json!({"name": "a", "owner": {"team": "y"}}),
        ]);

        assert!(table.click_header("actions").is_none());
        table.click_header("name");
        let TableBody::Rows(rows) = table.view(&handle).body else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].cells[0], json!("a"));

        table.click_header("name");
        let view = table.view(&handle);
        assert_eq!(view.header[0].sorted, Some(SortDirection::Desc));
        let TableBody::Rows(rows) = view.body else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].cells[0], json!("b"));
    }

    #[test]
    fn test_sorting_disabled_keeps_order() {
        let mut table = PaginatedTable::<Value>::new(columns(), TableAttrs::default());
        assert!(table.click_header("name").is_none());
        assert!(!table.header()[0].sortable);
    }

    #[test]
    fn test_custom_renderers() {
        let handle = loaded(vec![json!({"name": "a"}), json!({"name": "b"})]);

        let mut body = PaginatedTable::<Value>::new(columns(), sortable())
            .body_renderer(|models| format!("{} policies", models.len()));
        assert_eq!(body.view(&handle).body, TableBody::Custom("2 policies".into()));

        let mut rows = PaginatedTable::<Value>::new(columns(), sortable())
            .row_renderer(|m| format!("<{}>", m["name"].as_str().unwrap_or_default()));
        let TableBody::Rows(rows) = rows.view(&handle).body else {
            panic!("expected rows");
        };
        assert_eq!(rows[1].custom.as_deref(), Some("<b>"));
    }

    #[test]
    fn test_loading_transitions_request_resync() {
        let attrs = TableAttrs {
            resizable_id: Some("policies".into()),
            ..TableAttrs::default()
        };
        let mut table = PaginatedTable::<Value>::new(columns(), attrs);
        assert!(!table.observe_loading(true));
        assert!(!table.observe_loading(true));
        assert!(table.observe_loading(false));
        assert!(table.observe_loading(true));
        assert_eq!(table.resync_count(), 2);
    }

    #[test]
    fn test_widths_are_restored() {
        let widths = Arc::new(ColumnWidths::in_memory());
        let attrs = TableAttrs {
            resizable_id: Some("policies".into()),
            ..TableAttrs::default()
        };

        let mut table = PaginatedTable::<Value>::with_widths(columns(), attrs.clone(), widths.clone());
        table.resize(&[150, 90, 40]);

        let restored = PaginatedTable::<Value>::with_widths(columns(), attrs, widths);
        let restored: Vec<_> = restored.columns().iter().map(|c| c.width).collect();
        assert_eq!(restored, vec![Some(150), Some(90), Some(40)]);
    }
}
