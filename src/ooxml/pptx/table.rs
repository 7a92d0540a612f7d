//! DrawingML table grid and the cell merge engine.
//!
//! A table (`a:tbl`) is a dense grid: `a:tblGrid` declares the columns, every
//! `a:tr` holds exactly one `a:tc` per column. Merged regions are expressed
//! with span attributes on the region's top-left cell (`gridSpan`, `rowSpan`)
//! and merge flags on every other cell of the region (`hMerge`, `vMerge`).
//!
//! The grid invariant is that every position is covered by exactly one
//! region. [`TableGrid::from_table`] checks it, and every mutation in this
//! module is validated against it and rolled back when it would break it.
use crate::common::error::{Error, Result};
use crate::common::unit::parse_emu;
use crate::common::xml::XmlElement;
use crate::ooxml::pptx::cache::ResettableCache;
use crate::ooxml::pptx::shapes::base::{parse_bool, text_body_text};
use std::ops::Range;
use tracing::{debug, trace};

/// An inclusive rectangle of grid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl GridRect {
    /// Number of rows covered.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.bottom - self.top + 1
    }

    /// Number of columns covered.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.right - self.left + 1
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.top == self.bottom && self.left == self.right
    }

    fn union(self, other: GridRect) -> Self {
        Self {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }

    fn intersects(&self, other: &GridRect) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }

    fn positions(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let (left, right) = (self.left, self.right);
        (self.top..=self.bottom).flat_map(move |row| (left..=right).map(move |col| (row, col)))
    }
}

/// Span attributes of one `a:tc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub row_span: usize,
    pub col_span: usize,
    pub h_merge: bool,
    pub v_merge: bool,
}

impl CellSpan {
    const SINGLE: CellSpan = CellSpan {
        row_span: 1,
        col_span: 1,
        h_merge: false,
        v_merge: false,
    };

    fn from_tc(tc: &XmlElement) -> Self {
        let span = |name: &str| {
            tc.attr(name)
                .and_then(|value| atoi_simd::parse::<usize, false, false>(value.as_bytes()).ok())
                .unwrap_or(1)
                .max(1)
        };
        Self {
            row_span: span("rowSpan"),
            col_span: span("gridSpan"),
            h_merge: tc.attr("hMerge").is_some_and(parse_bool),
            v_merge: tc.attr("vMerge").is_some_and(parse_bool),
        }
    }

    /// Whether the cell is absorbed into a region anchored elsewhere.
    #[inline]
    pub fn is_covered(&self) -> bool {
        self.h_merge || self.v_merge
    }

    fn write_to(&self, tc: &mut XmlElement) {
        set_count(tc, "rowSpan", self.row_span);
        set_count(tc, "gridSpan", self.col_span);
        set_flag(tc, "hMerge", self.h_merge);
        set_flag(tc, "vMerge", self.v_merge);
    }
}

fn set_count(tc: &mut XmlElement, name: &str, value: usize) {
    if value > 1 {
        tc.set_attr(name, value.to_string());
    } else {
        tc.remove_attr(name);
    }
}

fn set_flag(tc: &mut XmlElement, name: &str, value: bool) {
    if value {
        tc.set_attr(name, "1");
    } else {
        tc.remove_attr(name);
    }
}

/// Validated snapshot of a table's grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    column_widths: Vec<i64>,
    row_heights: Vec<i64>,
    /// Row-major span attributes
    spans: Vec<CellSpan>,
    /// Row-major anchor of the region covering each position
    anchors: Vec<(usize, usize)>,
}

impl TableGrid {
    /// Read and validate the grid of an `a:tbl` element.
    pub fn from_table(tbl: &XmlElement) -> Result<Self> {
        let column_widths: Vec<i64> = tbl
            .child("tblGrid")
            .map(|grid| grid.children_named("gridCol").map(column_width).collect())
            .unwrap_or_default();
        let cols = column_widths.len();

        let mut row_heights = Vec::new();
        let mut spans = Vec::new();
        for (row, tr) in tbl.children_named("tr").enumerate() {
            row_heights.push(row_height(tr));
            let before = spans.len();
            spans.extend(tr.children_named("tc").map(CellSpan::from_tc));
            let found = spans.len() - before;
            if found != cols {
                return Err(Error::GridInconsistency(format!(
                    "row {} has {} cells but the grid declares {} columns",
                    row, found, cols
                )));
            }
        }
        let rows = row_heights.len();

        let mut claimed: Vec<Option<(usize, usize)>> = vec![None; rows * cols];
        for row in 0..rows {
            for col in 0..cols {
                let span = spans[row * cols + col];
                if span.is_covered() {
                    continue;
                }
                if span.row_span > rows - row || span.col_span > cols - col {
                    return Err(Error::GridInconsistency(format!(
                        "cell ({}, {}) spans {}x{} past the {}x{} grid",
                        row, col, span.row_span, span.col_span, rows, cols
                    )));
                }
                for r in row..row + span.row_span {
                    for c in col..col + span.col_span {
                        let idx = r * cols + c;
                        if (r, c) != (row, col) && !spans[idx].is_covered() {
                            return Err(Error::GridInconsistency(format!(
                                "cell ({}, {}) starts inside the span of ({}, {})",
                                r, c, row, col
                            )));
                        }
                        if let Some((ar, ac)) = claimed[idx] {
                            return Err(Error::GridInconsistency(format!(
                                "cell ({}, {}) is covered by both ({}, {}) and ({}, {})",
                                r, c, ar, ac, row, col
                            )));
                        }
                        claimed[idx] = Some((row, col));
                    }
                }
            }
        }

        let anchors = claimed
            .into_iter()
            .enumerate()
            .map(|(idx, anchor)| {
                anchor.ok_or_else(|| {
                    Error::GridInconsistency(format!(
                        "cell ({}, {}) is merged into no region",
                        idx / cols,
                        idx % cols
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            column_widths,
            row_heights,
            spans,
            anchors,
        })
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    #[inline]
    pub fn column_widths(&self) -> &[i64] {
        &self.column_widths
    }

    #[inline]
    pub fn row_heights(&self) -> &[i64] {
        &self.row_heights
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.row_count() || col >= self.column_count() {
            return Err(Error::CellOutOfRange {
                row,
                col,
                rows: self.row_count(),
                cols: self.column_count(),
            });
        }
        Ok(row * self.column_count() + col)
    }

    /// Span attributes of the cell at a grid position.
    pub fn span(&self, row: usize, col: usize) -> Result<CellSpan> {
        Ok(self.spans[self.check_bounds(row, col)?])
    }

    /// Top-left position of the region covering a grid position.
    pub fn anchor(&self, row: usize, col: usize) -> Result<(usize, usize)> {
        Ok(self.anchors[self.check_bounds(row, col)?])
    }

    /// The region covering a grid position.
    pub fn region(&self, row: usize, col: usize) -> Result<GridRect> {
        let (top, left) = self.anchor(row, col)?;
        Ok(self.region_at(top, left))
    }

    fn region_at(&self, top: usize, left: usize) -> GridRect {
        let span = self.spans[top * self.column_count() + left];
        GridRect {
            top,
            left,
            bottom: top + span.row_span - 1,
            right: left + span.col_span - 1,
        }
    }

    /// Every region in row-major order of its anchor.
    pub fn regions(&self) -> impl Iterator<Item = GridRect> + '_ {
        let cols = self.column_count();
        self.spans
            .iter()
            .enumerate()
            .filter(|(_, span)| !span.is_covered())
            .map(move |(idx, _)| self.region_at(idx / cols, idx % cols))
    }

    /// Grow a rectangle until no region straddles its boundary.
    fn align_to_regions(&self, mut rect: GridRect) -> GridRect {
        loop {
            let grown = self
                .regions()
                .filter(|region| region.intersects(&rect))
                .fold(rect, GridRect::union);
            if grown == rect {
                return rect;
            }
            rect = grown;
        }
    }
}

fn column_width(grid_col: &XmlElement) -> i64 {
    grid_col.attr("w").and_then(parse_emu).unwrap_or_default()
}

fn row_height(tr: &XmlElement) -> i64 {
    tr.attr("h").and_then(parse_emu).unwrap_or_default()
}

fn cell(tbl: &XmlElement, row: usize, col: usize) -> Option<&XmlElement> {
    tbl.children_named("tr").nth(row)?.children_named("tc").nth(col)
}

fn cell_mut(tbl: &mut XmlElement, row: usize, col: usize) -> Result<&mut XmlElement> {
    tbl.children_named_mut("tr")
        .nth(row)
        .and_then(|tr| tr.children_named_mut("tc").nth(col))
        .ok_or_else(|| Error::GridInconsistency(format!("no cell element at ({}, {})", row, col)))
}

/// Remove the `range`-th children named `local`, counting only those.
fn remove_nth_named(parent: &mut XmlElement, local: &str, range: Range<usize>) -> usize {
    let mut seen = 0;
    parent
        .remove_children(|child| {
            if child.local_name() != local {
                return false;
            }
            let hit = range.contains(&seen);
            seen += 1;
            hit
        })
        .len()
}

fn new_text_body() -> XmlElement {
    XmlElement::new("a:txBody")
        .with_child(XmlElement::new("a:bodyPr"))
        .with_child(XmlElement::new("a:lstStyle"))
        .with_child(XmlElement::new("a:p"))
}

fn ensure_text_body(tc: &mut XmlElement) -> &mut XmlElement {
    if tc.child("txBody").is_none() {
        tc.insert_child(0, new_text_body());
    }
    tc.ensure_child_at("a:txBody", 0)
}

/// Detach the non-empty paragraphs of an absorbed cell.
///
/// The cell keeps one empty paragraph so its text body stays well-formed.
fn take_paragraphs(tc: &mut XmlElement) -> Vec<XmlElement> {
    let Some(body) = tc.child_mut("txBody") else {
        return Vec::new();
    };
    let moved = body.remove_children(|e| e.local_name() == "p" && !e.text().is_empty());
    if !body.elements().any(|e| e.local_name() == "p") {
        body.push(XmlElement::new("a:p"));
    }
    moved
}

/// Append paragraphs to a cell, dropping its own empty paragraphs first.
fn append_paragraphs(tc: &mut XmlElement, paragraphs: Vec<XmlElement>) {
    if paragraphs.is_empty() {
        return;
    }
    let body = ensure_text_body(tc);
    body.remove_children(|e| e.local_name() == "p" && e.text().is_empty());
    for paragraph in paragraphs {
        body.push(paragraph);
    }
}

/// Result of [`merge_cells`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Both cells already belonged to one region
    Unchanged,
    /// A new region was formed; `compacted` when columns or rows were folded
    Merged { compacted: bool },
}

/// Merge the regions containing cells `a` and `b` into one.
///
/// The merged rectangle is the bounding box of both regions, grown until it
/// no longer cuts through any existing region. Text of absorbed cells moves to
/// the top-left cell. Columns (rows) whose cells all share one span are then
/// folded into a single column (row) with the summed width (height).
///
/// The table is restored and [`Error::GridInconsistency`] returned if the
/// result would violate the grid invariant.
pub fn merge_cells(
    tbl: &mut XmlElement,
    a: (usize, usize),
    b: (usize, usize),
) -> Result<MergeOutcome> {
    let grid = TableGrid::from_table(tbl)?;
    let first = grid.region(a.0, a.1)?;
    let second = grid.region(b.0, b.1)?;
    if first == second {
        return Ok(MergeOutcome::Unchanged);
    }

    let rect = grid.align_to_regions(first.union(second));
    if rect != first.union(second) {
        debug!(?rect, "merge rectangle grown to align with existing regions");
    }

    let backup = tbl.clone();
    let result = apply_merge(tbl, rect).and_then(|()| {
        let compacted = compact(tbl);
        TableGrid::from_table(tbl)?;
        Ok(compacted)
    });

    match result {
        Ok(compacted) => {
            debug!(?rect, compacted, "cells merged");
            Ok(MergeOutcome::Merged { compacted })
        },
        Err(err) => {
            *tbl = backup;
            Err(match err {
                Error::GridInconsistency(msg) => Error::GridInconsistency(msg),
                other => Error::GridInconsistency(other.to_string()),
            })
        },
    }
}

fn apply_merge(tbl: &mut XmlElement, rect: GridRect) -> Result<()> {
    let mut moved = Vec::new();
    for (row, col) in rect.positions() {
        let at_top = row == rect.top;
        let at_left = col == rect.left;
        let tc = cell_mut(tbl, row, col)?;
        CellSpan {
            row_span: if at_top { rect.row_count() } else { 1 },
            col_span: if at_left { rect.column_count() } else { 1 },
            h_merge: !at_left,
            v_merge: !at_top,
        }
        .write_to(tc);
        if !(at_top && at_left) {
            moved.extend(take_paragraphs(tc));
        }
    }
    append_paragraphs(cell_mut(tbl, rect.top, rect.left)?, moved);
    Ok(())
}

/// Fold redundant columns, then redundant rows.
fn compact(tbl: &mut XmlElement) -> bool {
    let columns = compact_columns(tbl);
    let rows = compact_rows(tbl);
    columns || rows
}

fn compact_columns(tbl: &mut XmlElement) -> bool {
    let mut changed = false;
    let mut col = 0;
    loop {
        let cols = tbl
            .child("tblGrid")
            .map_or(0, |grid| grid.children_named("gridCol").count());
        if col >= cols {
            break;
        }
        if let Some(span) = uniform_column_span(tbl, col).filter(|span| col + span <= cols) {
            fold_columns(tbl, col, span);
            trace!(col, span, "columns folded");
            changed = true;
        }
        col += 1;
    }
    changed
}

/// The column span shared by the cells of `col` in every row, if any is > 1.
fn uniform_column_span(tbl: &XmlElement, col: usize) -> Option<usize> {
    let mut shared = None;
    for tr in tbl.children_named("tr") {
        let span = CellSpan::from_tc(tr.children_named("tc").nth(col)?);
        if span.h_merge || span.col_span < 2 || shared.is_some_and(|s| s != span.col_span) {
            return None;
        }
        shared = Some(span.col_span);
    }
    shared
}

fn fold_columns(tbl: &mut XmlElement, col: usize, span: usize) {
    let absorbed = col + 1..col + span;
    if let Some(grid) = tbl.child_mut("tblGrid") {
        let total: i64 = grid
            .children_named("gridCol")
            .skip(col)
            .take(span)
            .map(column_width)
            .sum();
        remove_nth_named(grid, "gridCol", absorbed.clone());
        if let Some(grid_col) = grid.children_named_mut("gridCol").nth(col) {
            grid_col.set_attr("w", total.to_string());
        }
    }
    for tr in tbl.children_named_mut("tr") {
        remove_nth_named(tr, "tc", absorbed.clone());
        if let Some(tc) = tr.children_named_mut("tc").nth(col) {
            tc.remove_attr("gridSpan");
        }
    }
}

fn compact_rows(tbl: &mut XmlElement) -> bool {
    let mut changed = false;
    let mut row = 0;
    while row < tbl.children_named("tr").count() {
        if let Some(span) = uniform_row_span(tbl, row) {
            fold_rows(tbl, row, span);
            trace!(row, span, "rows folded");
            changed = true;
        }
        row += 1;
    }
    changed
}

/// The row span shared by every cell of `row`, if it is > 1.
fn uniform_row_span(tbl: &XmlElement, row: usize) -> Option<usize> {
    let rows = tbl.children_named("tr").count();
    let tr = tbl.children_named("tr").nth(row)?;
    let mut shared = None;
    for tc in tr.children_named("tc") {
        let span = CellSpan::from_tc(tc);
        if span.v_merge || span.row_span < 2 || shared.is_some_and(|s| s != span.row_span) {
            return None;
        }
        shared = Some(span.row_span);
    }
    shared.filter(|span| row + span <= rows)
}

fn fold_rows(tbl: &mut XmlElement, row: usize, span: usize) {
    let total: i64 = tbl
        .children_named("tr")
        .skip(row)
        .take(span)
        .map(row_height)
        .sum();
    remove_nth_named(tbl, "tr", row + 1..row + span);
    if let Some(tr) = tbl.children_named_mut("tr").nth(row) {
        tr.set_attr("h", total.to_string());
        for tc in tr.children_named_mut("tc") {
            tc.remove_attr("rowSpan");
        }
    }
}

/// Dissolve the region containing a cell back into single cells.
///
/// Text stays in the former top-left cell. Returns false when the cell was not
/// merged.
pub fn split_cell(tbl: &mut XmlElement, row: usize, col: usize) -> Result<bool> {
    let region = TableGrid::from_table(tbl)?.region(row, col)?;
    if region.is_single() {
        return Ok(false);
    }
    for (r, c) in region.positions() {
        CellSpan::SINGLE.write_to(cell_mut(tbl, r, c)?);
    }
    debug!(?region, "cell region split");
    Ok(true)
}

/// Text of the cell at a grid position, paragraphs joined by newlines.
pub fn cell_text(tbl: &XmlElement, row: usize, col: usize) -> Option<String> {
    let tc = cell(tbl, row, col)?;
    Some(tc.child("txBody").map(text_body_text).unwrap_or_default())
}

/// Replace the text of a cell with one paragraph per line.
pub fn set_cell_text(tbl: &mut XmlElement, row: usize, col: usize, text: &str) -> Result<()> {
    let body = ensure_text_body(cell_mut(tbl, row, col)?);
    body.remove_children(|e| e.local_name() == "p");
    for line in text.split('\n') {
        let paragraph = XmlElement::new("a:p");
        body.push(if line.is_empty() {
            paragraph
        } else {
            paragraph.with_child(
                XmlElement::new("a:r").with_child(XmlElement::new("a:t").with_text(line)),
            )
        });
    }
    Ok(())
}

/// Locate the `a:tbl` inside a graphic frame.
pub(crate) fn table_element(frame: &XmlElement) -> Option<&XmlElement> {
    frame.find(&["graphic", "graphicData", "tbl"])
}

pub(crate) fn table_element_mut(frame: &mut XmlElement) -> Option<&mut XmlElement> {
    frame.find_mut(&["graphic", "graphicData", "tbl"])
}

/// Cached grid of a table shape plus its structural revision.
///
/// The revision advances whenever columns or rows are folded, which
/// invalidates every [`CellRef`] taken before.
#[derive(Debug, Default)]
pub(crate) struct TableState {
    grid: ResettableCache<TableGrid>,
    revision: u64,
}

impl TableState {
    fn grid(&self, tbl: &XmlElement) -> Result<&TableGrid> {
        self.grid.get_or_try_init(|| {
            trace!("building table grid");
            TableGrid::from_table(tbl)
        })
    }
}

/// Handle to a grid position of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    row: usize,
    col: usize,
    revision: u64,
}

impl CellRef {
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }
}

/// A table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    pub width: i64,
}

/// A table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub height: i64,
}

/// Read-only view of a table shape.
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    tbl: &'a XmlElement,
    grid: &'a TableGrid,
    revision: u64,
}

impl<'a> Table<'a> {
    pub(crate) fn new(tbl: &'a XmlElement, state: &'a TableState) -> Result<Self> {
        Ok(Self {
            tbl,
            grid: state.grid(tbl)?,
            revision: state.revision,
        })
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.grid.row_count()
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.grid.column_count()
    }

    pub fn columns(&self) -> Vec<Column> {
        self.grid
            .column_widths()
            .iter()
            .enumerate()
            .map(|(index, &width)| Column { index, width })
            .collect()
    }

    pub fn rows(&self) -> Vec<Row> {
        self.grid
            .row_heights()
            .iter()
            .enumerate()
            .map(|(index, &height)| Row { index, height })
            .collect()
    }

    /// The validated grid snapshot.
    #[inline]
    pub fn grid(&self) -> &'a TableGrid {
        self.grid
    }

    /// The cell at a grid position.
    pub fn cell(&self, row: usize, col: usize) -> Result<Cell<'a>> {
        let span = self.grid.span(row, col)?;
        Ok(Cell {
            table: *self,
            row,
            col,
            span,
        })
    }

    /// All grid positions in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell<'a>> + '_ {
        (0..self.row_count()).flat_map(move |row| {
            (0..self.column_count()).filter_map(move |col| self.cell(row, col).ok())
        })
    }
}

/// One grid position of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    table: Table<'a>,
    row: usize,
    col: usize,
    span: CellSpan,
}

impl<'a> Cell<'a> {
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }

    /// `rowSpan` of this cell element.
    #[inline]
    pub fn row_span(&self) -> usize {
        self.span.row_span
    }

    /// `gridSpan` of this cell element.
    #[inline]
    pub fn col_span(&self) -> usize {
        self.span.col_span
    }

    /// Absorbed into a region anchored at another cell.
    #[inline]
    pub fn is_covered(&self) -> bool {
        self.span.is_covered()
    }

    /// Part of a region larger than one cell.
    pub fn is_merged(&self) -> bool {
        self.region().is_ok_and(|region| !region.is_single())
    }

    /// The region this cell belongs to.
    pub fn region(&self) -> Result<GridRect> {
        self.table.grid.region(self.row, self.col)
    }

    pub fn text(&self) -> String {
        cell_text(self.table.tbl, self.row, self.col).unwrap_or_default()
    }

    /// Handle usable with [`TableMut`] until the table is next compacted.
    pub fn handle(&self) -> CellRef {
        CellRef {
            row: self.row,
            col: self.col,
            revision: self.table.revision,
        }
    }
}

/// Mutable view of a table shape.
pub struct TableMut<'a> {
    tbl: &'a mut XmlElement,
    state: &'a mut TableState,
}

impl<'a> TableMut<'a> {
    pub(crate) fn new(tbl: &'a mut XmlElement, state: &'a mut TableState) -> Self {
        Self { tbl, state }
    }

    /// Read-only view of the current state.
    pub fn table(&self) -> Result<Table<'_>> {
        Table::new(self.tbl, self.state)
    }

    /// Handle to the cell at a grid position.
    pub fn cell(&self, row: usize, col: usize) -> Result<CellRef> {
        Ok(self.table()?.cell(row, col)?.handle())
    }

    fn check(&self, cell: CellRef) -> Result<()> {
        if cell.revision != self.state.revision {
            return Err(Error::ElementRemoved(format!(
                "cell ({}, {}) refers to a table layout that was compacted",
                cell.row, cell.col
            )));
        }
        self.state.grid(self.tbl)?.check_bounds(cell.row, cell.col)?;
        Ok(())
    }

    /// Merge the regions containing two cells, see [`merge_cells`].
    pub fn merge_cells(&mut self, a: CellRef, b: CellRef) -> Result<MergeOutcome> {
        self.check(a)?;
        self.check(b)?;
        let outcome = merge_cells(self.tbl, (a.row, a.col), (b.row, b.col))?;
        if let MergeOutcome::Merged { compacted } = outcome {
            self.state.grid.reset();
            if compacted {
                self.state.revision += 1;
            }
        }
        Ok(outcome)
    }

    /// Split the region containing a cell, see [`split_cell`].
    pub fn split_cell(&mut self, cell: CellRef) -> Result<bool> {
        self.check(cell)?;
        let split = split_cell(self.tbl, cell.row, cell.col)?;
        if split {
            self.state.grid.reset();
        }
        Ok(split)
    }

    /// Replace a cell's text; a covered cell writes to its region's top-left cell.
    pub fn set_cell_text(&mut self, cell: CellRef, text: &str) -> Result<()> {
        self.check(cell)?;
        let (row, col) = self.state.grid(self.tbl)?.anchor(cell.row, cell.col)?;
        set_cell_text(self.tbl, row, col, text)
    }

    pub fn set_column_width(&mut self, col: usize, width: i64) -> Result<()> {
        let grid = self.state.grid(self.tbl)?;
        if col >= grid.column_count() {
            return Err(Error::CellOutOfRange {
                row: 0,
                col,
                rows: grid.row_count(),
                cols: grid.column_count(),
            });
        }
        if let Some(grid_col) = self
            .tbl
            .child_mut("tblGrid")
            .and_then(|grid| grid.children_named_mut("gridCol").nth(col))
        {
            grid_col.set_attr("w", width.to_string());
        }
        self.state.grid.reset();
        Ok(())
    }

    pub fn set_row_height(&mut self, row: usize, height: i64) -> Result<()> {
        let grid = self.state.grid(self.tbl)?;
        if row >= grid.row_count() {
            return Err(Error::CellOutOfRange {
                row,
                col: 0,
                rows: grid.row_count(),
                cols: grid.column_count(),
            });
        }
        if let Some(tr) = self.tbl.children_named_mut("tr").nth(row) {
            tr.set_attr("h", height.to_string());
        }
        self.state.grid.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    /// Build an `a:tbl` with the given column widths, row heights and cell texts.
    fn table(widths: &[i64], heights: &[i64]) -> XmlElement {
        let mut xml = String::from(r#"<a:tbl xmlns:a="a"><a:tblPr/><a:tblGrid>"#);
        for w in widths {
            xml.push_str(&format!(r#"<a:gridCol w="{w}"/>"#));
        }
        xml.push_str("</a:tblGrid>");
        for (r, h) in heights.iter().enumerate() {
            xml.push_str(&format!(r#"<a:tr h="{h}">"#));
            for c in 0..widths.len() {
                xml.push_str(&format!(
                    r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>r{r}c{c}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#
                ));
            }
            xml.push_str("</a:tr>");
        }
        xml.push_str("</a:tbl>");
        XmlDocument::parse(xml.as_bytes()).unwrap().root().clone()
    }

    #[test]
    fn test_grid_of_plain_table() {
        let tbl = table(&[100, 200, 150], &[10, 20]);
        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.column_widths(), &[100, 200, 150]);
        assert_eq!(grid.row_heights(), &[10, 20]);
        assert_eq!(grid.regions().count(), 6);
        assert!(matches!(
            grid.region(2, 0),
            Err(Error::CellOutOfRange { rows: 2, cols: 3, .. })
        ));
    }

    #[test]
    fn test_self_merge_is_noop() {
        let mut tbl = table(&[100, 200], &[10, 20]);
        let before = tbl.clone();
        assert_eq!(merge_cells(&mut tbl, (1, 1), (1, 1)).unwrap(), MergeOutcome::Unchanged);
        assert_eq!(tbl, before);
    }

    #[test]
    fn test_horizontal_merge_in_one_row() {
        let mut tbl = table(&[100, 200, 150], &[10, 20]);
        let outcome = merge_cells(&mut tbl, (0, 0), (0, 1)).unwrap();
        assert_eq!(outcome, MergeOutcome::Merged { compacted: false });

        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.span(0, 0).unwrap().col_span, 2);
        assert!(grid.span(0, 1).unwrap().h_merge);
        assert_eq!(grid.region(0, 1).unwrap(), GridRect { top: 0, left: 0, bottom: 0, right: 1 });
        // Row 1 still splits columns 0 and 1, so nothing folds yet.
        assert_eq!(grid.column_widths(), &[100, 200, 150]);

        assert_eq!(cell_text(&tbl, 0, 0).unwrap(), "r0c0\nr0c1");
        assert_eq!(cell_text(&tbl, 0, 1).unwrap(), "");
    }

    #[test]
    fn test_merging_both_rows_folds_columns() {
        let mut tbl = table(&[100, 200, 150], &[10, 20]);
        merge_cells(&mut tbl, (0, 0), (0, 1)).unwrap();
        let outcome = merge_cells(&mut tbl, (1, 0), (1, 1)).unwrap();
        assert_eq!(outcome, MergeOutcome::Merged { compacted: true });

        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.column_widths(), &[300, 150]);
        assert_eq!(grid.span(0, 0).unwrap().col_span, 1);
        assert_eq!(cell_text(&tbl, 1, 0).unwrap(), "r1c0\nr1c1");
    }

    #[test]
    fn test_vertical_merge_conserves_heights() {
        let mut tbl = table(&[100], &[10, 20, 30]);
        merge_cells(&mut tbl, (0, 0), (1, 0)).unwrap();

        // A one-column table: every cell of row 0 spans two rows, so rows fold.
        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.row_heights(), &[30, 30]);
        assert_eq!(cell_text(&tbl, 0, 0).unwrap(), "r0c0\nr1c0");
    }

    #[test]
    fn test_block_merge_sets_explicit_states() {
        let mut tbl = table(&[1, 1, 1], &[1, 1, 1]);
        merge_cells(&mut tbl, (0, 0), (1, 1)).unwrap();
        let grid = TableGrid::from_table(&tbl).unwrap();

        let anchor = grid.span(0, 0).unwrap();
        assert_eq!((anchor.row_span, anchor.col_span), (2, 2));
        let right = grid.span(0, 1).unwrap();
        assert!(right.h_merge && !right.v_merge && right.row_span == 2);
        let below = grid.span(1, 0).unwrap();
        assert!(below.v_merge && !below.h_merge && below.col_span == 2);
        let inner = grid.span(1, 1).unwrap();
        assert!(inner.h_merge && inner.v_merge);
        assert_eq!(cell_text(&tbl, 0, 0).unwrap(), "r0c0\nr0c1\nr1c0\nr1c1");
    }

    #[test]
    fn test_partial_overlap_grows_to_region_boundaries() {
        let mut tbl = table(&[1, 1, 1], &[1, 1, 1]);
        merge_cells(&mut tbl, (0, 0), (1, 1)).unwrap();
        // (1,1) lies inside the 2x2 region; (2,2) is outside it.
        merge_cells(&mut tbl, (2, 2), (1, 1)).unwrap();
        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.regions().count(), 1);
    }

    #[test]
    fn test_merge_inside_region_is_noop() {
        let mut tbl = table(&[1, 1, 1], &[1, 1]);
        merge_cells(&mut tbl, (0, 0), (0, 2)).unwrap();
        assert_eq!(merge_cells(&mut tbl, (0, 1), (0, 2)).unwrap(), MergeOutcome::Unchanged);
    }

    #[test]
    fn test_split_restores_single_cells() {
        let mut tbl = table(&[1, 1, 1], &[1, 1, 1]);
        merge_cells(&mut tbl, (0, 1), (1, 2)).unwrap();
        assert!(split_cell(&mut tbl, 1, 2).unwrap());
        let grid = TableGrid::from_table(&tbl).unwrap();
        assert_eq!(grid.regions().count(), 9);
        assert!(!split_cell(&mut tbl, 1, 2).unwrap());
    }

    #[test]
    fn test_inconsistent_grid_is_reported() {
        let xml = r#"<a:tbl xmlns:a="a"><a:tblGrid><a:gridCol w="1"/><a:gridCol w="1"/></a:tblGrid><a:tr h="1"><a:tc gridSpan="3"/><a:tc hMerge="1"/></a:tr></a:tbl>"#;
        let tbl = XmlDocument::parse(xml.as_bytes()).unwrap().root().clone();
        assert!(matches!(TableGrid::from_table(&tbl), Err(Error::GridInconsistency(_))));

        let xml = r#"<a:tbl xmlns:a="a"><a:tblGrid><a:gridCol w="1"/><a:gridCol w="1"/></a:tblGrid><a:tr h="1"><a:tc/></a:tr></a:tbl>"#;
        let tbl = XmlDocument::parse(xml.as_bytes()).unwrap().root().clone();
        assert!(matches!(TableGrid::from_table(&tbl), Err(Error::GridInconsistency(_))));
    }

    #[test]
    fn test_huge_spans_are_rejected() {
        for attr in ["gridSpan", "rowSpan"] {
            let xml = format!(
                r#"<a:tbl xmlns:a="a"><a:tblGrid><a:gridCol w="1"/><a:gridCol w="1"/></a:tblGrid><a:tr h="1"><a:tc {attr}="18446744073709551615"/><a:tc/></a:tr></a:tbl>"#
            );
            let tbl = XmlDocument::parse(xml.as_bytes()).unwrap().root().clone();
            assert!(matches!(TableGrid::from_table(&tbl), Err(Error::GridInconsistency(_))));
        }

        let xml = r#"<a:tbl xmlns:a="a"><a:tblGrid><a:gridCol w="1"/><a:gridCol w="1"/></a:tblGrid><a:tr h="1"><a:tc/><a:tc gridSpan="18446744073709551615"/></a:tr></a:tbl>"#;
        let mut tbl = XmlDocument::parse(xml.as_bytes()).unwrap().root().clone();
        let before = tbl.clone();
        assert!(matches!(
            merge_cells(&mut tbl, (0, 0), (0, 1)),
            Err(Error::GridInconsistency(_))
        ));
        assert_eq!(tbl, before);
    }

    #[test]
    fn test_merge_on_broken_grid_leaves_table_untouched() {
        let xml = r#"<a:tbl xmlns:a="a"><a:tblGrid><a:gridCol w="1"/><a:gridCol w="1"/></a:tblGrid><a:tr h="1"><a:tc/><a:tc vMerge="1"/></a:tr></a:tbl>"#;
        let mut tbl = XmlDocument::parse(xml.as_bytes()).unwrap().root().clone();
        let before = tbl.clone();
        assert!(matches!(
            merge_cells(&mut tbl, (0, 0), (0, 1)),
            Err(Error::GridInconsistency(_))
        ));
        assert_eq!(tbl, before);
    }

    #[test]
    fn test_set_cell_text() {
        let mut tbl = table(&[1], &[1]);
        set_cell_text(&mut tbl, 0, 0, "first\n\nthird").unwrap();
        assert_eq!(cell_text(&tbl, 0, 0).unwrap(), "first\n\nthird");
    }

    #[test]
    fn test_table_mut_rejects_stale_handles() {
        let mut tbl = table(&[100, 200, 150], &[10, 20]);
        let mut state = TableState::default();
        let mut view = TableMut::new(&mut tbl, &mut state);

        let a = view.cell(0, 0).unwrap();
        let b = view.cell(0, 1).unwrap();
        let c = view.cell(1, 0).unwrap();
        let d = view.cell(1, 1).unwrap();
        view.merge_cells(a, b).unwrap();
        view.merge_cells(c, d).unwrap();

        assert!(matches!(view.set_cell_text(a, "x"), Err(Error::ElementRemoved(_))));
        let fresh = view.cell(0, 0).unwrap();
        view.set_cell_text(fresh, "x").unwrap();
        assert_eq!(view.table().unwrap().cell(0, 0).unwrap().text(), "x");
    }

    #[test]
    fn test_column_and_row_setters() {
        let mut tbl = table(&[100, 200], &[10]);
        let mut state = TableState::default();
        let mut view = TableMut::new(&mut tbl, &mut state);
        view.set_column_width(1, 250).unwrap();
        view.set_row_height(0, 40).unwrap();
        let table = view.table().unwrap();
        assert_eq!(table.columns()[1].width, 250);
        assert_eq!(table.rows()[0].height, 40);
        assert!(view.set_row_height(3, 1).is_err());
        assert!(view.set_column_width(2, 1).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn dims() -> impl Strategy<Value = (Vec<i64>, Vec<i64>)> {
            (
                proptest::collection::vec(1i64..10_000, 1..5),
                proptest::collection::vec(1i64..10_000, 1..5),
            )
        }

        proptest! {
            #[test]
            fn merges_keep_grid_valid_and_conserve_extent(
                (widths, heights) in dims(),
                ops in proptest::collection::vec((0usize..5, 0usize..5, 0usize..5, 0usize..5), 1..8),
            ) {
                let mut tbl = table(&widths, &heights);
                let total_width: i64 = widths.iter().sum();
                let total_height: i64 = heights.iter().sum();

                for (r1, c1, r2, c2) in ops {
                    let before = tbl.clone();
                    match merge_cells(&mut tbl, (r1, c1), (r2, c2)) {
                        Ok(_) => {},
                        Err(Error::CellOutOfRange { .. }) => prop_assert_eq!(&tbl, &before),
                        Err(other) => prop_assert!(false, "unexpected error: {other}"),
                    }
                    let grid = TableGrid::from_table(&tbl).unwrap();
                    prop_assert_eq!(grid.column_widths().iter().sum::<i64>(), total_width);
                    prop_assert_eq!(grid.row_heights().iter().sum::<i64>(), total_height);

                    let covered: usize = grid.regions().map(|r| r.row_count() * r.column_count()).sum();
                    prop_assert_eq!(covered, grid.row_count() * grid.column_count());
                }
            }
        }
    }
}
