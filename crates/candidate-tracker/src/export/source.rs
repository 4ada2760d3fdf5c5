//! Row sources feeding the encoders.
//!
//! A [`RowSource`] hands out rows in `offset`/`limit` slices so encoders can walk
//! arbitrarily large relations chunk by chunk. Two shapes exist: [`ListRowSource`]
//! over an already materialized vector, and [`PagedRowSource`] over a page-fetch
//! function such as a repository query.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::SourceError;
use super::value::ExportValue;

type Extractor<T> = Box<dyn Fn(&T) -> ExportValue + Send + Sync>;

/// Ordered header/extractor pairs. Header `i` always describes the value of extractor `i`.
pub struct Columns<T> {
    headers: Vec<String>,
    extractors: Vec<Extractor<T>>,
}

impl<T> Columns<T> {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            extractors: Vec::new(),
        }
    }

    pub fn column<F>(mut self, header: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&T) -> ExportValue + Send + Sync + 'static,
    {
        self.headers.push(header.into());
        self.extractors.push(Box::new(extract));
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Apply every extractor to `row`, in header order.
    pub fn extract(&self, row: &T) -> Vec<ExportValue> {
        self.extractors.iter().map(|extract| extract(row)).collect()
    }
}

impl<T> Default for Columns<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Columns<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Columns")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Storage-independent access to the rows of one export.
pub trait RowSource<T: Clone>: Send {
    fn columns(&self) -> &Columns<T>;

    /// Rows `offset..offset + limit`, clamped to what exists. Past the end yields an empty slice.
    fn fetch(&self, offset: usize, limit: usize) -> Result<Cow<'_, [T]>, SourceError>;

    fn total_count(&self) -> Result<usize, SourceError>;
}

impl<T, S> RowSource<T> for Box<S>
where
    T: Clone,
    S: RowSource<T> + ?Sized,
{
    fn columns(&self) -> &Columns<T> {
        (**self).columns()
    }

    fn fetch(&self, offset: usize, limit: usize) -> Result<Cow<'_, [T]>, SourceError> {
        (**self).fetch(offset, limit)
    }

    fn total_count(&self) -> Result<usize, SourceError> {
        (**self).total_count()
    }
}

/// Row source over an ordered, fully materialized sequence.
pub struct ListRowSource<T> {
    rows: Vec<T>,
    columns: Arc<Columns<T>>,
}

impl<T> ListRowSource<T> {
    pub fn new(rows: Vec<T>, columns: Arc<Columns<T>>) -> Self {
        Self { rows, columns }
    }
}

impl<T> RowSource<T> for ListRowSource<T>
where
    T: Clone + Send + Sync,
{
    fn columns(&self) -> &Columns<T> {
        &self.columns
    }

    fn fetch(&self, offset: usize, limit: usize) -> Result<Cow<'_, [T]>, SourceError> {
        if limit == 0 {
            return Err(SourceError::ZeroLimit);
        }
        let start = offset.min(self.rows.len());
        let end = offset.saturating_add(limit).min(self.rows.len());
        Ok(Cow::Borrowed(&self.rows[start..end]))
    }

    fn total_count(&self) -> Result<usize, SourceError> {
        Ok(self.rows.len())
    }
}

/// Zero-based page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of rows together with the size of the whole relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_elements: usize,
}

type PageFetch<T> = Box<dyn Fn(PageRequest) -> Result<Page<T>, SourceError> + Send + Sync>;

/// Row source backed by a page-fetch function.
///
/// The page index is derived as `offset / limit`, so callers must use one stable
/// `limit` for a whole export. Offsets that are not a multiple of `limit` are
/// rejected rather than silently mapped to the wrong page.
pub struct PagedRowSource<T> {
    fetch_page: PageFetch<T>,
    columns: Arc<Columns<T>>,
    total: OnceLock<usize>,
}

impl<T> PagedRowSource<T> {
    pub fn new<F>(fetch_page: F, columns: Arc<Columns<T>>) -> Self
    where
        F: Fn(PageRequest) -> Result<Page<T>, SourceError> + Send + Sync + 'static,
    {
        Self {
            fetch_page: Box::new(fetch_page),
            columns,
            total: OnceLock::new(),
        }
    }
}

impl<T> RowSource<T> for PagedRowSource<T>
where
    T: Clone + Send + Sync,
{
    fn columns(&self) -> &Columns<T> {
        &self.columns
    }

    fn fetch(&self, offset: usize, limit: usize) -> Result<Cow<'_, [T]>, SourceError> {
        if limit == 0 {
            return Err(SourceError::ZeroLimit);
        }
        if offset % limit != 0 {
            return Err(SourceError::UnalignedOffset { offset, limit });
        }

        let page = (self.fetch_page)(PageRequest::new(offset / limit, limit))?;
        let _ = self.total.set(page.total_elements);

        let mut rows = page.rows;
        rows.truncate(limit);
        Ok(Cow::Owned(rows))
    }

    fn total_count(&self) -> Result<usize, SourceError> {
        if let Some(total) = self.total.get() {
            return Ok(*total);
        }

        let page = (self.fetch_page)(PageRequest::new(0, 1))?;
        debug!(total = page.total_elements, "resolved paged row source size");
        Ok(*self.total.get_or_init(|| page.total_elements))
    }
}

/// Adapt an offset/limit slice function into a page-fetch function that only
/// sees the rows of `window`.
///
/// Page `n` of size `s` returned by the adapter covers rows
/// `window.offset() + n * s ..` of the underlying relation, truncated at the
/// window's end, and `total_elements` reports the number of rows inside the window.
pub fn window_fetch<T, F>(
    window: PageRequest,
    slice: F,
) -> impl Fn(PageRequest) -> Result<Page<T>, SourceError> + Send + Sync + 'static
where
    T: 'static,
    F: Fn(usize, usize) -> Result<Page<T>, SourceError> + Send + Sync + 'static,
{
    move |request: PageRequest| {
        let window_start = window.offset();
        let window_end = window_start.saturating_add(window.size);
        let start = window_start.saturating_add(request.offset());

        if start >= window_end {
            let head = slice(window_start, 1)?;
            return Ok(Page {
                rows: Vec::new(),
                total_elements: clamp_to_window(head.total_elements, window_start, window.size),
            });
        }

        let limit = request.size.min(window_end - start);
        let page = slice(start, limit)?;
        Ok(Page {
            total_elements: clamp_to_window(page.total_elements, window_start, window.size),
            rows: page.rows,
        })
    }
}

fn clamp_to_window(total: usize, window_start: usize, window_size: usize) -> usize {
    total.saturating_sub(window_start).min(window_size)
}
