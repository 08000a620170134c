//! Paged row iterators
//!
//! Both iterators fetch `batch_size` rows per query and continue from the
//! last row they returned (keyset paging), so they never hold a statement
//! open between calls to `next`. Rows written during iteration are picked
//! up if they sort after the cursor.

use super::schema::{self, EventRow, Row};
use crate::serializer::ContainerSerializer;
use chronicle_core::{
    AttributeContainer, Container, ContainerType, Event, Identifier, Result, TimeRange,
};
use rusqlite::Connection;
use std::collections::VecDeque;

/// Containers of one type in identifier order
pub(crate) struct ContainerPages<'a> {
    connection: &'a Connection,
    serializer: &'a ContainerSerializer,
    container_type: ContainerType,
    batch_size: usize,
    last_row_id: i64,
    buffer: VecDeque<Row>,
    exhausted: bool,
}

impl<'a> ContainerPages<'a> {
    pub(crate) fn new(
        connection: &'a Connection,
        serializer: &'a ContainerSerializer,
        container_type: ContainerType,
        batch_size: usize,
    ) -> Self {
        ContainerPages {
            connection,
            serializer,
            container_type,
            batch_size,
            last_row_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let rows = schema::read_rows_after(
            self.connection,
            self.container_type,
            self.last_row_id,
            self.batch_size,
        )?;
        self.exhausted = rows.len() < self.batch_size;
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for ContainerPages<'_> {
    type Item = Result<AttributeContainer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }

        let (row_id, data) = self.buffer.pop_front()?;
        self.last_row_id = row_id;
        let result = self
            .serializer
            .deserialize(self.container_type, &data)
            .map(|mut container| {
                container.set_identifier(Identifier::new(self.container_type, row_id as u64));
                container
            });
        Some(result)
    }
}

/// Events by ascending `(timestamp, identifier)` within an inclusive range
pub(crate) struct SortedEventPages<'a> {
    connection: &'a Connection,
    serializer: &'a ContainerSerializer,
    batch_size: usize,
    cursor: (i64, i64),
    end: i64,
    buffer: VecDeque<EventRow>,
    exhausted: bool,
}

impl<'a> SortedEventPages<'a> {
    pub(crate) fn new(
        connection: &'a Connection,
        serializer: &'a ContainerSerializer,
        time_range: Option<TimeRange>,
        batch_size: usize,
    ) -> Self {
        let (start, end) = time_range.map_or((i64::MIN, i64::MAX), |r| (r.start, r.end));
        SortedEventPages {
            connection,
            serializer,
            batch_size,
            // Identifiers start at 1, so (start, 0) includes every row at `start`
            cursor: (start, 0),
            end,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let rows =
            schema::read_events_after(self.connection, self.cursor, self.end, self.batch_size)?;
        self.exhausted = rows.len() < self.batch_size;
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for SortedEventPages<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }

        let (timestamp, row_id, data) = self.buffer.pop_front()?;
        self.cursor = (timestamp, row_id);
        let result = self
            .serializer
            .deserialize(ContainerType::Event, &data)
            .and_then(|container| container.downcast::<Event>())
            .map(|mut event| {
                event.set_identifier(Identifier::new(ContainerType::Event, row_id as u64));
                event
            });
        Some(result)
    }
}
