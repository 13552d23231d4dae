//! Filtering, sorting and paging of the node table.

use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{KekError, Result};
use crate::graph::{GraphNode, OwnershipGraph};

/// Sortable node table columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Type,
    Label,
    State,
    InDegree,
    OutDegree,
    NumOwners,
    NumOwnersWeighted,
    NumMedias,
    NumMediasWeighted,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Type,
        Column::Label,
        Column::State,
        Column::InDegree,
        Column::OutDegree,
        Column::NumOwners,
        Column::NumOwnersWeighted,
        Column::NumMedias,
        Column::NumMediasWeighted,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Label => "label",
            Column::State => "state",
            Column::InDegree => "in_degree",
            Column::OutDegree => "out_degree",
            Column::NumOwners => "num_owners",
            Column::NumOwnersWeighted => "num_owners_weighted",
            Column::NumMedias => "num_medias",
            Column::NumMediasWeighted => "num_medias_weighted",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Column::Type => "type",
            Column::Label => "name",
            Column::State => "state",
            Column::InDegree => "num in",
            Column::OutDegree => "num out",
            Column::NumOwners => "num owners",
            Column::NumOwnersWeighted => "num owners (weighted)",
            Column::NumMedias => "num medias",
            Column::NumMediasWeighted => "num medias (weighted)",
        }
    }

    /// Numeric columns are right-aligned
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Type | Column::Label | Column::State)
    }

    pub fn parse(key: &str) -> Result<Self> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.key() == key)
            .ok_or_else(|| KekError::InvalidInput(format!("unknown column '{}'", key)))
    }

    fn compare(&self, a: &GraphNode, b: &GraphNode) -> Ordering {
        match self {
            Column::Type => a.kind.as_str().cmp(b.kind.as_str()),
            Column::Label => a.label.cmp(&b.label),
            Column::State => a.state.cmp(&b.state),
            Column::InDegree => a.in_degree.cmp(&b.in_degree),
            Column::OutDegree => a.out_degree.cmp(&b.out_degree),
            Column::NumOwners => a.num_owners.cmp(&b.num_owners),
            Column::NumOwnersWeighted => a.num_owners_weighted.total_cmp(&b.num_owners_weighted),
            Column::NumMedias => a.num_medias.cmp(&b.num_medias),
            Column::NumMediasWeighted => a.num_medias_weighted.total_cmp(&b.num_medias_weighted),
        }
    }
}

/// Sort order, written `column` (ascending) or `-column` (descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: Column,
    pub descending: bool,
}

impl Order {
    /// Parse an order string; empty means unsorted.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        let (descending, key) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        Ok(Some(Order {
            column: Column::parse(key)?,
            descending,
        }))
    }

    /// Next order after clicking a column header: unsorted, descending,
    /// ascending, unsorted again.
    pub fn cycle(current: Option<Order>, column: Column) -> Option<Order> {
        match current {
            Some(order) if order.column == column && order.descending => Some(Order {
                column,
                descending: false,
            }),
            Some(order) if order.column == column => None,
            _ => Some(Order {
                column,
                descending: true,
            }),
        }
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.descending {
            write!(f, "-{}", self.column.key())
        } else {
            f.write_str(self.column.key())
        }
    }
}

/// One page of the node table
#[derive(Debug, Clone, Serialize)]
pub struct Page<'a> {
    pub rows: Vec<&'a GraphNode>,
    pub page: usize,
    pub num_pages: usize,
    pub total: usize,
}

/// Nodes whose label contains `query`, ignoring case.
pub fn filter_rows<'a>(graph: &'a OwnershipGraph, query: &str) -> Vec<&'a GraphNode> {
    let query = query.to_lowercase();
    graph
        .nodes()
        .iter()
        .filter(|node| node.label.to_lowercase().contains(&query))
        .collect()
}

pub fn sort_rows(rows: &mut [&GraphNode], order: Option<Order>) {
    if let Some(order) = order {
        rows.sort_by(|a, b| {
            let ordering = order.column.compare(a, b);
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

/// Sort `rows` and cut out one page; the page number is clamped to the
/// available pages.
pub fn paginate<'a>(mut rows: Vec<&'a GraphNode>, order: Option<Order>, page: usize, per_page: usize) -> Page<'a> {
    let per_page = per_page.max(1);
    let total = rows.len();
    let num_pages = total.div_ceil(per_page).max(1);
    let page = page.min(num_pages - 1);

    sort_rows(&mut rows, order);
    let rows = rows.into_iter().skip(page * per_page).take(per_page).collect();

    Page {
        rows,
        page,
        num_pages,
        total,
    }
}
