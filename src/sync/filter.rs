//! In-memory search, filtering and sorting over task lists

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::entities::task::{self, TaskPriority, TaskStatus};
use crate::utils::datetime;

/// Due-date buckets, all relative to the start of today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueWindow {
    /// Due before today
    Overdue,
    Today,
    /// Today through the next six days
    Week,
    /// Today up to the same day next month
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskCounts {
    pub all: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Text query over title, description and tags, then status and tag filters
///
/// `None` status and an empty tag list mean "any".
pub fn search_tasks(
    tasks: &[task::Model],
    query: &str,
    status: Option<TaskStatus>,
    tags: &[String],
) -> Vec<task::Model> {
    let query = query.trim().to_lowercase();
    let matches_query = |t: &task::Model| {
        query.is_empty()
            || t.title.to_lowercase().contains(&query)
            || t.description.as_deref().unwrap_or("").to_lowercase().contains(&query)
            || t.tags().iter().any(|tag| tag.to_lowercase().contains(&query))
    };

    let found: Vec<task::Model> = tasks.iter().filter(|t| matches_query(t)).cloned().collect();
    let found = match status {
        Some(status) => filter_by_status(&found, status),
        None => found,
    };
    filter_by_tags(&found, tags)
}

pub fn filter_by_status(tasks: &[task::Model], status: TaskStatus) -> Vec<task::Model> {
    tasks.iter().filter(|t| t.status == status).cloned().collect()
}

pub fn filter_by_priority(tasks: &[task::Model], priority: TaskPriority) -> Vec<task::Model> {
    tasks.iter().filter(|t| t.priority == priority).cloned().collect()
}

/// Tasks carrying at least one of `tags`, compared case-insensitively
pub fn filter_by_tags(tasks: &[task::Model], tags: &[String]) -> Vec<task::Model> {
    if tags.is_empty() {
        return tasks.to_vec();
    }
    let wanted: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    tasks
        .iter()
        .filter(|t| t.tags().iter().any(|tag| wanted.contains(&tag.to_lowercase())))
        .cloned()
        .collect()
}

/// Tasks with a due date inside `window`; undated tasks never match
pub fn filter_by_due(tasks: &[task::Model], window: DueWindow, now: DateTime<Utc>) -> Vec<task::Model> {
    let today = datetime::start_of_day(&now);
    let end = match window {
        DueWindow::Overdue => today,
        DueWindow::Today => datetime::day_offset(&now, 1),
        DueWindow::Week => datetime::day_offset(&now, 7),
        DueWindow::Month => datetime::month_after(&now),
    };

    tasks
        .iter()
        .filter(|t| match (t.due_date, window) {
            (None, _) => false,
            (Some(due), DueWindow::Overdue) => due < today,
            (Some(due), _) => due >= today && due < end,
        })
        .cloned()
        .collect()
}

/// Every tag in use, deduplicated and sorted
pub fn extract_unique_tags(tasks: &[task::Model]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| t.tags())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn task_counts(tasks: &[task::Model]) -> TaskCounts {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    TaskCounts {
        all: tasks.len(),
        pending: count(TaskStatus::Pending),
        in_progress: count(TaskStatus::InProgress),
        completed: count(TaskStatus::Completed),
    }
}

/// Stable sort; tasks without a due date always go last
pub fn sort_tasks(tasks: &[task::Model], key: SortKey, order: SortOrder) -> Vec<task::Model> {
    let directed = |ordering: Ordering| match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };

    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| match key {
        SortKey::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortKey::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at)),
        SortKey::Priority => directed(a.priority.weight().cmp(&b.priority.weight())),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => directed(x.cmp(&y)),
        },
    });
    sorted
}

/// One page of a list, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

/// Slice `items` into page `page` of `page_size` entries
///
/// Page 0 reads as page 1 and a zero page size as [`DEFAULT_PAGE_SIZE`]. A
/// page past the end is empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size);

    Page {
        items: items.iter().skip(start).take(page_size).cloned().collect(),
        page,
        page_size,
        total_items: items.len(),
        total_pages: items.len().div_ceil(page_size),
        has_more: end < items.len(),
    }
}
