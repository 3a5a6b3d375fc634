use crate::catalog::Category;
use crate::daily_store::{DailyStore, HistoryLedger};
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category: Category,
    pub completed: usize,
    pub total: usize,
}

impl CategoryProgress {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

impl fmt::Display for CategoryProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.completed, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub movies: CategoryProgress,
    pub albums: CategoryProgress,
}

impl Progress {
    pub fn for_category(&self, category: Category) -> &CategoryProgress {
        match category {
            Category::Movie => &self.movies,
            Category::Album => &self.albums,
        }
    }
}

pub fn completed_count<L: HistoryLedger + ?Sized>(ledger: &L, category: Category) -> Result<usize> {
    ledger.count_in(category)
}

fn category_progress<S: DailyStore + ?Sized>(store: &S, category: Category) -> Result<CategoryProgress> {
    Ok(CategoryProgress {
        category,
        completed: store.count_in(category)?,
        total: store.count(category)?,
    })
}

/// Derived entirely from the history ledger and the catalog size.
pub fn progress_snapshot<S: DailyStore + ?Sized>(store: &S) -> Result<Progress> {
    Ok(Progress {
        movies: category_progress(store, Category::Movie)?,
        albums: category_progress(store, Category::Album)?,
    })
}
