// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::Serialize;

/// Position within a paginated result set. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            total,
        }
    }

    /// Resolve a requested page number where `-1` means the last page.
    pub fn resolve_page(requested: i64, per_page: u32, total: u64) -> u32 {
        if requested < 0 {
            Self::new(1, per_page, total).pages().max(1)
        } else {
            u32::try_from(requested).unwrap_or(u32::MAX).max(1)
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn pages(&self) -> u32 {
        let pages = self.total.div_ceil(self.per_page as u64);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn prev_num(&self) -> Option<u32> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<u32> {
        self.has_next().then(|| self.page + 1)
    }

    /// Page 1 of an empty result is in range, anything past the last page is not.
    pub fn is_out_of_range(&self) -> bool {
        self.page > 1 && self.page > self.pages()
    }

    /// Page numbers for a pager widget. `None` marks a gap.
    pub fn iter_pages(
        &self,
        left_edge: u32,
        left_current: u32,
        right_current: u32,
        right_edge: u32,
    ) -> Vec<Option<u32>> {
        let pages = self.pages();
        let page = self.page as u64;
        let mut out = Vec::new();
        let mut last = 0;

        for num in 1..=pages {
            let n = num as u64;
            let near_left = num <= left_edge;
            let near_current = n + left_current as u64 + 1 > page && n < page + right_current as u64;
            let near_right = n + right_edge as u64 > pages as u64;

            if near_left || near_current || near_right {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }

        out
    }
}

/// One page of items plus its position.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub links: Vec<Option<u32>>,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self {
            items,
            links: pagination.iter_pages(2, 2, 5, 2),
            prev: pagination.prev_num(),
            next: pagination.next_num(),
            pagination,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
            links: self.links,
            prev: self.prev,
            next: self.next,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
