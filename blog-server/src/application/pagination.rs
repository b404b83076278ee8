use serde::Serialize;

use crate::domain::error::DomainError;

/// Posts per listing page.
pub const PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub per_page: u32,
    pub num_pages: u32,
    pub total: u64,
    /// A further page of older posts exists.
    pub has_older: bool,
    /// A previous page of newer posts exists.
    pub has_newer: bool,
    /// Navigation is shown only once the listing spans more than one page.
    pub is_paginated: bool,
}

impl PageInfo {
    /// An empty listing still has page 1; anything past the last page is
    /// `PageNotFound`.
    pub fn new(number: u32, per_page: u32, total: u64) -> Result<Self, DomainError> {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(u64::from(per_page)).max(1);
        if number == 0 || u64::from(number) > num_pages {
            return Err(DomainError::PageNotFound(number));
        }
        let num_pages = num_pages as u32;
        Ok(Self {
            number,
            per_page,
            num_pages,
            total,
            has_older: number < num_pages,
            has_newer: number > 1,
            is_paginated: num_pages > 1,
        })
    }

    pub fn offset(&self) -> u32 {
        (self.number - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}
