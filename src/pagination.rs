/// Splits a result set of `total` rows into fixed-size pages.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: i64,
    per_page: i64,
}

/// The slice of the result set a page covers, before its rows are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub items: Vec<T>,
}

impl Paginator {
    pub fn new(total: i64, per_page: i64) -> Self {
        Self {
            total: total.max(0),
            per_page: per_page.max(1),
        }
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> i64 {
        if self.total == 0 {
            1
        } else {
            (self.total + self.per_page - 1) / self.per_page
        }
    }

    /// Looks up a page from a raw query value. Missing or garbage input
    /// yields the first page; out-of-range numbers clamp to the nearest
    /// valid page, including digit strings too long for an `i64`.
    pub fn get_page(&self, raw: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match raw.map(str::trim) {
            Some(value) => match value.parse::<i64>() {
                Ok(number) => number,
                Err(_) if is_digits(value) => num_pages,
                Err(_) => 1,
            },
            None => 1,
        }
        .clamp(1, num_pages);
        PageWindow {
            number,
            num_pages,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

fn is_digits(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl PageWindow {
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn with_items<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            items,
        }
    }
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> i64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn previous_number(&self) -> i64 {
        (self.number - 1).max(1)
    }
}
