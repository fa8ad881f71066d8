use crate::models::{ExperienceLevel, JobListing, JobType, SalaryRange, SortMode};

pub const PAGE_SIZE: usize = 10;
const PAGE_WINDOW: u32 = 5;

/// Everything the user can adjust about which listings are visible.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub search_query: String,
    pub location_query: String,
    pub job_type: Option<JobType>,
    pub experience: Option<ExperienceLevel>,
    pub salary: Option<SalaryRange>,
    pub remote_only: bool,
    pub sort: SortMode,
    pub current_page: u32, // 1-based
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            location_query: String::new(),
            job_type: None,
            experience: None,
            salary: None,
            remote_only: false,
            sort: SortMode::Newest,
            current_page: 1,
        }
    }
}

impl QueryState {
    /// Resets the dropdown filters, remote toggle and sort mode. The search
    /// text, location text and current page are left as they are.
    pub fn clear_filters(&mut self) {
        self.job_type = None;
        self.experience = None;
        self.salary = None;
        self.remote_only = false;
        self.sort = SortMode::Newest;
    }

    pub fn has_active_filters(&self) -> bool {
        self.job_type.is_some() || self.experience.is_some() || self.salary.is_some() || self.remote_only
    }

    /// Pulls `current_page` back into `1..=total_pages` (page 1 when there are no pages).
    pub fn clamp_page(&mut self, total_pages: u32) {
        self.current_page = self.current_page.clamp(1, total_pages.max(1));
    }

    fn matches(&self, job: &JobListing) -> bool {
        let search = self.search_query.to_lowercase();
        let location = self.location_query.to_lowercase();

        let matches_title = job.title.to_lowercase().contains(&search);
        let matches_location = location.is_empty()
            || job.location.to_lowercase().contains(&location)
            || job.country.to_lowercase().contains(&location);
        let matches_type = self.job_type.is_none_or(|t| job.job_type == t);
        let matches_experience = self.experience.is_none_or(|e| job.experience_level == e);
        let matches_salary = self.salary.is_none_or(|s| job.salary_range == s);
        let matches_remote = !self.remote_only || job.is_remote;

        matches_title && matches_location && matches_type && matches_experience && matches_salary && matches_remote
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    pub page: Vec<&'a JobListing>,
    pub total_matched: usize,
    pub total_pages: u32,
}

impl QueryResult<'_> {
    pub fn has_previous(&self, current_page: u32) -> bool {
        current_page > 1
    }

    pub fn has_next(&self, current_page: u32) -> bool {
        current_page < self.total_pages
    }
}

/// Filters, sorts and slices `records` for `state`. Does not clamp
/// `state.current_page`: a page past the end is simply empty.
pub fn apply<'a>(records: &'a [JobListing], state: &QueryState) -> QueryResult<'a> {
    let mut matched: Vec<&JobListing> = records.iter().filter(|job| state.matches(job)).collect();

    // sort_by_key is stable, so equal keys keep their filtered order.
    // Unparsable recency goes last in either direction.
    match state.sort {
        SortMode::Newest => matched.sort_by_key(|job| match job.posted_minutes_ago {
            Some(minutes) => (false, minutes as i64),
            None => (true, 0),
        }),
        SortMode::Oldest => matched.sort_by_key(|job| match job.posted_minutes_ago {
            Some(minutes) => (false, -(minutes as i64)),
            None => (true, 0),
        }),
        SortMode::Salary => {}
    }

    let total_matched = matched.len();
    let total_pages = total_matched.div_ceil(PAGE_SIZE) as u32;

    let page = match state.current_page.checked_sub(1) {
        Some(index) => matched
            .into_iter()
            .skip(index as usize * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect(),
        None => Vec::new(),
    };

    QueryResult {
        page,
        total_matched,
        total_pages,
    }
}

/// Page numbers for the pagination strip: at most five, centred on the
/// current page where possible.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<u32> {
    if total_pages <= PAGE_WINDOW {
        return (1..=total_pages).collect();
    }
    let start = if current_page <= 3 {
        1
    } else if current_page >= total_pages - 2 {
        total_pages - PAGE_WINDOW + 1
    } else {
        current_page - 2
    };
    (start..start + PAGE_WINDOW).collect()
}
