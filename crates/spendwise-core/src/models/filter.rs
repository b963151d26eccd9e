use chrono::NaiveDate;
use url::form_urlencoded;

/// Date format the expenses endpoint accepts for `start_date`/`end_date`
const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Criteria for `GET /expenses/`.
///
/// Every field is optional and an absent field leaves that dimension
/// unconstrained. Empty strings and zero numbers count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl ExpenseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Set or clear the year. Clearing it also clears the month, since a
    /// month without a year selects nothing server-side.
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        if year.is_none() {
            self.month = None;
        }
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Populated fields as query parameters, always in the order
    /// category, month, year, start_date, end_date, limit.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("category", category.to_string()));
        }
        if let Some(month) = self.month.filter(|m| *m != 0) {
            pairs.push(("month", month.to_string()));
        }
        if let Some(year) = self.year.filter(|y| *y != 0) {
            pairs.push(("year", year.to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.format(QUERY_DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.format(QUERY_DATE_FORMAT).to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l != 0) {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }

    /// Form-urlencoded query string (no leading `?`)
    pub fn query_string(&self) -> String {
        encode_query(&self.query_pairs())
    }
}

/// Encode pairs as `application/x-www-form-urlencoded`
pub(crate) fn encode_query(pairs: &[(&str, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}
