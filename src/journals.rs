use chrono::NaiveDate;
use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A named travel record of a user, bounded by a date range
#[derive(Clone, Debug)]
pub struct Journal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

impl Journal {
    /// Is the date inside the journal interval, both ends inclusive
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
