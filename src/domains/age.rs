use chrono::{Datelike, NaiveDate, Utc};

use crate::models::Group;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole years between `date_of_birth` and `on`, never negative.
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> i64 {
    let mut age = i64::from(on.year() - date_of_birth.year());
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0)
}

/// Groups whose age range contains at least one of `ages`.
pub fn groups_for_ages<'a>(groups: &'a [Group], ages: &[i64]) -> Vec<&'a Group> {
    groups
        .iter()
        .filter(|group| ages.iter().any(|age| group.contains_age(*age)))
        .collect()
}
