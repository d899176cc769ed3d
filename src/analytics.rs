//! Dashboard numbers for the signed-in poster.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::{company, job};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyCount {
    /// Three-letter month name
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Overview {
    pub total_jobs: u64,
    pub my_jobs: u64,
    pub total_companies: u64,
    pub my_companies: u64,
    /// Caller's jobs created per month of the current year
    pub jobs_by_month: Vec<MonthlyCount>,
    /// Caller's companies created per month of the current year
    pub companies_by_month: Vec<MonthlyCount>,
}

/// Buckets `dates` falling in `year` into a Jan..Dec series.
pub fn monthly_series<I>(dates: I, year: i32) -> Vec<MonthlyCount>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts = [0u64; 12];
    for date in dates.into_iter().filter(|d| d.year() == year) {
        counts[date.month0() as usize] += 1;
    }
    MONTHS
        .iter()
        .zip(counts)
        .map(|(month, count)| MonthlyCount {
            month: month.to_string(),
            count,
        })
        .collect()
}

#[tracing::instrument(skip(db))]
pub async fn overview<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Overview, DbErr> {
    let total_jobs = job::Entity::find().count(db).await?;
    let total_companies = company::Entity::find().count(db).await?;

    let job_dates: Vec<DateTime<Utc>> = job::Entity::find()
        .select_only()
        .column(job::Column::CreatedAt)
        .filter(job::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    let company_dates: Vec<DateTime<Utc>> = company::Entity::find()
        .select_only()
        .column(company::Column::CreatedAt)
        .filter(company::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(Overview {
        total_jobs,
        my_jobs: job_dates.len() as u64,
        total_companies,
        my_companies: company_dates.len() as u64,
        jobs_by_month: monthly_series(job_dates, now.year()),
        companies_by_month: monthly_series(company_dates, now.year()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn series_covers_every_month_in_order() {
        let series = monthly_series(Vec::new(), 2025);
        assert_eq!(series.len(), 12);
        assert_eq!(series[0].month, "Jan");
        assert_eq!(series[11].month, "Dec");
        assert!(series.iter().all(|m| m.count == 0));
    }

    #[test]
    fn only_the_requested_year_is_counted() {
        let dates = vec![
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2025, 12, 24, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
        ];
        let series = monthly_series(dates, 2025);
        assert_eq!(series[2].count, 2);
        assert_eq!(series[11].count, 1);
        assert_eq!(series.iter().map(|m| m.count).sum::<u64>(), 3);
    }
}
