//! Job search: typed filter criteria, the predicate builder and the query that
//! backs the search page, the saved-jobs page and the home page listing.
//!
//! Raw query parameters (`JobSearchParams`) are converted into a `JobFilter`,
//! which `build_condition` turns into a single sea-orm `Condition`. The filter
//! state also round-trips through a URL query string so the search UI can keep
//! it in the address bar.

use chrono::{DateTime, Datelike, Days, Duration, Local, NaiveDate, TimeZone, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbBackend, DbErr, EntityTrait, LoaderTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{attachment, category, company, job, saved_job};
use crate::error::AppError;

/// Posting-date buckets offered by the search UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedAtFilter {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    /// Any other value; it imposes no effective lower bound.
    Unrecognized(String),
}

impl CreatedAtFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "today" => CreatedAtFilter::Today,
            "yesterday" => CreatedAtFilter::Yesterday,
            "thisWeek" => CreatedAtFilter::ThisWeek,
            "lastWeek" => CreatedAtFilter::LastWeek,
            "thisMonth" => CreatedAtFilter::ThisMonth,
            other => CreatedAtFilter::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CreatedAtFilter::Today => "today",
            CreatedAtFilter::Yesterday => "yesterday",
            CreatedAtFilter::ThisWeek => "thisWeek",
            CreatedAtFilter::LastWeek => "lastWeek",
            CreatedAtFilter::ThisMonth => "thisMonth",
            CreatedAtFilter::Unrecognized(raw) => raw,
        }
    }

    /// Inclusive lower bound on `created_at`, computed in `now`'s time zone.
    ///
    /// `today` is the current instant itself (the time of day is kept), the
    /// week buckets count back to Sunday and `thisMonth` starts at local
    /// midnight on the 1st.
    pub fn lower_bound<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        let days_from_sunday = u64::from(now.weekday().num_days_from_sunday());
        match self {
            CreatedAtFilter::Today => now.with_timezone(&Utc),
            CreatedAtFilter::Yesterday => days_back(now, 1),
            CreatedAtFilter::ThisWeek => days_back(now, days_from_sunday),
            CreatedAtFilter::LastWeek => days_back(now, days_from_sunday + 7),
            CreatedAtFilter::ThisMonth => start_of_month(now).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            CreatedAtFilter::Unrecognized(_) => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Calendar-day subtraction in local time, keeping the time of day.
fn days_back<Tz: TimeZone>(now: &DateTime<Tz>, days: u64) -> DateTime<Utc> {
    match now.clone().checked_sub_days(Days::new(days)) {
        Some(then) => then.with_timezone(&Utc),
        // Lands in a DST gap
        None => now.with_timezone(&Utc) - Duration::days(days as i64),
    }
}

fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?.and_hms_opt(0, 0, 0)?;
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
}

/// Strongly typed search criteria. Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub title: Option<String>,
    pub category_id: Option<Uuid>,
    pub created_at: Option<CreatedAtFilter>,
    pub shift_timing: Vec<String>,
    pub work_mode: Vec<String>,
    pub years_of_experience: Vec<String>,
    /// Restrict to jobs the caller has saved
    pub saved_only: bool,
}

/// Query parameters accepted by the job search endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JobSearchParams {
    /// Case-insensitive substring of the job title
    pub title: Option<String>,
    /// Category id
    pub category_id: Option<String>,
    /// One of `today`, `yesterday`, `thisWeek`, `lastWeek`, `thisMonth`
    pub created_at_filter: Option<String>,
    /// Comma-separated shift timings, e.g. `full-time,contract`
    pub shift_timing: Option<String>,
    /// Comma-separated work modes, e.g. `remote,hybrid`
    pub work_mode: Option<String>,
    /// Comma-separated experience buckets, e.g. `0,2`
    pub years_of_experience: Option<String>,
    /// Only jobs saved by the caller
    pub saved_jobs: Option<bool>,
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}

/// Splits a comma-separated facet list, dropping blank entries.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl TryFrom<JobSearchParams> for JobFilter {
    type Error = AppError;

    fn try_from(params: JobSearchParams) -> Result<Self, Self::Error> {
        let category_id = match non_blank(params.category_id) {
            Some(raw) => Some(Uuid::parse_str(raw.trim()).map_err(|_| {
                AppError::InvalidRequest(format!("categoryId is not a valid id: {}", raw))
            })?),
            None => None,
        };

        Ok(JobFilter {
            title: non_blank(params.title),
            category_id,
            created_at: non_blank(params.created_at_filter).map(|raw| CreatedAtFilter::parse(&raw)),
            shift_timing: split_list(params.shift_timing.as_deref()),
            work_mode: split_list(params.work_mode.as_deref()),
            years_of_experience: split_list(params.years_of_experience.as_deref()),
            saved_only: params.saved_jobs.unwrap_or(false),
        })
    }
}

impl JobFilter {
    /// Canonical URL query string for this filter; empty fields are omitted.
    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(title) = &self.title {
            query.append_pair("title", title);
        }
        if let Some(category_id) = &self.category_id {
            query.append_pair("categoryId", &category_id.to_string());
        }
        if let Some(created_at) = &self.created_at {
            query.append_pair("createdAtFilter", created_at.as_str());
        }
        for (key, values) in [
            ("shiftTiming", &self.shift_timing),
            ("workMode", &self.work_mode),
            ("yearsOfExperience", &self.years_of_experience),
        ] {
            if !values.is_empty() {
                query.append_pair(key, &values.join(","));
            }
        }
        if self.saved_only {
            query.append_pair("savedJobs", "true");
        }
        query.finish()
    }

    /// Parses a query string produced by the search UI (with or without the
    /// leading `?`). Unknown keys are ignored.
    pub fn from_query_string(raw: &str) -> Result<Self, AppError> {
        let mut params = JobSearchParams::default();
        for (key, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "title" => params.title = Some(value),
                "categoryId" => params.category_id = Some(value),
                "createdAtFilter" => params.created_at_filter = Some(value),
                "shiftTiming" => params.shift_timing = Some(value),
                "workMode" => params.work_mode = Some(value),
                "yearsOfExperience" => params.years_of_experience = Some(value),
                "savedJobs" => params.saved_jobs = Some(value == "true"),
                _ => {}
            }
        }
        JobFilter::try_from(params)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQLite's `LOWER()` and `LIKE` only fold ASCII, so on that backend the
/// title is matched in Rust after the query instead of in SQL.
fn title_in_sql(backend: DbBackend) -> bool {
    backend != DbBackend::Sqlite
}

/// Case-insensitive substring test with Unicode case folding.
pub fn title_matches(title: &str, needle: &str) -> bool {
    title.to_lowercase().contains(&needle.to_lowercase())
}

/// Translates `filter` into one predicate. Published-only is always part of
/// it; title and category form their own AND group; every other criterion is
/// an independent constraint. The title is left out on backends that cannot
/// fold non-ASCII case; `try_get_jobs` applies it afterwards.
pub fn build_condition<Tz: TimeZone>(
    filter: &JobFilter,
    caller: Option<&str>,
    now: &DateTime<Tz>,
    backend: DbBackend,
) -> Condition {
    let mut condition = Condition::all().add(job::Column::IsPublished.eq(true));

    let title = filter.title.as_ref().filter(|_| title_in_sql(backend));
    if title.is_some() || filter.category_id.is_some() {
        let mut group = Condition::all();
        if let Some(title) = title {
            let pattern = format!("%{}%", escape_like(&title.to_lowercase()));
            group = group.add(
                Expr::expr(Func::lower(Expr::col((job::Entity, job::Column::Title))))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        if let Some(category_id) = filter.category_id {
            group = group.add(job::Column::CategoryId.eq(category_id));
        }
        condition = condition.add(group);
    }

    if let Some(created_at) = &filter.created_at {
        condition = condition.add(job::Column::CreatedAt.gte(created_at.lower_bound(now)));
    }

    for (column, values) in [
        (job::Column::ShiftTiming, &filter.shift_timing),
        (job::Column::WorkMode, &filter.work_mode),
        (job::Column::YearsOfExperience, &filter.years_of_experience),
    ] {
        if !values.is_empty() {
            condition = condition.add(column.is_in(values.iter().cloned()));
        }
    }

    if filter.saved_only {
        condition = condition.add(match caller {
            Some(user_id) => job::Column::Id.in_subquery(
                Query::select()
                    .column(saved_job::Column::JobId)
                    .from(saved_job::Entity)
                    .and_where(saved_job::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
            // An anonymous caller has saved nothing
            None => job::Column::Id.is_in(Vec::<Uuid>::new()),
        });
    }

    condition
}

/// A job together with the relations the listing pages render.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct JobWithRelations {
    #[serde(flatten)]
    pub job: job::Model,
    pub company: Option<company::Model>,
    pub category: Option<category::Model>,
    pub attachments: Vec<attachment::Model>,
    /// Users who saved this job
    pub saved_users: Vec<String>,
}

/// Loads company, category, attachments and saved users for `jobs`,
/// preserving their order.
pub async fn with_relations<C: ConnectionTrait>(
    db: &C,
    jobs: Vec<job::Model>,
) -> Result<Vec<JobWithRelations>, DbErr> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let companies = jobs.load_one(company::Entity, db).await?;
    let categories = jobs.load_one(category::Entity, db).await?;
    let attachments = jobs.load_many(attachment::Entity, db).await?;
    let saved = jobs.load_many(saved_job::Entity, db).await?;

    Ok(jobs
        .into_iter()
        .zip(companies)
        .zip(categories)
        .zip(attachments)
        .zip(saved)
        .map(|((((job, company), category), attachments), saved)| JobWithRelations {
            job,
            company,
            category,
            attachments,
            saved_users: saved.into_iter().map(|s| s.user_id).collect(),
        })
        .collect())
}

/// Runs the search as of `now`, surfacing persistence errors.
pub async fn try_get_jobs<C: ConnectionTrait, Tz: TimeZone>(
    db: &C,
    filter: &JobFilter,
    caller: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<Vec<JobWithRelations>, DbErr> {
    let backend = db.get_database_backend();
    let mut jobs = job::Entity::find()
        .filter(build_condition(filter, caller, now, backend))
        .order_by_desc(job::Column::CreatedAt)
        .order_by_desc(job::Column::Id)
        .all(db)
        .await?;
    if let Some(title) = filter.title.as_ref().filter(|_| !title_in_sql(backend)) {
        jobs.retain(|job| title_matches(&job.title, title));
    }
    with_relations(db, jobs).await
}

/// Published jobs matching `filter`, newest first. Never fails: persistence
/// errors are logged and yield an empty list.
#[tracing::instrument(skip(db))]
pub async fn get_jobs<C: ConnectionTrait>(
    db: &C,
    filter: &JobFilter,
    caller: Option<&str>,
) -> Vec<JobWithRelations> {
    match try_get_jobs(db, filter, caller, &Local::now()).await {
        Ok(jobs) => {
            tracing::debug!("Found {} jobs", jobs.len());
            jobs
        }
        Err(e) => {
            tracing::error!("[GET_JOBS]: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use sea_orm::{DbBackend, QueryTrait};

    // Wednesday 2025-10-15 14:30:00 at UTC+02:00
    fn wednesday() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 15, 14, 30, 0)
            .unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn today_keeps_the_current_instant() {
        let now = wednesday();
        assert_eq!(CreatedAtFilter::Today.lower_bound(&now), now.with_timezone(&Utc));
    }

    #[test]
    fn day_and_week_buckets_keep_time_of_day() {
        let now = wednesday();
        assert_eq!(CreatedAtFilter::Yesterday.lower_bound(&now), local(2025, 10, 14, 14, 30));
        // Wednesday is day 3 counting from Sunday
        assert_eq!(CreatedAtFilter::ThisWeek.lower_bound(&now), local(2025, 10, 12, 14, 30));
        assert_eq!(CreatedAtFilter::LastWeek.lower_bound(&now), local(2025, 10, 5, 14, 30));
    }

    #[test]
    fn this_week_on_sunday_is_now() {
        let sunday = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 10, 19, 9, 0, 0)
            .unwrap();
        assert_eq!(CreatedAtFilter::ThisWeek.lower_bound(&sunday), sunday.with_timezone(&Utc));
    }

    #[test]
    fn this_month_starts_at_local_midnight() {
        assert_eq!(CreatedAtFilter::ThisMonth.lower_bound(&wednesday()), local(2025, 10, 1, 0, 0));
    }

    #[test]
    fn unknown_bucket_falls_back_to_epoch() {
        let bucket = CreatedAtFilter::parse("lastYear");
        assert_eq!(bucket, CreatedAtFilter::Unrecognized("lastYear".to_string()));
        assert_eq!(bucket.lower_bound(&wednesday()), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn facet_lists_drop_blank_entries() {
        assert_eq!(split_list(Some("remote, hybrid,,")), vec!["remote", "hybrid"]);
        assert!(split_list(Some("")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn params_convert_to_typed_filter() {
        let category = Uuid::new_v4();
        let filter = JobFilter::try_from(JobSearchParams {
            title: Some("engineer".to_string()),
            category_id: Some(category.to_string()),
            created_at_filter: Some("thisMonth".to_string()),
            shift_timing: Some("full-time,contract".to_string()),
            work_mode: None,
            years_of_experience: Some("".to_string()),
            saved_jobs: Some(true),
        })
        .unwrap();

        assert_eq!(filter.title.as_deref(), Some("engineer"));
        assert_eq!(filter.category_id, Some(category));
        assert_eq!(filter.created_at, Some(CreatedAtFilter::ThisMonth));
        assert_eq!(filter.shift_timing, vec!["full-time", "contract"]);
        assert!(filter.work_mode.is_empty());
        assert!(filter.years_of_experience.is_empty());
        assert!(filter.saved_only);
    }

    #[test]
    fn blank_params_impose_nothing() {
        let filter = JobFilter::try_from(JobSearchParams {
            title: Some("  ".to_string()),
            category_id: Some("".to_string()),
            created_at_filter: Some("".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter, JobFilter::default());
    }

    #[test]
    fn malformed_category_is_rejected() {
        let result = JobFilter::try_from(JobSearchParams {
            category_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn query_string_round_trip() {
        let filter = JobFilter {
            title: Some("rust & go".to_string()),
            category_id: Some(Uuid::new_v4()),
            created_at: Some(CreatedAtFilter::LastWeek),
            shift_timing: vec!["full-time".to_string(), "part-time".to_string()],
            work_mode: vec!["remote".to_string()],
            years_of_experience: vec![],
            saved_only: true,
        };
        let encoded = filter.to_query_string();
        assert!(!encoded.contains("yearsOfExperience"));
        assert_eq!(JobFilter::from_query_string(&format!("?{}", encoded)).unwrap(), filter);
    }

    #[test]
    fn empty_filter_encodes_to_empty_string() {
        assert_eq!(JobFilter::default().to_query_string(), "");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
    }

    #[test]
    fn condition_always_requires_published() {
        let sql = job::Entity::find()
            .filter(build_condition(&JobFilter::default(), None, &wednesday(), DbBackend::Postgres))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("\"is_published\""), "{}", sql);
        assert!(!sql.contains("LIKE"), "{}", sql);
    }

    #[test]
    fn condition_covers_every_criterion() {
        let filter = JobFilter {
            title: Some("Engineer".to_string()),
            category_id: Some(Uuid::nil()),
            created_at: Some(CreatedAtFilter::Today),
            shift_timing: vec!["full-time".to_string()],
            work_mode: vec!["remote".to_string(), "hybrid".to_string()],
            years_of_experience: vec!["2".to_string()],
            saved_only: true,
        };
        let sql = job::Entity::find()
            .filter(build_condition(&filter, Some("user_1"), &wednesday(), DbBackend::Postgres))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains("LOWER(\"jobs\".\"title\") LIKE '%engineer%'"), "{}", sql);
        assert!(sql.contains("\"category_id\" ="), "{}", sql);
        assert!(sql.contains("\"created_at\" >="), "{}", sql);
        assert!(sql.contains("\"shift_timing\" IN ('full-time')"), "{}", sql);
        assert!(sql.contains("\"work_mode\" IN ('remote', 'hybrid')"), "{}", sql);
        assert!(sql.contains("\"years_of_experience\" IN ('2')"), "{}", sql);
        assert!(sql.contains("\"saved_jobs\""), "{}", sql);
        assert!(sql.contains("'user_1'"), "{}", sql);
    }

    #[test]
    fn sqlite_condition_leaves_title_to_rust() {
        let filter = JobFilter {
            title: Some("Ingénieur".to_string()),
            category_id: Some(Uuid::nil()),
            ..Default::default()
        };
        let sql = job::Entity::find()
            .filter(build_condition(&filter, None, &wednesday(), DbBackend::Sqlite))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("LIKE"), "{}", sql);
        assert!(sql.contains("\"category_id\" ="), "{}", sql);
    }

    #[test]
    fn title_matching_folds_unicode_case() {
        assert!(title_matches("INGÉNIEUR Logiciel", "ingénieur"));
        assert!(title_matches("INGÉNIEUR Logiciel", "INGÉNIEUR"));
        assert!(title_matches("100% Remote", "100%"));
        assert!(!title_matches("1000 Remote", "100%"));
    }
}
