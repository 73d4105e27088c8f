//! Reporting over stored submissions
//!
//! Read-only: filters rows by company and employment bucket, computes the
//! dashboard statistics over the filtered set, and exports it as CSV.

use audioform_common::time::format_eastern;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::str::FromStr;

use crate::store::StoredSubmission;

/// CSV header, in export column order
pub const CSV_HEADERS: [&str; 10] = [
    "First Name",
    "Last Name",
    "Date of Birth",
    "Company",
    "Employment Status",
    "Intro Audio Played",
    "Employment Audio Played",
    "Audio Listen Time (seconds)",
    "Form Start Time (EST)",
    "Submission Date (EST)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CompanyFilter {
    All,
    Exact(String),
}

impl CompanyFilter {
    /// Label used in export filenames
    pub fn label(&self) -> &str {
        match self {
            CompanyFilter::All => "all",
            CompanyFilter::Exact(company) => company,
        }
    }
}

/// Employment bucket; "unemployed" is a `true` answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentFilter {
    All,
    Unemployed,
    Other,
}

impl FromStr for EmploymentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(EmploymentFilter::All),
            "unemployed" => Ok(EmploymentFilter::Unemployed),
            "other" => Ok(EmploymentFilter::Other),
            other => Err(format!("Unknown employment filter: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFilter {
    pub company: CompanyFilter,
    pub employment: EmploymentFilter,
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self {
            company: CompanyFilter::All,
            employment: EmploymentFilter::All,
        }
    }
}

impl ResponseFilter {
    /// Build from query parameters; absent or `all` means no restriction
    pub fn from_params(company: Option<&str>, employment: Option<&str>) -> Result<Self, String> {
        let company = match company {
            None | Some("") | Some("all") => CompanyFilter::All,
            Some(name) => CompanyFilter::Exact(name.to_string()),
        };
        let employment = match employment {
            None | Some("") => EmploymentFilter::All,
            Some(value) => value.parse()?,
        };
        Ok(Self {
            company,
            employment,
        })
    }

    pub fn matches(&self, row: &StoredSubmission) -> bool {
        let company_ok = match &self.company {
            CompanyFilter::All => true,
            CompanyFilter::Exact(company) => &row.company == company,
        };
        let employment_ok = match self.employment {
            EmploymentFilter::All => true,
            EmploymentFilter::Unemployed => row.employment_status,
            EmploymentFilter::Other => !row.employment_status,
        };
        company_ok && employment_ok
    }

    pub fn apply(&self, rows: &[StoredSubmission]) -> Vec<StoredSubmission> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Dashboard statistics over a (filtered) set of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total: usize,
    pub unemployed_count: usize,
    pub employment_rate_percent: i64,
    pub avg_audio_seconds: i64,
    pub intro_completion_percent: i64,
    pub employment_completion_percent: i64,
}

fn percent(count: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (count as f64 * 100.0 / total as f64).round() as i64
}

impl ReportStats {
    /// Every figure is zero for an empty set
    pub fn compute(rows: &[StoredSubmission]) -> Self {
        let total = rows.len();
        let unemployed_count = rows.iter().filter(|r| r.employment_status).count();
        let listen_sum: i64 = rows.iter().map(|r| r.total_audio_listen_time_seconds).sum();
        let avg_audio_seconds = if total == 0 {
            0
        } else {
            (listen_sum as f64 / total as f64).round() as i64
        };

        Self {
            total,
            unemployed_count,
            employment_rate_percent: percent(unemployed_count, total),
            avg_audio_seconds,
            intro_completion_percent: percent(
                rows.iter().filter(|r| r.intro_audio_played).count(),
                total,
            ),
            employment_completion_percent: percent(
                rows.iter().filter(|r| r.employment_audio_played).count(),
                total,
            ),
        }
    }
}

/// Distinct companies in first-seen order
pub fn companies(rows: &[StoredSubmission]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        if !seen.contains(&row.company) {
            seen.push(row.company.clone());
        }
    }
    seen
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn csv_cells(row: &StoredSubmission) -> [String; 10] {
    let yes_no = |b: bool| (if b { "Yes" } else { "No" }).to_string();
    [
        row.first_name.clone(),
        row.last_name.clone(),
        row.dob.clone().unwrap_or_default(),
        row.company.clone(),
        if row.employment_status {
            "Unemployed".to_string()
        } else {
            String::new()
        },
        yes_no(row.intro_audio_played),
        yes_no(row.employment_audio_played),
        row.total_audio_listen_time_seconds.to_string(),
        format_eastern(row.form_start_time),
        format_eastern(row.created_at),
    ]
}

/// Header line plus one fully quoted line per row, joined with `\n`
pub fn export_csv(rows: &[StoredSubmission]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for row in rows {
        let cells: Vec<String> = csv_cells(row).iter().map(|c| quote(c)).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

/// `audio-form-responses-{company}-{timestamp}.csv`
pub fn export_filename(filter: &ResponseFilter, now: DateTime<Utc>) -> String {
    let label: String = filter
        .company
        .label()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "audio-form-responses-{}-{}.csv",
        label,
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::new_submission;
    use chrono::TimeZone;

    fn row(id: i64, company: &str, unemployed: bool) -> StoredSubmission {
        let created = Utc.with_ymd_and_hms(2025, 1, 15, 3, 18, 0).unwrap();
        StoredSubmission::from_new(id, created, new_submission(company, unemployed))
    }

    /// 6 rows for X (all unemployed), 4 for Y (none)
    fn scenario_d() -> Vec<StoredSubmission> {
        (0..10)
            .map(|i| {
                if i < 6 {
                    row(i, "X", true)
                } else {
                    row(i, "Y", false)
                }
            })
            .collect()
    }

    #[test]
    fn test_scenario_d_company_filter() {
        let rows = scenario_d();
        let filter = ResponseFilter::from_params(Some("X"), None).unwrap();
        let filtered = filter.apply(&rows);

        let stats = ReportStats::compute(&filtered);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.employment_rate_percent, 100);

        let csv = export_csv(&filtered);
        assert_eq!(csv.lines().count(), 7);
        assert!(csv.starts_with("First Name,Last Name,"));
    }

    #[test]
    fn test_employment_buckets() {
        let rows = scenario_d();
        let unemployed = ResponseFilter::from_params(None, Some("unemployed")).unwrap();
        let other = ResponseFilter::from_params(Some("all"), Some("other")).unwrap();
        assert_eq!(unemployed.apply(&rows).len(), 6);
        assert_eq!(other.apply(&rows).len(), 4);
        assert!(ResponseFilter::from_params(None, Some("retired")).is_err());
    }

    #[test]
    fn test_combined_filters() {
        let rows = scenario_d();
        let filter = ResponseFilter::from_params(Some("Y"), Some("unemployed")).unwrap();
        assert!(filter.apply(&rows).is_empty());
    }

    #[test]
    fn test_stats_over_all_rows() {
        let stats = ReportStats::compute(&scenario_d());
        assert_eq!(stats.total, 10);
        assert_eq!(stats.unemployed_count, 6);
        assert_eq!(stats.employment_rate_percent, 60);
        assert_eq!(stats.avg_audio_seconds, 21);
        assert_eq!(stats.intro_completion_percent, 100);
        assert_eq!(stats.employment_completion_percent, 0);
    }

    #[test]
    fn test_stats_empty_set_is_zero() {
        let stats = ReportStats::compute(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.employment_rate_percent, 0);
        assert_eq!(stats.avg_audio_seconds, 0);
        assert_eq!(stats.intro_completion_percent, 0);
    }

    #[test]
    fn test_companies_first_seen_order() {
        let rows = vec![row(1, "B", true), row(2, "A", true), row(3, "B", false)];
        assert_eq!(companies(&rows), vec!["B", "A"]);
    }

    #[test]
    fn test_csv_row_formatting() {
        let mut r = row(1, "The \"W\" Group", true);
        r.dob = Some("2001-02-03".to_string());
        let csv = export_csv(&[r]);
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "\"Jane\",\"Doe\",\"2001-02-03\",\"The \"\"W\"\" Group\",\"Unemployed\",\
             \"Yes\",\"No\",\"21\",\"01/14/2025, 07:00 AM EST\",\"01/14/2025, 10:18 PM EST\""
        );
    }

    #[test]
    fn test_csv_not_unemployed_is_blank() {
        let csv = export_csv(&[row(1, "Y", false)]);
        let line = csv.lines().nth(1).unwrap();
        assert!(line.contains("\"Y\",\"\",\"Yes\""));
    }

    #[test]
    fn test_export_filename() {
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
        let all = ResponseFilter::default();
        assert_eq!(
            export_filename(&all, now),
            "audio-form-responses-all-2025-01-14T12:00:00.000Z.csv"
        );
        let hcs = ResponseFilter::from_params(Some("HCS/West"), None).unwrap();
        assert!(export_filename(&hcs, now).starts_with("audio-form-responses-HCS_West-"));
    }
}
