//! Aggregates over the saved history: per-project statistics, shares and
//! the chronological series behind the charts.

use std::{
    collections::{BTreeMap, BTreeSet},
    io::Write,
};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{ResultEngine, amount::Amount, history::HistoryTable};

/// Label of the "every project" choice in the project filter.
pub const ALL_PROJECTS: &str = "Все проекты";

/// One saved calculation as seen by the analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostEntry {
    pub timestamp: NaiveDateTime,
    pub project: String,
    pub total: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProjectFilter {
    #[default]
    All,
    Named(String),
}

impl ProjectFilter {
    /// `None`, an empty name or the "all projects" label select everything.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") | Some(ALL_PROJECTS) => ProjectFilter::All,
            Some(name) => ProjectFilter::Named(name.to_string()),
        }
    }

    pub fn matches(&self, project: &str) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Named(name) => name == project,
        }
    }
}

/// Project plus an inclusive calendar-date range. Open bounds default to
/// the bounds of the data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisFilter {
    pub project: ProjectFilter,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectStats {
    pub project: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectShare {
    pub project: String,
    pub total: f64,
    /// Fraction of the filtered grand total, 0 when that total is 0.
    pub share: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Filtered entries in file order.
    pub rows: Vec<CostEntry>,
    /// Per-project statistics, sorted by project.
    pub stats: Vec<ProjectStats>,
    pub shares: Vec<ProjectShare>,
    /// Filtered entries in chronological order.
    pub series: Vec<CostEntry>,
    pub average: Option<f64>,
}

impl AnalysisReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisData {
    entries: Vec<CostEntry>,
}

impl AnalysisData {
    /// Rows with an unreadable date are left out.
    pub fn from_history(table: &HistoryTable) -> Self {
        let entries = table
            .records
            .iter()
            .filter_map(|record| {
                Some(CostEntry {
                    timestamp: record.timestamp()?,
                    project: record.project().to_string(),
                    total: record.total(),
                })
            })
            .collect::<Vec<_>>();
        let skipped = table.len() - entries.len();
        if skipped > 0 {
            tracing::debug!("{skipped} history rows without a readable date skipped");
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    /// Distinct project names, sorted.
    pub fn projects(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.project.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// First and last calendar date in the data.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.entries.iter().map(|e| e.timestamp.date());
        let min = dates.clone().min()?;
        let max = dates.max()?;
        Some((min, max))
    }

    pub fn report(&self, filter: &AnalysisFilter) -> AnalysisReport {
        let Some((min, max)) = self.date_bounds() else {
            return AnalysisReport::default();
        };
        let from = filter.from.unwrap_or(min);
        let to = filter.to.unwrap_or(max);

        let rows: Vec<CostEntry> = self
            .entries
            .iter()
            .filter(|e| filter.project.matches(&e.project))
            .filter(|e| (from..=to).contains(&e.timestamp.date()))
            .cloned()
            .collect();
        if rows.is_empty() {
            return AnalysisReport::default();
        }

        let mut by_project: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for entry in &rows {
            by_project
                .entry(entry.project.as_str())
                .or_default()
                .push(entry.total);
        }

        let stats = by_project
            .iter()
            .filter_map(|(project, totals)| project_stats(project, totals))
            .collect();

        let grand_total: f64 = rows.iter().map(|e| e.total).sum();
        let shares = by_project
            .iter()
            .map(|(project, totals)| {
                let total: f64 = totals.iter().sum();
                ProjectShare {
                    project: project.to_string(),
                    total,
                    share: if grand_total == 0.0 { 0.0 } else { total / grand_total },
                }
            })
            .collect();

        let mut series = rows.clone();
        series.sort_by_key(|e| e.timestamp);
        let average = Some(grand_total / rows.len() as f64);

        AnalysisReport {
            rows,
            stats,
            shares,
            series,
            average,
        }
    }
}

fn project_stats(project: &str, totals: &[f64]) -> Option<ProjectStats> {
    if totals.is_empty() {
        return None;
    }
    let mut sorted = totals.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Some(ProjectStats {
        project: project.to_string(),
        count,
        mean: sorted.iter().sum::<f64>() / count as f64,
        median,
        min: sorted[0],
        max: sorted[count - 1],
    })
}

/// Writes the report as CSV: the filtered rows, a blank line, then the
/// per-project summary.
pub fn export_report<W: Write>(report: &AnalysisReport, mut out: W) -> ResultEngine<()> {
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(["Дата", "Проект", "Итоговая себестоимость"])?;
        for row in &report.rows {
            writer.write_record([
                row.timestamp
                    .format(crate::history::TIMESTAMP_FORMAT)
                    .to_string(),
                row.project.clone(),
                Amount(row.total).to_string(),
            ])?;
        }
        writer.flush()?;
    }

    out.write_all(b"\n")?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(&mut out);
    writer.write_record(["Сводка по проектам:"])?;
    for stats in &report.stats {
        writer.write_record([
            stats.project.clone(),
            format!("Среднее: {}", Amount(stats.mean)),
            format!("Медиана: {}", Amount(stats.median)),
            format!("Мин: {}", Amount(stats.min)),
            format!("Макс: {}", Amount(stats.max)),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryRecord;

    fn table(rows: &[(&str, &str, &str)]) -> HistoryTable {
        let records = rows
            .iter()
            .map(|(date, project, total)| {
                let mut record = HistoryRecord::default();
                record.set("Дата", *date);
                record.set("Проект", *project);
                record.set("Итого", *total);
                record
            })
            .collect();
        HistoryTable {
            headers: vec!["Дата".into(), "Проект".into(), "Итого".into()],
            records,
        }
    }

    fn sample() -> AnalysisData {
        AnalysisData::from_history(&table(&[
            ("2024-01-10 10:00:00", "Дом", "100.0"),
            ("2024-01-05 09:00:00", "Дача", "40.0"),
            ("broken", "Дом", "999.0"),
            ("2024-02-01 12:00:00", "Дом", "300.0"),
            ("2024-02-03 12:00:00", "Дом", "not a number"),
        ]))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rows_without_date_are_skipped() {
        let data = sample();
        assert_eq!(data.entries().len(), 4);
        assert_eq!(data.projects(), ["Дача", "Дом"]);
        assert_eq!(data.date_bounds(), Some((date(2024, 1, 5), date(2024, 2, 3))));
    }

    #[test]
    fn stats_are_grouped_by_project() {
        let report = sample().report(&AnalysisFilter::default());
        assert_eq!(report.rows.len(), 4);

        let home = report.stats.iter().find(|s| s.project == "Дом").unwrap();
        assert_eq!(home.count, 3);
        assert_eq!(home.min, 0.0);
        assert_eq!(home.max, 300.0);
        assert_eq!(home.median, 100.0);
        assert!((home.mean - 400.0 / 3.0).abs() < 1e-9);

        let cottage = report.stats.iter().find(|s| s.project == "Дача").unwrap();
        assert_eq!(cottage.count, 1);
        assert_eq!(cottage.median, 40.0);
    }

    #[test]
    fn even_count_median_averages_the_middle() {
        let stats = project_stats("p", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert!(project_stats("p", &[]).is_none());
    }

    #[test]
    fn series_is_chronological() {
        let report = sample().report(&AnalysisFilter::default());
        let dates: Vec<_> = report.series.iter().map(|e| e.timestamp.date()).collect();
        assert_eq!(
            dates,
            [date(2024, 1, 5), date(2024, 1, 10), date(2024, 2, 1), date(2024, 2, 3)]
        );
        assert_eq!(report.average, Some(110.0));
    }

    #[test]
    fn filter_by_project_and_inclusive_dates() {
        let filter = AnalysisFilter {
            project: ProjectFilter::from_name(Some("Дом")),
            from: Some(date(2024, 1, 10)),
            to: Some(date(2024, 2, 1)),
        };
        let report = sample().report(&filter);
        let totals: Vec<_> = report.rows.iter().map(|e| e.total).collect();
        assert_eq!(totals, [100.0, 300.0]);
        assert_eq!(report.shares.len(), 1);
        assert_eq!(report.shares[0].share, 1.0);
    }

    #[test]
    fn range_without_records_is_empty() {
        let filter = AnalysisFilter {
            project: ProjectFilter::All,
            from: Some(date(2030, 1, 1)),
            to: Some(date(2030, 12, 31)),
        };
        let report = sample().report(&filter);
        assert!(report.is_empty());
        assert!(report.stats.is_empty());
        assert!(report.series.is_empty());
        assert_eq!(report.average, None);
    }

    #[test]
    fn empty_history_gives_empty_report() {
        let data = AnalysisData::from_history(&HistoryTable::default());
        assert!(data.report(&AnalysisFilter::default()).is_empty());
        assert!(data.date_bounds().is_none());
    }

    #[test]
    fn all_projects_label_selects_everything() {
        assert_eq!(ProjectFilter::from_name(Some(ALL_PROJECTS)), ProjectFilter::All);
        assert_eq!(ProjectFilter::from_name(None), ProjectFilter::All);
        assert!(ProjectFilter::All.matches("anything"));
    }

    #[test]
    fn export_writes_rows_then_summary() {
        let filter = AnalysisFilter {
            project: ProjectFilter::from_name(Some("Дача")),
            ..AnalysisFilter::default()
        };
        let report = sample().report(&filter);
        let mut buf = Vec::new();
        export_report(&report, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Дата,Проект,Итоговая себестоимость\n\
             2024-01-05 09:00:00,Дача,40.00\n\
             \n\
             Сводка по проектам:\n\
             Дача,Среднее: 40.00,Медиана: 40.00,Мин: 40.00,Макс: 40.00\n"
        );
    }
}
