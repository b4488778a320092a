use crate::core::charts::{Axis, Figure, Layout, Trace};
use crate::core::cleaning::finish_csv;
use crate::domain::model::{MetaFlight, ReportArtifact};
use crate::utils::error::Result;
use chrono::{Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const WEEKLY_CSV: &str = "meta_weekly_impressions.csv";
pub const WEEKLY_TOTALS_CHART: &str = "total_impressions_by_week.html";
pub const DURATION_CHART: &str = "weekly_impressions_by_duration.html";

pub const DEFAULT_FIRST_WEEK: (i32, u32, u32) = (2016, 12, 26);
pub const DEFAULT_WEEK_COUNT: usize = 53;

const TOP_WEEK_COLOR: &str = "#FF6200";
const OTHER_WEEK_COLOR: &str = "#c48a47";

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarWeek {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// `count` consecutive seven-day weeks labelled CW0, CW1, ...
pub fn calendar_weeks(first_start: NaiveDate, count: usize) -> Vec<CalendarWeek> {
    (0..count)
        .map(|i| {
            let start = first_start + Duration::days(7 * i as i64);
            CalendarWeek {
                label: format!("CW{}", i),
                start,
                end: start + Duration::days(6),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignWeeks {
    pub campaign_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub impressions: u64,
    pub duration_days: i64,
    pub weekly: Vec<u64>,
    pub total_weeks: usize,
}

impl CampaignWeeks {
    pub fn avg_weekly_impressions(&self) -> Option<f64> {
        (self.total_weeks > 0).then(|| self.impressions as f64 / self.total_weeks as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationBucket {
    pub total_weeks: usize,
    pub avg_weekly_impressions: f64,
    pub campaigns: usize,
}

#[derive(Debug, Clone)]
pub struct WeeklyAnalysis {
    pub weeks: Vec<CalendarWeek>,
    pub campaigns: Vec<CampaignWeeks>,
}

impl WeeklyAnalysis {
    pub fn compute(flights: &[MetaFlight], first_week_start: NaiveDate, week_count: usize) -> Self {
        let weeks = calendar_weeks(first_week_start, week_count);
        let campaigns = group_campaigns(flights)
            .into_iter()
            .map(|c| {
                let weekly = split_impressions(c.impressions, c.start_date, c.end_date, &weeks);
                let total_weeks = weekly.iter().filter(|w| **w > 0).count();
                CampaignWeeks {
                    duration_days: (c.end_date - c.start_date).num_days() + 1,
                    weekly,
                    total_weeks,
                    ..c
                }
            })
            .collect();

        Self { weeks, campaigns }
    }

    pub fn weekly_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.weeks.len()];
        for campaign in &self.campaigns {
            for (total, value) in totals.iter_mut().zip(&campaign.weekly) {
                *total += value;
            }
        }
        totals
    }

    /// Indices of the three busiest weeks. Ties go to the earlier week.
    pub fn top_weeks(&self) -> Vec<usize> {
        let totals = self.weekly_totals();
        let mut indices: Vec<usize> = (0..totals.len()).collect();
        indices.sort_by(|a, b| totals[*b].cmp(&totals[*a]).then(a.cmp(b)));
        indices.truncate(3);
        indices
    }

    pub fn duration_buckets(&self) -> Vec<DurationBucket> {
        let mut buckets: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for campaign in &self.campaigns {
            if let Some(avg) = campaign.avg_weekly_impressions() {
                let bucket = buckets.entry(campaign.total_weeks).or_insert((0.0, 0));
                bucket.0 += avg;
                bucket.1 += 1;
            }
        }
        buckets
            .into_iter()
            .map(|(total_weeks, (sum, campaigns))| DurationBucket {
                total_weeks,
                avg_weekly_impressions: sum / campaigns as f64,
                campaigns,
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<String> = [
            "Campaign_id",
            "start_date",
            "end_date",
            "Impression",
            "duration_days",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(self.weeks.iter().map(|w| w.label.clone()));
        header.push("total_weeks".to_string());
        writer.write_record(&header)?;

        for c in &self.campaigns {
            let mut row = vec![
                c.campaign_id.clone(),
                c.start_date.format("%Y-%m-%d").to_string(),
                c.end_date.format("%Y-%m-%d").to_string(),
                c.impressions.to_string(),
                c.duration_days.to_string(),
            ];
            row.extend(c.weekly.iter().map(|v| v.to_string()));
            row.push(c.total_weeks.to_string());
            writer.write_record(&row)?;
        }

        finish_csv(writer)
    }

    pub fn weekly_totals_figure(&self) -> Figure {
        let mut layout =
            Layout::new("Total Impressions by Calendar Week", 1000, 600).centered_title();
        layout.xaxis = Some(Axis {
            categoryorder: Some("array"),
            categoryarray: Some(self.weeks.iter().map(|w| w.label.clone()).collect()),
            ..Axis::titled("Calendar Week")
        });
        layout.yaxis = Some(Axis::titled("Impressions").log());

        let totals = self.weekly_totals();
        let top = self.top_weeks();
        let mut figure = Figure::new(layout);
        let categories = [
            ("Top 3", TOP_WEEK_COLOR, true),
            ("Other", OTHER_WEEK_COLOR, false),
        ];
        for (category, color, is_top) in categories {
            let indices: Vec<usize> = (0..totals.len())
                .filter(|i| top.contains(i) == is_top)
                .collect();
            figure.add_trace(
                Trace::bar(
                    indices.iter().map(|i| self.weeks[*i].label.as_str().into()).collect(),
                    indices.iter().map(|i| totals[*i].into()).collect(),
                )
                .named(category)
                .colored(color),
            );
        }
        figure
    }

    pub fn duration_figure(&self) -> Figure {
        let mut layout = Layout::new("Weekly Impressions by Campaign Duration", 1000, 500);
        layout.xaxis = Some(Axis::titled("Campaign Duration (weeks)"));
        layout.yaxis = Some(Axis::titled("Average Weekly Impressions"));

        let buckets = self.duration_buckets();
        let mut figure = Figure::new(layout);
        figure.add_trace(Trace::line(
            buckets.iter().map(|b| (b.total_weeks as u64).into()).collect(),
            buckets.iter().map(|b| b.avg_weekly_impressions.into()).collect(),
        ));
        figure
    }

    pub fn render(&self) -> Result<Vec<ReportArtifact>> {
        Ok(vec![
            ReportArtifact::output(WEEKLY_CSV, self.to_csv()?),
            ReportArtifact::output(
                WEEKLY_TOTALS_CHART,
                self.weekly_totals_figure().to_html()?.into_bytes(),
            ),
            ReportArtifact::output(DURATION_CHART, self.duration_figure().to_html()?.into_bytes()),
        ])
    }
}

/// Per campaign: earliest start, latest end, summed impressions.
fn group_campaigns(flights: &[MetaFlight]) -> Vec<CampaignWeeks> {
    let mut grouped: HashMap<&str, CampaignWeeks> = HashMap::new();
    for flight in flights {
        grouped
            .entry(flight.campaign_id.as_str())
            .and_modify(|c| {
                c.start_date = c.start_date.min(flight.start_date);
                c.end_date = c.end_date.max(flight.end_date);
                c.impressions += flight.impressions;
            })
            .or_insert_with(|| CampaignWeeks {
                campaign_id: flight.campaign_id.clone(),
                start_date: flight.start_date,
                end_date: flight.end_date,
                impressions: flight.impressions,
                duration_days: 0,
                weekly: Vec::new(),
                total_weeks: 0,
            });
    }

    let mut grouped: Vec<CampaignWeeks> = grouped.into_values().collect();
    let numeric = grouped.iter().all(|c| c.campaign_id.parse::<i64>().is_ok());
    grouped.sort_by(|a, b| compare_ids(&a.campaign_id, &b.campaign_id, numeric));
    grouped
}

// "7" and "07" are equal as numbers; the text order keeps the result deterministic
fn compare_ids(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
            return x.cmp(&y).then_with(|| a.cmp(b));
        }
    }
    a.cmp(b)
}

/// Spreads `impressions` evenly over the flight days and sums them per week.
///
/// Shares are floored, then the remainder is handed out one by one to the
/// weeks with the largest fractional part (earlier week first on ties). The
/// remainder is the rounded exact in-calendar share minus the floors, so a
/// flight fully inside the calendar keeps its exact total and weeks without
/// overlap never receive impressions.
pub fn split_impressions(
    impressions: u64,
    start: NaiveDate,
    end: NaiveDate,
    weeks: &[CalendarWeek],
) -> Vec<u64> {
    let duration = ((end - start).num_days() + 1).max(1);
    let daily = impressions as f64 / duration as f64;

    let exact: Vec<f64> = weeks
        .iter()
        .map(|week| {
            let overlap_start = start.max(week.start);
            let overlap_end = end.min(week.end);
            let overlap_days = ((overlap_end - overlap_start).num_days() + 1).max(0);
            daily * overlap_days as f64
        })
        .collect();

    let mut allocated: Vec<u64> = exact.iter().map(|v| v.floor() as u64).collect();
    let target = exact.iter().sum::<f64>().round() as u64;
    let remainder = target.saturating_sub(allocated.iter().sum());

    let mut by_fraction: Vec<usize> = (0..exact.len()).filter(|i| exact[*i] > 0.0).collect();
    by_fraction.sort_by(|a, b| {
        let fa = exact[*a] - exact[*a].floor();
        let fb = exact[*b] - exact[*b].floor();
        fb.total_cmp(&fa).then(a.cmp(b))
    });
    for index in by_fraction.into_iter().take(remainder as usize) {
        allocated[index] += 1;
    }

    allocated
}
