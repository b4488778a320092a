use crate::core::charts::{Axis, Figure, Layout, Trace};
use crate::domain::model::{Platform, PlatformRecord, ReportArtifact};
use crate::utils::error::Result;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

pub const IMPRESSIONS_CHART: &str = "Total_Impressions_by_Platform.html";
pub const CTR_CHART: &str = "CTR_by_Platform.html";
pub const COMPLETION_CHART: &str = "Video_Completion_Metrics_by_Platform.html";
pub const DEVICE_CHART: &str = "Video_Completions_by_Device_Type_and_Platform.html";
pub const TIMELINE_CHART: &str = "Impressions_Over_Time_by_Platform.html";

const DEVICE_COLORS: [(&str, &str); 4] = [
    ("Desktop", "#0866FF"),
    ("SmartTV", "#F26522"),
    ("Smartphone", "#444444"),
    ("Tablet", "#c48a47"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub video_completions: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickRate {
    pub platform: Platform,
    pub ctr_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMetrics {
    pub platform: Platform,
    pub completion_per_impression: f64,
    pub completions_per_click: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCompletions {
    pub platform: Platform,
    pub device_type: String,
    pub video_completions: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyImpressions {
    pub month: NaiveDate,
    pub platform: Platform,
    pub impressions: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformAnalysis {
    /// Platforms in order of first appearance with their summed metrics.
    pub totals: Vec<(Platform, PlatformTotals)>,
    pub click_rates: Vec<ClickRate>,
    pub completion_metrics: Vec<CompletionMetrics>,
    pub device_completions: Vec<DeviceCompletions>,
    pub monthly_impressions: Vec<MonthlyImpressions>,
}

impl PlatformAnalysis {
    pub fn from_records(records: &[PlatformRecord]) -> Self {
        let mut order: Vec<Platform> = Vec::new();
        let mut totals: HashMap<Platform, PlatformTotals> = HashMap::new();
        let mut by_device: BTreeMap<(Platform, String), u64> = BTreeMap::new();
        let mut by_month: BTreeMap<(NaiveDate, Platform), u64> = BTreeMap::new();

        for record in records {
            let entry = totals.entry(record.source).or_insert_with(|| {
                order.push(record.source);
                PlatformTotals::default()
            });
            entry.impressions += record.impressions;
            entry.clicks += record.clicks;
            entry.video_completions += record.video_completions;

            *by_device
                .entry((record.source, record.device_type.clone()))
                .or_default() += record.video_completions;
            *by_month
                .entry((month_start(record.date), record.source))
                .or_default() += record.impressions;
        }

        let totals: Vec<(Platform, PlatformTotals)> =
            order.iter().map(|p| (*p, totals[p])).collect();

        let click_rates = totals
            .iter()
            .map(|(platform, t)| ClickRate {
                platform: *platform,
                ctr_percent: ratio(t.clicks, t.impressions) * 100.0,
            })
            .collect();

        let completion_metrics = totals
            .iter()
            .map(|(platform, t)| CompletionMetrics {
                platform: *platform,
                completion_per_impression: ratio(t.video_completions, t.impressions) * 100.0,
                completions_per_click: t.video_completions as f64 / t.clicks.max(1) as f64,
            })
            .collect();

        let device_completions = by_device
            .into_iter()
            .map(|((platform, device_type), video_completions)| {
                let platform_total = totals
                    .iter()
                    .find(|(p, _)| *p == platform)
                    .map(|(_, t)| t.video_completions)
                    .unwrap_or(0);
                DeviceCompletions {
                    platform,
                    device_type,
                    video_completions,
                    percentage: ratio(video_completions, platform_total) * 100.0,
                }
            })
            .collect();

        let monthly_impressions = by_month
            .into_iter()
            .map(|((month, platform), impressions)| MonthlyImpressions {
                month,
                platform,
                impressions,
            })
            .collect();

        Self {
            totals,
            click_rates,
            completion_metrics,
            device_completions,
            monthly_impressions,
        }
    }

    /// Platforms by total impressions, largest first.
    pub fn impressions_ranking(&self) -> Vec<(Platform, u64)> {
        let mut ranking: Vec<(Platform, u64)> =
            self.totals.iter().map(|(p, t)| (*p, t.impressions)).collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        ranking
    }

    pub fn ctr_ranking(&self) -> Vec<ClickRate> {
        let mut ranking = self.click_rates.clone();
        ranking.sort_by(|a, b| b.ctr_percent.total_cmp(&a.ctr_percent));
        ranking
    }

    pub fn render_charts(&self) -> Result<Vec<ReportArtifact>> {
        let figures = [
            (IMPRESSIONS_CHART, self.impressions_figure()),
            (CTR_CHART, self.ctr_figure()),
            (COMPLETION_CHART, self.completion_figure()),
            (DEVICE_CHART, self.device_figure()),
            (TIMELINE_CHART, self.timeline_figure()),
        ];
        figures
            .into_iter()
            .map(|(name, figure)| -> Result<ReportArtifact> {
                Ok(ReportArtifact::output(name, figure.to_html()?.into_bytes()))
            })
            .collect()
    }

    pub fn impressions_figure(&self) -> Figure {
        let mut layout = Layout::new("Total Impressions by Platform", 1000, 500).centered_title();
        layout.xaxis = Some(Axis::titled("Impressions").log());
        layout.yaxis = Some(Axis::titled("Platform"));

        let mut figure = Figure::new(layout);
        for (platform, impressions) in self.impressions_ranking() {
            figure.add_trace(
                Trace::horizontal_bar(vec![impressions.into()], vec![platform.label().into()])
                    .named(platform.label())
                    .colored(platform.color())
                    .with_labels(vec![impressions_label(impressions)]),
            );
        }
        figure
    }

    pub fn ctr_figure(&self) -> Figure {
        let mut layout = Layout::new("Click Performance by Platform", 1000, 500).centered_title();
        layout.xaxis = Some(Axis {
            showticklabels: Some(false),
            ..Axis::default()
        });
        layout.yaxis = Some(Axis::titled("Platform"));

        let mut figure = Figure::new(layout);
        for rate in self.ctr_ranking() {
            figure.add_trace(
                Trace::horizontal_bar(
                    vec![rate.ctr_percent.into()],
                    vec![rate.platform.label().into()],
                )
                .named(rate.platform.label())
                .colored(rate.platform.color())
                .with_labels(vec![format!("{:.2}%", rate.ctr_percent)]),
            );
        }
        figure
    }

    pub fn completion_figure(&self) -> Figure {
        let layout = Layout::new("Video Completion Metrics by Platform", 1000, 600);
        let mut figure = Figure::new(layout)
            .with_two_panels("Completion per Impression", "Completions per Click");
        figure.layout.showlegend = Some(false);

        let mut per_impression = self.completion_metrics.clone();
        per_impression
            .sort_by(|a, b| b.completion_per_impression.total_cmp(&a.completion_per_impression));
        for m in &per_impression {
            figure.add_trace(
                Trace::bar(
                    vec![m.platform.label().into()],
                    vec![m.completion_per_impression.into()],
                )
                .named(m.platform.label())
                .colored(m.platform.color())
                .with_labels(vec![format!("{:.2}%", m.completion_per_impression)])
                .on_axes("x", "y"),
            );
        }

        let mut per_click = self.completion_metrics.clone();
        per_click.sort_by(|a, b| b.completions_per_click.total_cmp(&a.completions_per_click));
        for m in &per_click {
            figure.add_trace(
                Trace::bar(vec![m.platform.label().into()], vec![m.completions_per_click.into()])
                    .named(m.platform.label())
                    .colored(m.platform.color())
                    .with_labels(vec![format!("{:.2}", m.completions_per_click)])
                    .on_axes("x2", "y2")
                    .hide_legend(),
            );
        }
        figure
    }

    pub fn device_figure(&self) -> Figure {
        let mut layout = Layout::new("Video Completions by Device Type and Platform", 1000, 500)
            .centered_title();
        layout.barmode = Some("relative");
        layout.xaxis = Some(Axis::titled("Video Completions").log());

        // 依平台總完成數由大到小排列
        let mut platform_order: Vec<(Platform, u64)> = self
            .totals
            .iter()
            .map(|(p, t)| (*p, t.video_completions))
            .collect();
        platform_order.sort_by(|a, b| b.1.cmp(&a.1));
        layout.yaxis = Some(Axis {
            title: Axis::titled("Platform").title,
            categoryorder: Some("array"),
            categoryarray: Some(
                platform_order
                    .iter()
                    .rev()
                    .map(|(p, _)| p.label().to_string())
                    .collect(),
            ),
            ..Axis::default()
        });

        let mut devices: Vec<&str> = Vec::new();
        for row in &self.device_completions {
            if !devices.contains(&row.device_type.as_str()) {
                devices.push(&row.device_type);
            }
        }

        let mut figure = Figure::new(layout);
        for device in devices {
            let rows: Vec<&DeviceCompletions> = self
                .device_completions
                .iter()
                .filter(|r| r.device_type == device)
                .collect();
            let mut trace = Trace::horizontal_bar(
                rows.iter().map(|r| r.video_completions.into()).collect(),
                rows.iter().map(|r| r.platform.label().into()).collect(),
            )
            .named(device)
            .with_labels(rows.iter().map(|r| format!("{:.1}%", r.percentage)).collect());
            trace.textposition = None;
            if let Some(color) = device_color(device) {
                trace = trace.colored(color);
            }
            figure.add_trace(trace);
        }
        figure
    }

    pub fn timeline_figure(&self) -> Figure {
        let mut layout =
            Layout::new("Impressions Over Time by Platform", 1000, 500).centered_title();
        layout.xaxis = Some(Axis::titled("Date"));
        layout.yaxis = Some(Axis::titled("Impressions").log());

        let mut figure = Figure::new(layout);
        for (platform, _) in &self.totals {
            let points: Vec<&MonthlyImpressions> = self
                .monthly_impressions
                .iter()
                .filter(|m| m.platform == *platform)
                .collect();
            figure.add_trace(
                Trace::line(
                    points
                        .iter()
                        .map(|m| m.month.format("%Y-%m-%d").to_string().into())
                        .collect(),
                    points.iter().map(|m| m.impressions.into()).collect(),
                )
                .named(platform.label())
                .colored(platform.color()),
            );
        }
        figure
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn device_color(device: &str) -> Option<&'static str> {
    DEVICE_COLORS
        .iter()
        .find(|(name, _)| *name == device)
        .map(|(_, color)| *color)
}

/// `1.2B` from one billion up, `345.6M` below.
pub fn impressions_label(impressions: u64) -> String {
    let value = impressions as f64;
    if value >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else {
        format!("{:.1}M", value / 1e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        source: Platform,
        date: (i32, u32, u32),
        device: &str,
        imp: u64,
        clicks: u64,
        done: u64,
    ) -> PlatformRecord {
        PlatformRecord {
            campaign_id: "c".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            impressions: imp,
            clicks,
            video_completions: done,
            device_type: device.to_string(),
            advertiser_name: "Acme".to_string(),
            source,
        }
    }

    fn sample() -> Vec<PlatformRecord> {
        vec![
            record(Platform::Meta, (2017, 1, 5), "Desktop", 1_000, 10, 300),
            record(Platform::Meta, (2017, 1, 20), "Smartphone", 3_000, 50, 100),
            record(Platform::Meta, (2017, 2, 2), "Desktop", 2_000, 0, 0),
            record(Platform::TikTok, (2017, 1, 9), "Tablet", 500, 25, 0),
            record(Platform::Snapchat, (2017, 3, 1), "Smartphone", 0, 0, 0),
        ]
    }

    #[test]
    fn test_totals_keep_first_appearance_order() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let order: Vec<Platform> = analysis.totals.iter().map(|(p, _)| *p).collect();
        assert_eq!(order, vec![Platform::Meta, Platform::TikTok, Platform::Snapchat]);
        assert_eq!(
            analysis.totals[0].1,
            PlatformTotals {
                impressions: 6_000,
                clicks: 60,
                video_completions: 400
            }
        );
    }

    #[test]
    fn test_ctr_handles_zero_impressions() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let ranking = analysis.ctr_ranking();
        assert_eq!(ranking[0].platform, Platform::TikTok);
        assert!((ranking[0].ctr_percent - 5.0).abs() < 1e-9);
        assert!((ranking[1].ctr_percent - 1.0).abs() < 1e-9);
        assert_eq!(ranking[2].ctr_percent, 0.0);
    }

    #[test]
    fn test_completion_metrics() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let meta = &analysis.completion_metrics[0];
        assert!((meta.completion_per_impression - 400.0 / 6_000.0 * 100.0).abs() < 1e-9);
        assert!((meta.completions_per_click - 400.0 / 60.0).abs() < 1e-9);
        // clicks of zero are treated as one
        let snap = &analysis.completion_metrics[2];
        assert_eq!(snap.completions_per_click, 0.0);
    }

    #[test]
    fn test_device_share_of_platform() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let meta_desktop = analysis
            .device_completions
            .iter()
            .find(|d| d.platform == Platform::Meta && d.device_type == "Desktop")
            .unwrap();
        assert_eq!(meta_desktop.video_completions, 300);
        assert!((meta_desktop.percentage - 75.0).abs() < 1e-9);

        let tiktok_tablet = analysis
            .device_completions
            .iter()
            .find(|d| d.platform == Platform::TikTok)
            .unwrap();
        assert_eq!(tiktok_tablet.percentage, 0.0);
    }

    #[test]
    fn test_monthly_impressions_bucket_by_month() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let meta_january = analysis
            .monthly_impressions
            .iter()
            .find(|m| {
                m.platform == Platform::Meta
                    && m.month == NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
            })
            .unwrap();
        assert_eq!(meta_january.impressions, 4_000);
        assert_eq!(analysis.monthly_impressions.len(), 4);
    }

    #[test]
    fn test_impressions_label() {
        assert_eq!(impressions_label(1_250_000_000), "1.2B");
        assert_eq!(impressions_label(1_000_000_000), "1.0B");
        assert_eq!(impressions_label(345_600_000), "345.6M");
        assert_eq!(impressions_label(0), "0.0M");
    }

    #[test]
    fn test_impressions_figure_sorted_descending() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let figure = analysis.impressions_figure();
        let names: Vec<&str> = figure.data.iter().filter_map(|t| t.name.as_deref()).collect();
        assert_eq!(names, vec!["Meta", "TikTok", "Snapchat"]);
        assert_eq!(figure.data[0].text.as_ref().unwrap()[0], "0.0M");
    }

    #[test]
    fn test_render_charts_produces_five_pages() {
        let analysis = PlatformAnalysis::from_records(&sample());
        let charts = analysis.render_charts().unwrap();
        let names: Vec<&str> = charts.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![IMPRESSIONS_CHART, CTR_CHART, COMPLETION_CHART, DEVICE_CHART, TIMELINE_CHART]
        );
        for chart in charts {
            let html = String::from_utf8(chart.content).unwrap();
            assert!(html.contains("Plotly.newPlot"));
        }
    }
}
