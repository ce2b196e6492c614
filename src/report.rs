use std::fmt::Write;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;

use crate::models::{Priority, ProblemKind, ProblemReport, ProblemStatus};
use crate::stats;

const HOTSPOT_AREAS: [&str; 4] = ["朝阳区", "海淀区", "西城区", "东城区"];
const TOP_SUB_TYPES: [&str; 3] = ["交通拥堵", "设备故障", "空气质量异常"];
const FALLBACK_FOCUS_AREA: &str = "朝阳区";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    fn span_label(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "当日",
            ReportPeriod::Weekly => "本周",
            ReportPeriod::Monthly => "本月",
        }
    }

    fn title_label(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "日报",
            ReportPeriod::Weekly => "周报",
            ReportPeriod::Monthly => "月报",
        }
    }

    /// Whether `day` falls in this period's window around `anchor`.
    /// Weeks run Monday through Sunday.
    pub fn contains(&self, anchor: NaiveDate, day: NaiveDate) -> bool {
        match self {
            ReportPeriod::Daily => day == anchor,
            ReportPeriod::Weekly => {
                let week_start =
                    anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
                let week_end = week_start + Duration::days(6);
                day >= week_start && day <= week_end
            }
            ReportPeriod::Monthly => day.year() == anchor.year() && day.month() == anchor.month(),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(ReportPeriod::Daily),
            "weekly" => Ok(ReportPeriod::Weekly),
            "monthly" => Ok(ReportPeriod::Monthly),
            other => Err(format!("unknown report period: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Area(String),
}

impl ReportScope {
    fn label(&self) -> &str {
        match self {
            ReportScope::All => "全市",
            ReportScope::Area(area) => area,
        }
    }

    fn matches(&self, report: &ProblemReport) -> bool {
        match self {
            ReportScope::All => true,
            ReportScope::Area(area) => report.area.as_deref() == Some(area.as_str()),
        }
    }
}

impl FromStr for ReportScope {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "all" => ReportScope::All,
            area => ReportScope::Area(area.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub date: NaiveDate,
    pub period: ReportPeriod,
    pub scope: ReportScope,
}

/// Reports matching the request's scope and time window, in collection order.
pub fn filter_reports<'a>(
    reports: &'a [ProblemReport],
    request: &ReportRequest,
) -> Vec<&'a ProblemReport> {
    reports
        .iter()
        .filter(|report| request.scope.matches(report))
        .filter(|report| {
            report
                .created_date()
                .is_some_and(|day| request.period.contains(request.date, day))
        })
        .collect()
}

/// Completion percentage with one decimal; an empty window reads `0.0`.
pub fn completion_rate(resolved: usize, total: usize) -> String {
    if total == 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", resolved as f64 / total as f64 * 100.0)
}

pub fn build_report<R: Rng>(
    reports: &[ProblemReport],
    request: &ReportRequest,
    rng: &mut R,
) -> String {
    let filtered = filter_reports(reports, request);

    let total = filtered.len();
    let resolved = count(&filtered, |r| r.status == ProblemStatus::Resolved);
    let high_priority = count(&filtered, |r| r.priority == Priority::High);
    let events = count(&filtered, |r| r.kind == ProblemKind::Event);
    let sensor_errors = count(&filtered, |r| r.kind == ProblemKind::SensorError);
    let avg_minutes = stats::average_response_minutes(filtered.iter().copied()).round() as i64;
    let span = request.period.span_label();

    let mut output = String::new();

    let _ = writeln!(
        output,
        "# {}城市运行处置{}",
        request.scope.label(),
        request.period.title_label()
    );
    let _ = writeln!(output, "**报告日期**：{}", request.date.format("%Y-%m-%d"));
    let _ = writeln!(output, "**统计周期**：{span}");
    let _ = writeln!(output);

    let _ = writeln!(output, "## 一、总体概况");
    let _ = writeln!(output, "{span}共发生各类问题{total}起，其中：");
    let _ = writeln!(output, "- 事件类：{events}起");
    let _ = writeln!(output, "- 传感器异常：{sensor_errors}起");
    let _ = writeln!(output, "- 高优先级问题：{high_priority}起");
    let _ = writeln!(output, "- 处置完成率：{}%", completion_rate(resolved, total));
    let _ = writeln!(output, "- 平均响应时长：{avg_minutes}分钟");
    let _ = writeln!(output);

    let hotspots: Vec<String> = HOTSPOT_AREAS
        .iter()
        .map(|area| {
            let n = count(&filtered, |r| r.area.as_deref() == Some(*area));
            format!("{area}：{n}起")
        })
        .collect();
    let sub_types: Vec<String> = TOP_SUB_TYPES
        .iter()
        .map(|sub_type| {
            let n = count(&filtered, |r| r.sub_type.as_deref() == Some(*sub_type));
            format!("{sub_type}：{n}起")
        })
        .collect();

    let _ = writeln!(output, "## 二、重点问题");
    let _ = writeln!(output, "1. 问题高发区域：{}", hotspots.join("；"));
    let _ = writeln!(output, "2. 主要问题类型：{}", sub_types.join("；"));
    let _ = writeln!(output);

    let focus_area = match &request.scope {
        ReportScope::Area(area) if !filtered.is_empty() => area.as_str(),
        _ => FALLBACK_FOCUS_AREA,
    };

    let _ = writeln!(output, "## 三、改进建议");
    let _ = writeln!(output, "1. 优化{focus_area}资源配置，提升处置效率");
    let _ = writeln!(output, "2. 加强传感器设备维护，降低异常率");
    let _ = writeln!(
        output,
        "3. 缩短高优先级问题响应时长，目标控制在{}分钟内",
        (avg_minutes - 5).max(0)
    );
    let _ = writeln!(output, "4. 建立问题复盘机制，减少重复问题发生");
    let _ = writeln!(output);

    let focus_kind = if high_priority > 0 {
        "高优先级问题"
    } else {
        "设备故障问题"
    };
    let inspections: u32 = rng.random_range(10..30);

    let _ = writeln!(output, "## 四、后续计划");
    let _ = writeln!(output, "1. 明日/周/月重点关注{focus_kind}处置");
    let _ = writeln!(output, "2. 完成{inspections}台异常设备检修");
    let _ = write!(output, "3. 组织一次处置流程培训，提升团队效率");

    output
}

fn count<F>(reports: &[&ProblemReport], predicate: F) -> usize
where
    F: Fn(&ProblemReport) -> bool,
{
    reports.iter().filter(|report| predicate(**report)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::sample_report;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(period: ReportPeriod, scope: &str) -> ReportRequest {
        ReportRequest {
            date: date(2026, 3, 11),
            period,
            scope: scope.parse().unwrap(),
        }
    }

    fn fixture() -> Vec<ProblemReport> {
        let mut resolved = sample_report("1", "2026-03-11 08:00:00");
        resolved.status = ProblemStatus::Resolved;
        resolved.response_minutes = Some(20);
        let mut high = sample_report("2", "2026-03-11 09:00:00");
        high.priority = Priority::High;
        high.area = Some("海淀区".to_string());
        high.response_minutes = Some(31);
        let monday = sample_report("3", "2026-03-09 09:00:00");
        let sunday = sample_report("4", "2026-03-15 23:00:00");
        let next_monday = sample_report("5", "2026-03-16 00:00:00");
        let other_month = sample_report("6", "2026-02-11 09:00:00");
        vec![resolved, high, monday, sunday, next_monday, other_month]
    }

    fn ids(reports: Vec<&ProblemReport>) -> Vec<&str> {
        reports.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn daily_window_is_exact_day() {
        let reports = fixture();
        let filtered = filter_reports(&reports, &request(ReportPeriod::Daily, "all"));
        assert_eq!(ids(filtered), vec!["1", "2"]);
    }

    #[test]
    fn weekly_window_runs_monday_to_sunday() {
        let reports = fixture();
        let filtered = filter_reports(&reports, &request(ReportPeriod::Weekly, "all"));
        assert_eq!(ids(filtered), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn monthly_window_matches_calendar_month() {
        let reports = fixture();
        let filtered = filter_reports(&reports, &request(ReportPeriod::Monthly, "all"));
        assert_eq!(ids(filtered), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn scope_restricts_to_area() {
        let reports = fixture();
        let filtered = filter_reports(&reports, &request(ReportPeriod::Monthly, "海淀区"));
        assert_eq!(ids(filtered), vec!["2"]);
    }

    #[test]
    fn report_sections_reflect_counts() {
        let reports = fixture();
        let mut rng = StdRng::seed_from_u64(7);
        let text = build_report(&reports, &request(ReportPeriod::Daily, "all"), &mut rng);

        assert!(text.starts_with("# 全市城市运行处置日报"));
        assert!(text.contains("**报告日期**：2026-03-11"));
        assert!(text.contains("当日共发生各类问题2起"));
        assert!(text.contains("- 高优先级问题：1起"));
        assert!(text.contains("- 处置完成率：50.0%"));
        assert!(text.contains("- 平均响应时长：26分钟"));
        assert!(text.contains("朝阳区：1起；海淀区：1起；西城区：0起；东城区：0起"));
        assert!(text.contains("目标控制在21分钟内"));
        assert!(text.contains("重点关注高优先级问题处置"));
    }

    #[test]
    fn empty_window_has_finite_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let text = build_report(&[], &request(ReportPeriod::Weekly, "昌平区"), &mut rng);

        assert!(text.starts_with("# 昌平区城市运行处置周报"));
        assert!(text.contains("- 处置完成率：0.0%"));
        assert!(!text.contains("NaN"));
        assert!(!text.contains("inf"));
        assert!(text.contains("目标控制在0分钟内"));
        assert!(text.contains("优化朝阳区资源配置"));
        assert!(text.contains("重点关注设备故障问题处置"));
    }

    #[test]
    fn area_scope_with_data_is_named_in_suggestions() {
        let reports = fixture();
        let mut rng = StdRng::seed_from_u64(3);
        let text = build_report(&reports, &request(ReportPeriod::Daily, "海淀区"), &mut rng);

        assert!(text.starts_with("# 海淀区城市运行处置日报"));
        assert!(text.contains("当日共发生各类问题1起"));
        assert!(text.contains("- 处置完成率：0.0%"));
        assert!(text.contains("- 平均响应时长：31分钟"));
        assert!(text.contains("优化海淀区资源配置"));
    }

    #[test]
    fn inspection_count_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let text = build_report(&[], &request(ReportPeriod::Daily, "all"), &mut rng);
            let line = text
                .lines()
                .find(|line| line.starts_with("2. 完成"))
                .unwrap();
            let digits: String = line.chars().filter(|c| c.is_ascii_digit()).collect();
            let n: u32 = digits[1..].parse().unwrap();
            assert!((10..30).contains(&n), "out of range: {n}");
        }
    }

    #[test]
    fn period_parses_from_text() {
        assert_eq!("weekly".parse::<ReportPeriod>(), Ok(ReportPeriod::Weekly));
        assert!("yearly".parse::<ReportPeriod>().is_err());
    }
}
