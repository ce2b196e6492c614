use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::models::{DailyCount, HeatPoint, Priority, ProblemKind, ProblemReport, Statistics};

const TREND_DAYS: i64 = 7;
const HEAT_WEIGHT_PER_REPORT: u32 = 10;

pub fn compute_statistics(reports: &[ProblemReport], today: NaiveDate) -> Statistics {
    let today_problems = reports
        .iter()
        .filter(|report| report.created_date() == Some(today))
        .count();

    let error_devices: HashSet<&str> = reports
        .iter()
        .filter(|report| report.kind == ProblemKind::SensorError)
        .filter_map(|report| report.device_id.as_deref())
        .collect();

    let high_priority = reports
        .iter()
        .filter(|report| report.priority == Priority::High)
        .count();

    let event_count = reports
        .iter()
        .filter(|report| report.kind == ProblemKind::Event)
        .count();
    let sensor_error_count = reports
        .iter()
        .filter(|report| report.kind == ProblemKind::SensorError)
        .count();

    Statistics {
        total_problems: reports.len(),
        today_problems,
        error_devices: error_devices.len(),
        high_priority,
        avg_response_time: average_response_minutes(reports).round() as u32,
        event_count,
        sensor_error_count,
        weekly_trend: weekly_trend(reports, today),
    }
}

/// Mean over reports that carry a response time; `0.0` when none do.
pub fn average_response_minutes<'a, I>(reports: I) -> f64
where
    I: IntoIterator<Item = &'a ProblemReport>,
{
    let samples: Vec<u32> = reports
        .into_iter()
        .filter_map(|report| report.response_minutes)
        .collect();
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|m| *m as f64).sum::<f64>() / samples.len() as f64
    }
}

pub fn weekly_trend(reports: &[ProblemReport], today: NaiveDate) -> Vec<DailyCount> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for date in reports.iter().filter_map(ProblemReport::created_date) {
        *per_day.entry(date).or_insert(0) += 1;
    }

    (0..TREND_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            DailyCount {
                date: date.format("%m-%d").to_string(),
                count: per_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Groups reports by exact coordinate pair, keeping first-seen order.
pub fn heatmap(reports: &[ProblemReport]) -> Vec<HeatPoint> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut points: Vec<HeatPoint> = Vec::new();

    for report in reports {
        let (Some(lng), Some(lat)) = (report.longitude, report.latitude) else {
            continue;
        };
        let key = (lng.to_bits(), lat.to_bits());
        match index.get(&key) {
            Some(position) => points[*position].weight += HEAT_WEIGHT_PER_REPORT,
            None => {
                index.insert(key, points.len());
                points.push(HeatPoint {
                    lng,
                    lat,
                    weight: HEAT_WEIGHT_PER_REPORT,
                });
            }
        }
    }

    points
}

/// Most recent reports first; records without a readable timestamp go last.
pub fn most_recent(reports: &[ProblemReport], limit: usize) -> Vec<ProblemReport> {
    let mut sorted = reports.to_vec();
    sorted.sort_by(|a, b| match (a.created_time(), b.created_time()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted.truncate(limit);
    sorted
}
