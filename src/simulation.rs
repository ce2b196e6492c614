use chrono::NaiveDateTime;
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{Priority, ProblemKind, ProblemReport, ProblemStatus, TIMESTAMP_FORMAT};

pub const SIMULATED_AREAS: [&str; 6] = ["朝阳区", "海淀区", "西城区", "东城区", "丰台区", "昌平区"];
pub const SIMULATED_SUB_TYPES: [&str; 5] =
    ["交通拥堵", "空气质量异常", "设备故障", "噪音超标", "水位异常"];

const AREA_CODE_PREFIX: &str = "11010";
const LNG_RANGE: (f64, f64) = (116.3, 116.8);
const LAT_RANGE: (f64, f64) = (39.9, 40.4);
const HIGH_PRIORITY_CHANCE: f64 = 0.3;

/// Builds one random pending report stamped with `now`.
pub fn synthesize_report<R: Rng>(rng: &mut R, now: NaiveDateTime) -> ProblemReport {
    let area = SIMULATED_AREAS.choose(rng).copied().unwrap_or(SIMULATED_AREAS[0]);
    let sub_type = SIMULATED_SUB_TYPES
        .choose(rng)
        .copied()
        .unwrap_or(SIMULATED_SUB_TYPES[0]);

    let kind = if rng.random_bool(0.5) {
        ProblemKind::Event
    } else {
        ProblemKind::SensorError
    };
    let priority = if rng.random_bool(HIGH_PRIORITY_CHANCE) {
        Priority::High
    } else {
        Priority::Medium
    };
    let device_id = if rng.random_bool(0.5) {
        Some(format!("DEV-{}", rng.random_range(0..1000)))
    } else {
        None
    };

    ProblemReport {
        id: Uuid::new_v4().to_string(),
        area: Some(area.to_string()),
        area_code: Some(format!("{AREA_CODE_PREFIX}{}", rng.random_range(0..9))),
        longitude: Some(rng.random_range(LNG_RANGE.0..LNG_RANGE.1)),
        latitude: Some(rng.random_range(LAT_RANGE.0..LAT_RANGE.1)),
        kind,
        sub_type: Some(sub_type.to_string()),
        priority,
        status: ProblemStatus::Pending,
        created_at: Some(now.format(TIMESTAMP_FORMAT).to_string()),
        response_minutes: Some(rng.random_range(5..65)),
        device_id,
        description: None,
        location: None,
        reporter_type: None,
    }
}

/// Handle to a running simulation timer.
pub struct SimulationHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    /// Stops future ticks. A tick already in progress is aborted at its next await.
    pub fn cancel(self) {
        self.token.cancel();
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-03-10 12:00:00", TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn synthesized_fields_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let report = synthesize_report(&mut rng, now());
            assert!(SIMULATED_AREAS.contains(&report.area.as_deref().unwrap()));
            assert!(SIMULATED_SUB_TYPES.contains(&report.sub_type.as_deref().unwrap()));
            let lng = report.longitude.unwrap();
            let lat = report.latitude.unwrap();
            assert!((116.3..116.8).contains(&lng));
            assert!((39.9..40.4).contains(&lat));
            assert!(matches!(report.priority, Priority::High | Priority::Medium));
            assert_eq!(report.status, ProblemStatus::Pending);
            let minutes = report.response_minutes.unwrap();
            assert!((5..65).contains(&minutes));
            let code = report.area_code.unwrap();
            assert!(code.starts_with("11010") && code.len() == 6);
            if let Some(device) = report.device_id {
                let n: u32 = device.trim_start_matches("DEV-").parse().unwrap();
                assert!(n < 1000);
            }
            assert_eq!(report.created_at.as_deref(), Some("2026-03-10 12:00:00"));
        }
    }

    #[test]
    fn same_seed_gives_same_draws() {
        let a = synthesize_report(&mut StdRng::seed_from_u64(5), now());
        let b = synthesize_report(&mut StdRng::seed_from_u64(5), now());
        assert_eq!(a.area, b.area);
        assert_eq!(a.longitude, b.longitude);
        assert_eq!(a.priority, b.priority);
        assert_eq!(a.device_id, b.device_id);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn both_priorities_appear_over_many_draws() {
        let mut rng = StdRng::seed_from_u64(3);
        let highs = (0..500)
            .filter(|_| synthesize_report(&mut rng, now()).priority == Priority::High)
            .count();
        assert!(highs > 100 && highs < 200, "unexpected high count {highs}");
    }
}
