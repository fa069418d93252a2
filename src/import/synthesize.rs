use chrono::{Days, Months, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Builder;

use crate::models::{Gender, PatientSource, Ward};

use super::names;

pub const MIN_AGE_YEARS: u32 = 10;
pub const MAX_AGE_YEARS: u32 = 80;

/// One row of the cleaned clinical dataset.
///
/// Admission flags default to 0. Everything else must be present for
/// the row to be kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    pub patient_id: String,
    #[serde(default)]
    pub regular_ward: u8,
    #[serde(default)]
    pub semi_intensive: u8,
    #[serde(default)]
    pub intensive_care: u8,
    pub test_result: Option<u8>,
    pub has_disease: Option<u8>,
    pub age_quantile: Option<f64>,
    pub leukocytes: Option<f64>,
    pub platelets: Option<f64>,
    pub mean_platelet_volume: Option<f64>,
    pub eosinophils: Option<f64>,
    pub monocytes: Option<f64>,
}

/// Row counts from one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// A row with every value present.
struct CompleteRow {
    ward: Ward,
    test_result: bool,
    has_disease: bool,
    age_quantile: f64,
    leukocytes: f64,
    platelets: f64,
    mean_platelet_volume: f64,
    eosinophils: f64,
    monocytes: f64,
}

impl CleanedRow {
    /// Admission ward: first set flag of regular, semi-intensive, intensive.
    pub fn ward(&self) -> Ward {
        if self.regular_ward != 0 {
            Ward::RegularWard
        } else if self.semi_intensive != 0 {
            Ward::SemiIntensive
        } else if self.intensive_care != 0 {
            Ward::IntensiveCare
        } else {
            Ward::NoAllocation
        }
    }

    fn complete(&self) -> Option<CompleteRow> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Some(CompleteRow {
            ward: self.ward(),
            test_result: self.test_result? != 0,
            has_disease: self.has_disease? != 0,
            age_quantile: finite(self.age_quantile)?,
            leukocytes: finite(self.leukocytes)?,
            platelets: finite(self.platelets)?,
            mean_platelet_volume: finite(self.mean_platelet_volume)?,
            eosinophils: finite(self.eosinophils)?,
            monocytes: finite(self.monocytes)?,
        })
    }
}

/// Map an age quantile from `[lo, hi]` onto whole years in
/// `[MIN_AGE_YEARS, MAX_AGE_YEARS]`. A degenerate range maps to the minimum.
pub fn age_from_quantile(quantile: f64, lo: f64, hi: f64) -> u32 {
    let span = hi - lo;
    if span <= 0.0 {
        return MIN_AGE_YEARS;
    }
    let years = f64::from(MAX_AGE_YEARS - MIN_AGE_YEARS) * (quantile - lo) / span
        + f64::from(MIN_AGE_YEARS);
    (years as u32).clamp(MIN_AGE_YEARS, MAX_AGE_YEARS)
}

/// `today` minus `age` years, then a random 0..=12 months and 0..=31 days.
pub fn birth_date_for_age<R: Rng + ?Sized>(age: u32, today: NaiveDate, rng: &mut R) -> NaiveDate {
    let months = age * 12 + rng.gen_range(0..=12);
    let days = rng.gen_range(0..=31u64);
    today
        .checked_sub_months(Months::new(months))
        .and_then(|d| d.checked_sub_days(Days::new(days)))
        .unwrap_or(today)
}

/// Give every complete row a synthetic identity.
///
/// Incomplete rows are dropped and counted. The age range is taken from
/// the kept rows only.
pub fn synthesize_patients<R: Rng + ?Sized>(
    rows: &[CleanedRow],
    rng: &mut R,
    today: NaiveDate,
) -> (Vec<PatientSource>, ImportSummary) {
    let complete: Vec<CompleteRow> = rows.iter().filter_map(CleanedRow::complete).collect();

    let (lo, hi) = complete.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.age_quantile), hi.max(r.age_quantile))
    });

    let sources: Vec<PatientSource> = complete
        .into_iter()
        .map(|row| {
            let gender = if rng.gen_bool(0.5) { Gender::Male } else { Gender::Female };
            let age = age_from_quantile(row.age_quantile, lo, hi);
            PatientSource {
                id: Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
                family_name: names::family_name(rng),
                given_name: names::given_name(gender, rng),
                gender,
                birth_date: birth_date_for_age(age, today, rng),
                ward_allocation: row.ward,
                test_result: row.test_result,
                has_disease: row.has_disease,
                leukocytes: row.leukocytes,
                platelets: row.platelets,
                mean_platelet_volume: row.mean_platelet_volume,
                eosinophils: row.eosinophils,
                monocytes: row.monocytes,
            }
        })
        .collect();

    let summary = ImportSummary {
        rows_read: rows.len(),
        rows_kept: sources.len(),
        rows_dropped: rows.len() - sources.len(),
    };
    (sources, summary)
}
