//! Health metrics engine
//!
//! Pure, stateless functions mapping raw measurements to classifications and
//! derived values for the dashboard. Classification labels are presentation
//! strings; the severity tag carries the ordering used for display emphasis.

use crate::protocol::{HealthSample, UserProfile};

/// Presentation severity tag, ordered from neutral to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Gray,
    Green,
    Yellow,
    Orange,
    Red,
}

/// A classified measurement: label plus severity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub label: &'static str,
    pub severity: Severity,
}

impl Classification {
    const fn new(label: &'static str, severity: Severity) -> Self {
        Self { label, severity }
    }
}

const NOT_AVAILABLE: Classification = Classification::new("N/A", Severity::Gray);

/// Biological sex used by the ideal-weight formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Parse the backend's one-letter code; anything other than "M" is female,
    /// matching the formula's default branch.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("M") | Some("m") => Sex::Male,
            _ => Sex::Female,
        }
    }
}

/// Glucose measurement context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseMode {
    Fasting,
    Postprandial,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Body mass index, rounded to one decimal. None for missing or non-positive
/// inputs.
pub fn bmi(weight_kg: Option<f64>, height_m: Option<f64>) -> Option<f64> {
    let (weight, height) = (weight_kg?, height_m?);
    if weight <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(round1(weight / (height * height)))
}

/// Classify a BMI value into the six standard bands
pub fn classify_bmi(bmi: Option<f64>) -> Classification {
    let Some(value) = bmi else {
        return NOT_AVAILABLE;
    };

    if value < 18.5 {
        Classification::new("Abaixo do peso", Severity::Yellow)
    } else if value < 25.0 {
        Classification::new("Peso normal", Severity::Green)
    } else if value < 30.0 {
        Classification::new("Sobrepeso", Severity::Yellow)
    } else if value < 35.0 {
        Classification::new("Obesidade I", Severity::Orange)
    } else if value < 40.0 {
        Classification::new("Obesidade II", Severity::Red)
    } else {
        Classification::new("Obesidade III", Severity::Red)
    }
}

/// Ideal weight by the Robinson formula, rounded to one decimal
pub fn ideal_weight(height_m: Option<f64>, sex: Sex) -> Option<f64> {
    let height = height_m?;
    if height <= 0.0 {
        return None;
    }

    let height_cm = height * 100.0;
    let weight = match sex {
        Sex::Male => 52.0 + 1.9 * (height_cm - 152.4),
        Sex::Female => 49.0 + 1.7 * (height_cm - 152.4),
    };
    Some(round1(weight))
}

/// Classify blood pressure by tiered thresholds. Tiers are evaluated in fixed
/// order; the first matching tier wins.
pub fn classify_blood_pressure(systolic: Option<u32>, diastolic: Option<u32>) -> Classification {
    let (Some(sys), Some(dia)) = (systolic, diastolic) else {
        return NOT_AVAILABLE;
    };

    if sys < 120 && dia < 80 {
        Classification::new("Normal", Severity::Green)
    } else if sys < 130 && dia < 80 {
        Classification::new("Elevada", Severity::Yellow)
    } else if sys < 140 || dia < 90 {
        Classification::new("Hipertensão I", Severity::Orange)
    } else if sys < 180 || dia < 120 {
        Classification::new("Hipertensão II", Severity::Red)
    } else {
        Classification::new("Crise Hipertensiva", Severity::Red)
    }
}

/// Classify a glucose reading for the given measurement context
pub fn classify_glucose(value: Option<f64>, mode: GlucoseMode) -> Classification {
    let Some(glucose) = value else {
        return NOT_AVAILABLE;
    };

    let (normal_limit, pre_limit) = match mode {
        GlucoseMode::Fasting => (100.0, 126.0),
        GlucoseMode::Postprandial => (140.0, 200.0),
    };

    if glucose < normal_limit {
        Classification::new("Normal", Severity::Green)
    } else if glucose < pre_limit {
        Classification::new("Pré-diabetes", Severity::Yellow)
    } else {
        Classification::new("Diabetes", Severity::Red)
    }
}

/// Progress toward the ideal weight as a percentage, clamped to [0, 100] and
/// rounded to one decimal. None when an input is missing or the initial and
/// ideal weights are too close for the ratio to be meaningful.
pub fn weight_progress_percent(
    current: Option<f64>,
    initial: Option<f64>,
    ideal: Option<f64>,
) -> Option<f64> {
    let (current, initial, ideal) = (current?, initial?, ideal?);

    let total = initial - ideal;
    if total.abs() < 1e-6 {
        return None;
    }

    let percent = ((initial - current) / total) * 100.0;
    Some(round1(percent.clamp(0.0, 100.0)))
}

/// Derived dashboard analytics for the latest measurement
#[derive(Debug, Clone)]
pub struct HealthAnalysis {
    pub bmi: Option<f64>,
    pub bmi_class: Classification,
    pub ideal_weight_kg: Option<f64>,
    pub weight_progress: Option<f64>,
    pub blood_pressure_class: Classification,
    pub glucose_class: Classification,
}

impl HealthAnalysis {
    /// Compute every dashboard metric from the profile and the most recent
    /// measurement.
    pub fn derive(profile: &UserProfile, latest: Option<&HealthSample>) -> Self {
        let weight = latest.and_then(|s| s.weight_kg);
        let bmi_value = bmi(weight, profile.height_m);
        let sex = Sex::from_code(profile.sex.as_deref());
        let ideal = ideal_weight(profile.height_m, sex);

        Self {
            bmi: bmi_value,
            bmi_class: classify_bmi(bmi_value),
            ideal_weight_kg: ideal,
            weight_progress: weight_progress_percent(weight, profile.initial_weight_kg, ideal),
            blood_pressure_class: classify_blood_pressure(
                latest.and_then(|s| s.systolic),
                latest.and_then(|s| s.diastolic),
            ),
            glucose_class: classify_glucose(
                latest.and_then(|s| s.fasting_glucose),
                GlucoseMode::Fasting,
            ),
        }
    }
}
