use crate::analysis::domain::observation::FaceObservation;

/// Spanish display label for a gender classification.
///
/// Total on any input: exactly `"Woman"` maps to `"Mujer"`; every other
/// label, including unexpected ones, maps to `"Hombre"`.
pub fn spanish_gender(label: &str) -> &'static str {
    if label == "Woman" {
        "Mujer"
    } else {
        "Hombre"
    }
}

/// Overlay text for one observation: `"<gender>, <age> anios"`.
pub fn label_text(observation: &FaceObservation) -> String {
    let gender = observation
        .dominant_gender()
        .map(spanish_gender)
        .unwrap_or("Hombre");
    format!("{}, {} anios", gender, observation.age)
}
