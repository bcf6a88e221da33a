/// Stylistic parameters for a headshot generation
///
/// This struct stores every style axis the user can tweak before
/// generating. It is serialized to JSON as part of each saved project,
/// so a project can be reloaded with exactly the configuration that
/// produced its images.

use serde::{Deserialize, Serialize};

/// The named style axes of a [`FeatureConfiguration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureAxis {
    Vibe,
    Pose,
    Attire,
    Background,
    Grooming,
    Expression,
    CameraAngle,
    LensDepth,
    ColorGrade,
}

impl FeatureAxis {
    /// All axes, in the order they are presented to the user
    pub const ALL: [FeatureAxis; 9] = [
        FeatureAxis::Vibe,
        FeatureAxis::Pose,
        FeatureAxis::Attire,
        FeatureAxis::Background,
        FeatureAxis::Grooming,
        FeatureAxis::Expression,
        FeatureAxis::CameraAngle,
        FeatureAxis::LensDepth,
        FeatureAxis::ColorGrade,
    ];

    /// Human-readable label for the axis
    pub fn label(self) -> &'static str {
        match self {
            Self::Vibe => "Vibe",
            Self::Pose => "Pose",
            Self::Attire => "Attire",
            Self::Background => "Background",
            Self::Grooming => "Grooming",
            Self::Expression => "Expression",
            Self::CameraAngle => "Camera Angle",
            Self::LensDepth => "Lens Depth",
            Self::ColorGrade => "Color Grade",
        }
    }
}

/// All style parameters for a headshot
///
/// Values are free text and are passed to the generation gateway as-is.
/// Field names serialize in camelCase to match the persisted project format.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfiguration {
    // ========== Subject ==========

    /// Overall mood of the portrait (e.g. corporate, creative)
    pub vibe: String,

    /// Body and head position
    pub pose: String,

    /// Clothing
    pub attire: String,

    /// Hair and facial grooming
    pub grooming: String,

    /// Facial expression
    pub expression: String,

    // ========== Scene ==========

    /// Backdrop behind the subject
    pub background: String,

    // ========== Camera ==========

    /// Camera position relative to the subject
    pub camera_angle: String,

    /// Focal length and depth of field
    pub lens_depth: String,

    /// Color treatment of the final image
    pub color_grade: String,
}

impl Default for FeatureConfiguration {
    /// The configuration every new project starts from
    fn default() -> Self {
        Self {
            vibe: "Corporate professional".to_string(),
            pose: "Head and shoulders, facing the camera".to_string(),
            attire: "Tailored navy business suit".to_string(),
            grooming: "Neat and natural".to_string(),
            expression: "Confident, approachable smile".to_string(),
            background: "Soft grey studio backdrop".to_string(),
            camera_angle: "Eye level".to_string(),
            lens_depth: "85mm portrait lens, shallow depth of field".to_string(),
            color_grade: "Natural, true-to-life tones".to_string(),
        }
    }
}

impl FeatureConfiguration {
    /// Read the value of one axis
    pub fn get(&self, axis: FeatureAxis) -> &str {
        match axis {
            FeatureAxis::Vibe => &self.vibe,
            FeatureAxis::Pose => &self.pose,
            FeatureAxis::Attire => &self.attire,
            FeatureAxis::Background => &self.background,
            FeatureAxis::Grooming => &self.grooming,
            FeatureAxis::Expression => &self.expression,
            FeatureAxis::CameraAngle => &self.camera_angle,
            FeatureAxis::LensDepth => &self.lens_depth,
            FeatureAxis::ColorGrade => &self.color_grade,
        }
    }

    /// Replace the value of one axis, leaving the others untouched
    pub fn set(&mut self, axis: FeatureAxis, value: impl Into<String>) {
        let slot = match axis {
            FeatureAxis::Vibe => &mut self.vibe,
            FeatureAxis::Pose => &mut self.pose,
            FeatureAxis::Attire => &mut self.attire,
            FeatureAxis::Background => &mut self.background,
            FeatureAxis::Grooming => &mut self.grooming,
            FeatureAxis::Expression => &mut self.expression,
            FeatureAxis::CameraAngle => &mut self.camera_angle,
            FeatureAxis::LensDepth => &mut self.lens_depth,
            FeatureAxis::ColorGrade => &mut self.color_grade,
        };
        *slot = value.into();
    }

    /// Iterate `(axis, value)` pairs in presentation order
    pub fn entries(&self) -> impl Iterator<Item = (FeatureAxis, &str)> + '_ {
        FeatureAxis::ALL.into_iter().map(move |axis| (axis, self.get(axis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let features = FeatureConfiguration::default();

        assert_eq!(features.get(FeatureAxis::Vibe), "Corporate professional");
        assert_eq!(features.get(FeatureAxis::CameraAngle), "Eye level");
        assert!(features.entries().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn test_set_changes_only_one_axis() {
        let mut features = FeatureConfiguration::default();
        features.set(FeatureAxis::Attire, "Charcoal turtleneck");

        assert_eq!(features.get(FeatureAxis::Attire), "Charcoal turtleneck");
        for (axis, value) in features.entries() {
            if axis != FeatureAxis::Attire {
                assert_eq!(value, FeatureConfiguration::default().get(axis));
            }
        }
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let json = serde_json::to_string(&FeatureConfiguration::default()).unwrap();

        assert!(json.contains("\"cameraAngle\""));
        assert!(json.contains("\"lensDepth\""));
        assert!(json.contains("\"colorGrade\""));
        assert!(!json.contains("camera_angle"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result = serde_json::from_str::<FeatureConfiguration>(r#"{"vibe":"Creative"}"#);
        assert!(result.is_err());
    }
}
