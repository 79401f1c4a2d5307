use serde::{Deserialize, Serialize};

use super::detection::Detection;

/// Conjunto cerrado de clases de madurez que el servicio contabiliza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaturityClass {
    Premature,
    Potential,
    Mature,
}

impl MaturityClass {
    /// Orden de clases del modelo (índice de clase = posición aquí).
    pub const ALL: [MaturityClass; 3] = [
        MaturityClass::Premature,
        MaturityClass::Potential,
        MaturityClass::Mature,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MaturityClass::Premature => "Premature",
            MaturityClass::Potential => "Potential",
            MaturityClass::Mature => "Mature",
        }
    }

    /// Coincidencia exacta de etiqueta; cualquier otra cosa queda fuera
    /// del conjunto (y por lo tanto fuera del recuento).
    pub fn from_label(label: &str) -> Option<Self> {
        MaturityClass::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Recuento por clase de un único frame. Se calcula una vez y no se toca.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaturityCounts {
    pub premature: u32,
    pub potential: u32,
    pub mature: u32,
}

impl MaturityCounts {
    /// Reduce una lista de detecciones a contadores por clase. Las
    /// etiquetas fuera del conjunto cerrado no suman a ningún contador,
    /// tampoco al total.
    pub fn tally(detections: &[Detection], min_confidence: f32) -> Self {
        let mut counts = Self::default();
        for det in detections {
            if det.confidence < min_confidence {
                continue;
            }
            match MaturityClass::from_label(&det.label) {
                Some(MaturityClass::Premature) => counts.premature += 1,
                Some(MaturityClass::Potential) => counts.potential += 1,
                Some(MaturityClass::Mature) => counts.mature += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.premature + self.potential + self.mature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: [0, 0, 10, 10],
        }
    }

    #[test]
    fn tally_counts_each_class() {
        let dets = vec![
            det("Premature", 0.9),
            det("Mature", 0.8),
            det("Premature", 0.75),
            det("Potential", 0.95),
        ];
        let counts = MaturityCounts::tally(&dets, 0.0);
        assert_eq!(counts.premature, 2);
        assert_eq!(counts.potential, 1);
        assert_eq!(counts.mature, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn tally_ignores_labels_outside_the_closed_set() {
        let dets = vec![
            det("Unknown", 0.99),
            det("premature", 0.99),
            det("Coconut", 0.99),
            det("Mature", 0.6),
        ];
        let counts = MaturityCounts::tally(&dets, 0.0);
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.mature, 1);
    }

    #[test]
    fn tally_applies_the_confidence_floor() {
        let dets = vec![det("Mature", 0.69), det("Mature", 0.71)];
        let counts = MaturityCounts::tally(&dets, 0.7);
        assert_eq!(counts.mature, 1);
    }

    #[test]
    fn counts_serialize_with_schema_names() {
        let counts = MaturityCounts {
            premature: 1,
            potential: 2,
            mature: 3,
        };
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["Premature"], 1);
        assert_eq!(json["Potential"], 2);
        assert_eq!(json["Mature"], 3);
    }

    #[test]
    fn class_labels_round_trip() {
        for class in MaturityClass::ALL {
            assert_eq!(MaturityClass::from_label(class.label()), Some(class));
        }
        assert_eq!(MaturityClass::from_label("MATURE"), None);
    }
}
