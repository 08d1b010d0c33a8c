use crate::lenient;
use serde::{Deserialize, Serialize};

/// Disease-specific record structure suggested for a diagnosis.
///
/// Every field is optional. The dynamic document renders a section only
/// for the lists that are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecordFormat {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub diagnosis_category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text_list")]
    pub vital_signs_needed: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_text_list")]
    pub examination_sections: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_text_list")]
    pub diagnostic_tests: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_text_list")]
    pub treatment_considerations: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_text_list")]
    pub warning_signs: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub follow_up_recommendations: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub medical_record_template: Option<String>,
}
