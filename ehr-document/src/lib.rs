//! Printable consultation notes (Catatan Medis Elektronik).
//!
//! Two layouts are rendered from embedded Tera templates:
//!
//! - the fixed note, built from the stored consultation, its patient and
//!   optional vitals/therapy captured at upload time
//! - the dynamic note, whose vital-sign and examination sections follow a
//!   [`MedicalRecordFormat`] suggested for the diagnosis
//!
//! Every interpolated value is HTML-escaped. Missing values render as `—`.

pub mod document;
pub mod error;
pub mod format;
pub mod lenient;
pub mod locale;

pub use document::{
    record_number, DynamicEhrInput, EhrGenerator, EhrInput, PatientInfo, Vitals, PLACEHOLDER,
};
pub use error::{EhrError, EhrResult};
pub use format::MedicalRecordFormat;
