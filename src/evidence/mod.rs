//! Evidence gate: the boundary between Oracle proposals and output rows
//!
//! Nothing the Oracle returns reaches an output row without passing through
//! [`EvidenceGate::enforce`] (field sheets) or [`gate_schedule_item`]
//! (schedule records), both checked against an [`EvidenceRecord`] rebuilt
//! from the fetch results the proposal was derived from.

pub mod gate;
pub mod record;

pub use gate::{
    AcceptedFields, EvidenceGate, ExtractedField, FieldClass, FieldSchema, FieldSpec,
    ItemRejection, Provenance, ScheduleItem, SocialNetwork, gate_schedule_item, parse_iso_date,
    value_as_text,
};
pub use record::EvidenceRecord;
