//! Product feed validation.
//!
//! # Layers
//!
//! - [`field`] - one value against one [`crate::spec::FieldSpec`]
//! - [`conditional`] - "required if ..." rules that read sibling fields
//! - [`feed`] - every record and every field, aggregated into a [`FeedReport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use feedcheck::{validate_feed, FieldSpecRegistry, Record};
//!
//! let records = vec![Record::new().with("title", "Shoe")];
//! let report = validate_feed(&records, FieldSpecRegistry::builtin());
//!
//! assert_eq!(report.total_records, 1);
//! for issue in &report.record_reports[0].errors {
//!     println!("{}", issue);
//! }
//! ```

pub mod conditional;
pub mod feed;
pub mod field;

pub use conditional::check_conditional;
pub use feed::{
    validate_feed, FeedReport, FeedValidator, FieldCoverage, RecordReport, ValidationOptions,
};
pub use field::{is_valid_url, parse_integer, parse_number, validate_field, FieldValidation};
