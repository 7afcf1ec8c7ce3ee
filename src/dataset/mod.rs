//! Sample data preparation for the evaluation pipeline.
//!
//! Loading numeric files, column normalization, row stacking and seeded
//! splitting. None of this is used by the diversity engine itself.

pub mod loader;
pub mod split;

pub use loader::{labels, load_csv, normalize_max, parse_csv, stack_rows};
pub use split::{take_fraction, train_test_split};
