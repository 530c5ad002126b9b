pub mod csv;

pub use self::csv::{to_csv, CsvColumns, CsvExport};
