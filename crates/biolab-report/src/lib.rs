//! biolab-report: CSV export of class results and HTML analysis reports.

pub mod csv;
pub mod html;

pub use csv::{export_csv, export_file_name, write_csv_report};
pub use html::{generate_html, write_html_report};
