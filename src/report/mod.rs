//! Report assembly and rendering.

pub mod assembler;
pub mod generator;

pub use assembler::{assemble, DatasetOutcome, DatasetParts, ReportContext};
pub use generator::{
    generate_html_report, generate_json_report, generate_markdown_report, RenderOptions,
};
