#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```
//! use xbrl_parser::XbrlParser;
//!
//! let doc = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
//!     xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
//!     xmlns:us-gaap="http://fasb.org/us-gaap/2024">
//!   <xbrli:context id="c1">
//!     <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">1</xbrli:identifier></xbrli:entity>
//!     <xbrli:period><xbrli:instant>2024-12-31</xbrli:instant></xbrli:period>
//!   </xbrli:context>
//!   <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
//!   <us-gaap:Assets contextRef="c1" unitRef="usd" decimals="0">1000</us-gaap:Assets>
//! </xbrli:xbrl>"#;
//!
//! let instance = XbrlParser::new().parse_bytes(doc.as_bytes(), "a.xml", None).unwrap();
//! assert_eq!(instance.facts.len(), 1);
//! assert_eq!(instance.facts[0].normalized_value(), Some(1000.0));
//! ```

mod build;
mod dom;
mod inline;
mod xml;

/// Input sniffing: ZIP packages, inline and standalone documents.
pub mod detect;
/// Character encoding detection and decoding.
pub mod encoding;
/// ZIP filing packages.
pub mod package;
/// The parser entry point.
pub mod parser;
/// Tolerant clean-up of malformed documents.
pub mod recover;
/// Streaming fact extraction.
pub mod stream;
/// Inline XBRL number transformations.
pub mod transform;

pub use detect::{InputKind, classify_input, detect_format};
pub use package::ParsedPackage;
pub use parser::XbrlParser;
pub use stream::{FactStream, count_facts, parse_with_callback};
pub use transform::{TransformError, apply_format};
