//! Label expressions for matching tasks to execution nodes.
//!
//! A label expression is a boolean formula over label atoms. Nodes carry a
//! set of atoms (always including their own name); a node is eligible for a
//! task when the task's expression evaluates to true against that set.
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! let label = label::parse("common1 && common2")?;
//! assert_eq!(label.to_string(), "common1&&common2");
//!
//! let node: BTreeSet<String> = ["node3", "common1", "common2"]
//!     .into_iter()
//!     .map(String::from)
//!     .collect();
//! assert!(label.matches(&node));
//! # Ok::<(), label::Error>(())
//! ```

mod error;
mod expr;
mod parser;

pub use error::{Error, Result};
pub use expr::Label;
pub use parser::parse;
