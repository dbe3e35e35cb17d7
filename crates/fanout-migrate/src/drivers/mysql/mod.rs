//! MySQL/MariaDB source driver.
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled. It is
//! part of the default `full` feature set; a source-only build opts out of the
//! destination drivers:
//!
//! ```toml
//! [dependencies]
//! fanout-migrate = { version = "0.1", default-features = false, features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod reader;

pub use reader::MysqlReader;
