//! Upload ingestion for betadrop.
//!
//! # Pipeline
//!
//! 1. **Validate**: the file extension must map to a platform
//! 2. **Identify**: draw a fresh bundle id
//! 3. **Stage**: write the package bytes once and fsync them
//! 4. **Parse**: extract metadata and the icon through a [`PackageParser`]
//! 5. **Persist icon**: store the icon as PNG under the same id
//! 6. **Commit**: insert the bundle record
//! 7. **Respond**: build the wire payload
//!
//! Every step is terminal on failure. Nothing is retried, and a record only
//! becomes visible after both artifacts are on disk.

pub mod error;
pub mod id;
pub mod orchestrator;
pub mod parser;

pub use error::{IdError, IngestError};
pub use orchestrator::{IngestOrchestrator, Upload};
pub use parser::{CommandParser, PackageMetadata, PackageParser, ParseError, UnconfiguredParser};
