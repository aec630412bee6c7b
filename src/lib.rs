//! lru-gen-driver library
//!
//! Userspace driver for the Linux multi-generational LRU. The library
//! classifies physical pages from `/proc/kpageflags`, measures contiguous
//! reclaimable memory, and drives per-memcg aging and eviction through the
//! lru_gen debugfs interface.
//!
//! # Features
//!
//! - **Page classification**: priority-ordered flag decoding with compound-page inheritance
//! - **Contiguity statistics**: free/file totals over reclaim-unit sized windows
//! - **Generation control**: reclaim-then-age directives per memcg
//! - **Testable I/O**: flag tables and command ports are traits with in-memory doubles
//!
//! # Usage
//!
//! ```rust
//! use lru_gen_driver::kpageflags::InMemoryFlagTable;
//! use lru_gen_driver::lru_gen::MemoryPort;
//! use lru_gen_driver::{CycleDriver, DriverConfig};
//!
//! let cfg = DriverConfig {
//!     page_size: 4096,
//!     ..DriverConfig::default()
//! };
//! let table = InMemoryFlagTable::from_words(&[1 << 10, 1 << 10, 1 << 5, 0]);
//! let port = MemoryPort::new("memcg 5 /app\n node 0\n 2 100 10 20\n 3 50 5 15\n 4 10 2 8\n");
//!
//! let mut driver = CycleDriver::new(&cfg, table, port);
//! let report = driver.run_cycle().unwrap();
//!
//! assert_eq!(driver.port().written(), vec!["- 5 0 2 0", "+ 5 0 4 0 0"]);
//! println!("{}", report.render_delta_text());
//! ```

pub mod contiguity;
pub mod driver;
pub mod error;
pub mod kpageflags;
pub mod lru_gen;
pub mod report;
pub mod scheduler;
pub mod settings;

// Re-export main types for convenience
pub use contiguity::{ContiguityAggregator, ContiguitySummary};
pub use driver::CycleDriver;
pub use error::{DriverError, LedgerError, PortError};
pub use report::{CycleReport, SnapshotDelta, SnapshotReport};
pub use scheduler::{FixedTicks, IntervalTicker, StopSignal, Ticker};
pub use settings::DriverConfig;
