//! Funding-chain graph for rxledger.
//!
//! Models the directed acyclic graph where an edge `source → consumer` means
//! "the consumer's balance was partly funded by drawing on the source's
//! remaining balance". The graph lives inside the stored groups
//! (`source_transaction_id`, `linked_transaction_ids`, entry `funding_path`);
//! [`FundingChainResolver`] maintains and queries it.

pub mod error;
pub mod resolver;

pub use error::{FundingError, FundingResult};
pub use resolver::{
    FundingChain, FundingChainResolver, FundingSource, FundingSourceReport, LinkedGroupSummary,
    UsageRecorded,
};
