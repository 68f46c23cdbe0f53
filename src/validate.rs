// src/validate.rs
use crate::error::MalformedFeed;
use crate::feed::{FeedEntry, ParseResult};

/// Accept a parse result only if the parser did not flag it as garbage.
/// Consumes the result; on success yields its entries in document order.
pub fn validate(result: ParseResult) -> Result<Vec<FeedEntry>, MalformedFeed> {
    if result.malformed {
        return Err(MalformedFeed {
            diagnostic: result
                .diagnostic
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "unknown parser error".to_string()),
        });
    }
    Ok(result.entries)
}
