//! Data API services
//!
//! - `balance`: account balances at a pinned block
//! - `block`: blocks and their transactions as operations

pub mod balance;
pub mod block;

pub use balance::BalanceService;
pub use block::BlockService;

use crate::client::{BlockQuery, ChainClient, ClientError};
use crate::core::Block;
use crate::error::ApiError;
use crate::types::PartialBlockIdentifier;

/// Block selector from a partial identifier; both fields empty means latest
pub fn block_query(partial: &PartialBlockIdentifier) -> Result<BlockQuery, ApiError> {
    match (partial.index, &partial.hash) {
        (Some(index), _) => u64::try_from(index)
            .map(BlockQuery::Height)
            .map_err(|_| ApiError::InvalidBlockIdentifier(format!("negative index {}", index))),
        (None, Some(hash)) => {
            if hash.is_empty() || hex::decode(hash).is_err() {
                return Err(ApiError::InvalidBlockIdentifier(format!(
                    "malformed hash {:?}",
                    hash
                )));
            }
            Ok(BlockQuery::Hash(hash.clone()))
        }
        (None, None) => Ok(BlockQuery::Latest),
    }
}

/// Fetch the block a partial identifier names.
///
/// When both index and hash are given they must agree.
pub async fn fetch_block<C: ChainClient>(
    client: &C,
    partial: &PartialBlockIdentifier,
) -> Result<Block, ApiError> {
    let query = block_query(partial)?;
    let block = client.block(&query).await.map_err(|e| match e {
        ClientError::NotFound(what) => ApiError::InvalidBlockIdentifier(what),
        other => ApiError::Chain(other),
    })?;

    if let (Some(_), Some(hash)) = (partial.index, &partial.hash) {
        if !block.header.hash.eq_ignore_ascii_case(hash) {
            return Err(ApiError::InvalidBlockIdentifier(format!(
                "block {} has hash {}, not {}",
                block.header.height, block.header.hash, hash
            )));
        }
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(index: Option<i64>, hash: Option<&str>) -> PartialBlockIdentifier {
        PartialBlockIdentifier {
            index,
            hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_block_query() {
        assert_eq!(block_query(&partial(None, None)), Ok(BlockQuery::Latest));
        assert_eq!(
            block_query(&partial(Some(5), Some("AB"))),
            Ok(BlockQuery::Height(5))
        );
        assert_eq!(
            block_query(&partial(None, Some("ab01"))),
            Ok(BlockQuery::Hash("ab01".to_string()))
        );
        assert!(block_query(&partial(Some(-1), None)).is_err());
        assert!(block_query(&partial(None, Some("xyz"))).is_err());
        assert!(block_query(&partial(None, Some(""))).is_err());
    }
}
