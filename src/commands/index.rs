//! Repository front-page summary (tag 1).
//!
//! No request body. Success response: status `0`, README content as sized
//! data, then up to three head commits in log-entry framing. Error statuses
//! for this command: `4` no head tree, `5` no README, `6` README is not a
//! blob, `8` content unavailable, `9` revision walk failed.

use tokio::io::AsyncWrite;

use super::put_log_entry;
use crate::codec::WireWriter;
use crate::engine::{EngineError, Repository};
use crate::error::WireError;

fn status_for(err: &EngineError) -> u64 {
    match err {
        EngineError::BadObjectId => 4,
        EngineError::NotFound => 5,
        EngineError::WrongType => 6,
        EngineError::Resource => 8,
        EngineError::Engine(_) => 9,
    }
}

pub(crate) async fn index_summary<R, Out>(
    repo: &R,
    writer: &mut WireWriter<Out>,
) -> Result<(), WireError>
where
    R: Repository,
    Out: AsyncWrite + Unpin,
{
    let summary = match repo.index_summary() {
        Ok(s) => s,
        Err(e) => return writer.put_uint(status_for(&e)).await,
    };

    writer.put_uint(0).await?;
    writer.put_data(&summary.readme).await?;
    for entry in &summary.commits {
        put_log_entry(writer, entry).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&EngineError::NotFound), 5);
        assert_eq!(status_for(&EngineError::WrongType), 6);
        assert_eq!(status_for(&EngineError::Engine("walk".into())), 9);
    }
}
