use futures::{Stream, StreamExt};
use tracing::debug;

use super::Facet;
use crate::llm::{LLMError, StreamChunk};

/// Concatenate the text of every chunk in arrival order.
///
/// Chunks without text are skipped. An empty stream yields an empty string.
/// The first stream error aborts the aggregation.
pub async fn aggregate_stream<S>(facet: Facet, stream: S) -> Result<String, LLMError>
where
    S: Stream<Item = Result<StreamChunk, LLMError>>,
{
    futures::pin_mut!(stream);

    let mut aggregated = String::new();
    let mut chunks = 0usize;
    let mut skipped = 0usize;

    while let Some(chunk) = stream.next().await {
        chunks += 1;
        match chunk?.text {
            Some(fragment) => aggregated.push_str(&fragment),
            None => {
                skipped += 1;
                debug!("{} stream: chunk {} carried no text, skipping", facet, chunks);
            }
        }
    }

    debug!(
        "{} stream aggregated: {} chunks ({} skipped), {} chars",
        facet,
        chunks,
        skipped,
        aggregated.len()
    );

    Ok(aggregated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_concatenates_in_order() {
        let chunks = vec![
            Ok(StreamChunk::text("[{\"name\":")),
            Ok(StreamChunk::text("\"Board\",")),
            Ok(StreamChunk::text("\"summary\":\"x\"}]")),
        ];
        let text = assert_ok!(aggregate_stream(Facet::Control, stream::iter(chunks)).await);
        assert_eq!(text, "[{\"name\":\"Board\",\"summary\":\"x\"}]");
    }

    fn interleaved() -> Vec<Result<StreamChunk, LLMError>> {
        vec![
            Ok(StreamChunk::text("ab")),
            Ok(StreamChunk::empty()),
            Ok(StreamChunk::text("cd")),
            Ok(StreamChunk::empty()),
        ]
    }

    #[tokio::test]
    async fn test_skips_chunks_without_text() {
        let text = aggregate_stream(Facet::Economics, stream::iter(interleaved()))
            .await
            .unwrap();
        assert_eq!(text, "abcd");

        // Same input, same output
        let again = aggregate_stream(Facet::Economics, stream::iter(interleaved()))
            .await
            .unwrap();
        assert_eq!(again, text);
    }

    #[tokio::test]
    async fn test_empty_stream_is_empty_string() {
        let empty = stream::iter(Vec::<Result<StreamChunk, LLMError>>::new());
        assert_eq!(aggregate_stream(Facet::Security, empty).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_stream_error_aborts() {
        let chunks = vec![
            Ok(StreamChunk::text("{\"securityType\":")),
            Err(LLMError::Stream("connection dropped".to_string())),
            Ok(StreamChunk::text("\"SAFE\"}")),
        ];
        let result = aggregate_stream(Facet::Security, stream::iter(chunks)).await;
        assert_err!(result);
    }
}
