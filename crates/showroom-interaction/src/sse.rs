//! Minimal server-sent-events decoding over a chunked byte stream.

use futures::StreamExt;
use futures::stream::{BoxStream, Stream};

/// Yields the payload of every `data:` line. Chunks may split lines (and
/// multi-byte characters) anywhere; comments, `event:` lines and the
/// `[DONE]` sentinel are dropped.
pub fn data_payloads<S, B, E>(bytes: S) -> BoxStream<'static, Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let stream = async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(err);
                    break;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(data) = data_of(&line) {
                    yield Ok(data);
                }
            }
        }

        if let Some(data) = data_of(&buffer) {
            yield Ok(data);
        }
    };
    stream.boxed()
}

fn data_of(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    async fn collect(chunks: Vec<&'static str>) -> Vec<String> {
        let source = stream::iter(chunks.into_iter().map(|chunk| Ok::<_, Infallible>(chunk.as_bytes())));
        data_payloads(source)
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let payloads = collect(vec!["data: {\"a\":", "1}\n\ndata: {\"b\":2}\r\n", "\n"]).await;
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_non_data_lines_are_dropped() {
        let payloads = collect(vec![
            ": keep-alive\n",
            "event: content_block_delta\n",
            "data: x\n\n",
            "data: [DONE]\n",
        ])
        .await;
        assert_eq!(payloads, vec!["x"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let payloads = collect(vec!["data: first\n", "data: last"]).await;
        assert_eq!(payloads, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split() {
        let text = "data: caf\u{e9}\n";
        let bytes = text.as_bytes();
        let split = bytes.len() - 2;
        let source = stream::iter(vec![
            Ok::<_, Infallible>(bytes[..split].to_vec()),
            Ok(bytes[split..].to_vec()),
        ]);
        let payloads: Vec<String> = data_payloads(source).map(|item| item.unwrap()).collect().await;
        assert_eq!(payloads, vec!["caf\u{e9}"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let source = stream::iter(vec![Ok(b"data: a\n".to_vec()), Err("reset"), Ok(b"data: b\n".to_vec())]);
        let items: Vec<Result<String, &str>> = data_payloads(source).collect().await;
        assert_eq!(items, vec![Ok("a".to_string()), Err("reset")]);
    }
}
