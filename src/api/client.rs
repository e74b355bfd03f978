use super::{config, errors::BackendError};
use reqwest::{Client, Response};
use serde_json::{json, Value};

/// Client for the generation backend.
pub struct GenerationClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GenerationClient {
    /// Without an API key the backend falls back to its own environment.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Requests a complete reply in one response.
    pub async fn generate(&self, message: &str, context: &str) -> Result<String, BackendError> {
        log::debug!("Calling generate endpoint ({} context bytes)", context.len());

        let response = self
            .client
            .post(format!("{}{}", self.base_url, config::GENERATE_ENDPOINT))
            .json(&json!({
                "message": message,
                "context": context,
                "apiKey": self.api_key,
            }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let json_response: Value = serde_json::from_str(&response.text().await?)?;
        let text = json_response["response"]
            .as_str()
            .ok_or(BackendError::EmptyResponse)?
            .to_string();

        log::info!("Backend response: {} bytes", text.len());
        Ok(text)
    }

    /// Streams a reply, handing every text chunk to `on_chunk` as it arrives.
    /// Returns the concatenated text.
    pub async fn stream<F>(&self, prompt: &str, mut on_chunk: F) -> Result<String, BackendError>
    where
        F: FnMut(&str),
    {
        log::debug!("Calling stream endpoint");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, config::STREAM_ENDPOINT))
            .json(&json!({
                "prompt": prompt,
                "apiKey": self.api_key,
            }))
            .send()
            .await?;
        let mut response = check_status(response).await?;

        let mut decoder = NdjsonDecoder::default();
        let mut full = String::new();
        while let Some(bytes) = response.chunk().await? {
            for chunk in decoder.push(&bytes)? {
                on_chunk(&chunk);
                full.push_str(&chunk);
            }
        }
        if let Some(chunk) = decoder.finish()? {
            on_chunk(&chunk);
            full.push_str(&chunk);
        }

        log::info!("Backend stream finished: {} bytes", full.len());
        Ok(full)
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(body);

    if message == "No API key provided" {
        return Err(BackendError::MissingApiKey);
    }
    Err(BackendError::ApiError {
        status: status.as_u16(),
        message,
    })
}

/// Splits a byte stream into newline-delimited JSON records and pulls out
/// their `response` text. Records may arrive split across network chunks.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, BackendError> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(text) = decode_line(&line)? {
                chunks.push(text);
            }
        }
        Ok(chunks)
    }

    /// Decodes a trailing record that was not newline-terminated.
    pub fn finish(&mut self) -> Result<Option<String>, BackendError> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> Result<Option<String>, BackendError> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let record: Value = serde_json::from_str(text)?;
    if let Some(error) = record["error"].as_str() {
        return Err(BackendError::ApiError {
            status: 200,
            message: error.to_string(),
        });
    }
    Ok(record["response"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_records_split_across_chunks() {
        let mut decoder = NdjsonDecoder::default();

        assert!(decoder.push(b"{\"respon").unwrap().is_empty());
        assert_eq!(
            decoder.push(b"se\": \"Hel\"}\n{\"response\": \"lo\"}\n{\"resp").unwrap(),
            vec!["Hel".to_string(), "lo".to_string()]
        );
        assert!(decoder.push(b"onse\": \"!\"}").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), Some("!".to_string()));
    }

    #[test]
    fn error_records_fail_the_stream() {
        let mut decoder = NdjsonDecoder::default();

        let err = decoder.push(b"{\"error\": \"quota exceeded\"}\n").unwrap_err();
        assert!(matches!(err, BackendError::ApiError { message, .. } if message == "quota exceeded"));
    }

    #[test]
    fn malformed_record_is_a_json_error() {
        let mut decoder = NdjsonDecoder::default();

        assert!(matches!(
            decoder.push(b"not json\n"),
            Err(BackendError::JsonError(_))
        ));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = GenerationClient::new("http://localhost:8001/", None);
        assert_eq!(client.base_url, "http://localhost:8001");
    }
}
