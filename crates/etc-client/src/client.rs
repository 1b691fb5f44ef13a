//! The external-task client: presents synchronous-looking operations
//! backed by a remote task-oriented service that may answer immediately
//! (200) or hand back a task ticket to poll (202) (§4.1).

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use pipeline_support::{correlation_id_or_new, RetryConfig};

use crate::cache::ModelSelectionCache;
use crate::config::EtcConfig;
use crate::error::{EtcError, EtcResult};
use crate::types::{
    AcceptedBody, AnalyzeFrameRequest, AnalyzeFrameResult, ClassifyRequest, ClassifyResult,
    ExtractTopicsRequest, ExtractTopicsResult, GenerateEmbeddingRequest, GenerateEmbeddingResult,
    HealthResponse, OrchestrateRequest, OrchestrateResult, SelectModelRequest, SelectModelResult,
    SentimentRequest, SentimentResult, StoreMemoryRequest, SynthesizeRequest, SynthesizeResult,
    TaskEnvelope, TaskStatus, TrackUsageRequest, TranscribeRequest, TranscribeResult,
};

/// Client for the remote AI model service.
pub struct EtcClient {
    http: Client,
    config: EtcConfig,
    cache: ModelSelectionCache,
}

impl EtcClient {
    pub fn new(config: EtcConfig) -> EtcResult<Self> {
        let http = Client::builder().timeout(config.orchestration_timeout).build()?;
        Ok(Self {
            http,
            config,
            cache: ModelSelectionCache::default(),
        })
    }

    pub fn from_env() -> EtcResult<Self> {
        Self::new(EtcConfig::from_env())
    }

    /// `GET /health` — used by WD's readiness probe (§6).
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "healthy" || h.status == "ok")
                .unwrap_or(false),
            Ok(resp) => {
                warn!("model service health check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("model service health check error: {}", e);
                false
            }
        }
    }

    pub async fn select_model(
        &self,
        task_type: &str,
        complexity: f32,
        context: serde_json::Value,
        budget: Option<f64>,
        quality_pref: &str,
        cancel: &CancellationToken,
    ) -> EtcResult<SelectModelResult> {
        if let Some(cached) = self.cache.get(task_type, complexity, quality_pref) {
            debug!("model selection cache hit for {}", task_type);
            return Ok(cached);
        }

        let req = SelectModelRequest {
            task_type: task_type.to_string(),
            complexity: complexity.clamp(0.0, 1.0),
            context,
            budget,
        };

        let result: SelectModelResult = self
            .submit_and_poll("/select-model", &req, self.config.timeout, None, cancel)
            .await
            .map_err(|e| match e {
                EtcError::TaskFailed(_, _) => EtcError::SelectionUnavailable,
                other => other,
            })?;

        self.cache.put(task_type, complexity, quality_pref, result.clone());
        Ok(result)
    }

    pub async fn analyze_frame(
        &self,
        base64_image: String,
        prompt: String,
        model_id: String,
        max_tokens: u32,
        context: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> EtcResult<AnalyzeFrameResult> {
        let req = AnalyzeFrameRequest {
            base64_image,
            prompt,
            model_id,
            max_tokens,
            context,
        };
        self.submit_and_poll("/analyze-frame", &req, self.config.timeout, None, cancel)
            .await
    }

    pub async fn transcribe(
        &self,
        base64_audio: String,
        language: Option<String>,
        model_id: String,
        enable_diarization: bool,
        cancel: &CancellationToken,
    ) -> EtcResult<TranscribeResult> {
        let req = TranscribeRequest {
            base64_audio,
            language: language.unwrap_or_else(|| "auto".to_string()),
            model_id,
            enable_diarization,
        };
        self.submit_and_poll("/transcribe", &req, self.config.timeout, None, cancel)
            .await
    }

    pub async fn synthesize(
        &self,
        sources: Vec<String>,
        format: &str,
        objective: Option<String>,
        cancel: &CancellationToken,
    ) -> EtcResult<String> {
        let req = SynthesizeRequest {
            sources,
            format: format.to_string(),
            objective,
        };
        let result: SynthesizeResult = self
            .submit_and_poll("/synthesize", &req, self.config.timeout, None, cancel)
            .await?;
        Ok(result.text)
    }

    pub async fn orchestrate(
        &self,
        goal: String,
        context: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EtcResult<serde_json::Value> {
        let req = OrchestrateRequest { goal, context };
        let result: OrchestrateResult = self
            .submit_and_poll(
                "/orchestrate",
                &req,
                self.config.orchestration_timeout,
                None,
                cancel,
            )
            .await?;
        Ok(result.output)
    }

    pub async fn classify(
        &self,
        signals: serde_json::Value,
        cancel: &CancellationToken,
    ) -> EtcResult<ClassifyResult> {
        let req = ClassifyRequest { signals };
        self.submit_and_poll("/classify", &req, self.config.timeout, None, cancel)
            .await
    }

    pub async fn extract_topics(
        &self,
        text: String,
        cancel: &CancellationToken,
    ) -> EtcResult<Vec<String>> {
        let req = ExtractTopicsRequest { text };
        let result: ExtractTopicsResult = self
            .submit_and_poll("/extract-topics", &req, self.config.timeout, None, cancel)
            .await?;
        Ok(result.topics)
    }

    pub async fn sentiment(
        &self,
        text: String,
        cancel: &CancellationToken,
    ) -> EtcResult<SentimentResult> {
        let req = SentimentRequest { text };
        self.submit_and_poll("/sentiment", &req, self.config.timeout, None, cancel)
            .await
    }

    pub async fn generate_embedding(
        &self,
        text: String,
        cancel: &CancellationToken,
    ) -> EtcResult<Vec<f32>> {
        let req = GenerateEmbeddingRequest { text };
        let result: GenerateEmbeddingResult = self
            .submit_and_poll("/generate-embedding", &req, self.config.timeout, None, cancel)
            .await?;
        Ok(result.embedding)
    }

    /// Best-effort: failures are logged, never propagated (§4.1).
    pub async fn store_memory(&self, job_id: &str, key: &str, value: serde_json::Value, cancel: &CancellationToken) {
        let req = StoreMemoryRequest {
            job_id: job_id.to_string(),
            key: key.to_string(),
            value,
        };
        if let Err(e) = self
            .submit_and_poll::<_, serde_json::Value>("/store-memory", &req, self.config.timeout, None, cancel)
            .await
        {
            warn!("store_memory best-effort call failed: {}", e);
        }
    }

    /// Best-effort: failures are logged, never propagated (§4.1).
    pub async fn track_usage(
        &self,
        job_id: &str,
        task_type: &str,
        model_id: &str,
        cost: f64,
        duration_ms: u64,
        success: bool,
        cancel: &CancellationToken,
    ) {
        let req = TrackUsageRequest {
            job_id: job_id.to_string(),
            task_type: task_type.to_string(),
            model_id: model_id.to_string(),
            cost,
            duration_ms,
            success,
        };
        if let Err(e) = self
            .submit_and_poll::<_, serde_json::Value>("/track-usage", &req, self.config.timeout, None, cancel)
            .await
        {
            warn!("track_usage best-effort call failed: {}", e);
        }
    }

    /// Submit a request and, if the service answers with a task ticket,
    /// poll it to completion.
    async fn submit_and_poll<Req, Res>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
        correlation_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> EtcResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let correlation_id = correlation_id_or_new(correlation_id);

        match self.submit::<Req, Res>(path, body, &correlation_id).await? {
            SubmitSettled::Immediate(result) => Ok(result),
            SubmitSettled::Accepted { task_id } => {
                self.poll(&task_id, timeout, &correlation_id, cancel).await
            }
        }
    }

    async fn submit<Req, Res>(
        &self,
        path: &str,
        body: &Req,
        correlation_id: &str,
    ) -> EtcResult<SubmitSettled<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let retry = RetryConfig::new(format!("etc_submit:{path}"))
            .with_base_delay(Duration::from_secs(1))
            .with_max_retries(self.config.max_retries);

        let mut attempt = 0u32;
        loop {
            let sent = self
                .http
                .post(&url)
                .header("content-type", "application/json")
                .header("x-correlation-id", correlation_id)
                .json(body)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::OK {
                        let parsed: Res = response.json().await.map_err(EtcError::Network)?;
                        return Ok(SubmitSettled::Immediate(parsed));
                    }
                    if status == StatusCode::ACCEPTED {
                        let accepted: AcceptedBody = response.json().await.map_err(EtcError::Network)?;
                        return Ok(SubmitSettled::Accepted { task_id: accepted.task_id });
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt < retry.max_retries {
                            attempt += 1;
                            let delay = retry.delay_for_attempt(attempt);
                            warn!("model service rate limited, retrying in {:?}", delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(EtcError::RateLimited(path.to_string()));
                    }
                    if status.is_server_error() {
                        if attempt < retry.max_retries {
                            attempt += 1;
                            let delay = retry.delay_for_attempt(attempt);
                            warn!(
                                "model service submit returned {}, retrying in {:?}",
                                status, delay
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(EtcError::invalid_response(format!(
                            "submit failed after retries: {}",
                            status
                        )));
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(EtcError::AuthError(format!("{}", status)));
                    }
                    // other 4xx: not retried (§4.1).
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(EtcError::invalid_response(format!(
                        "submit rejected with {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    let wrapped = EtcError::Network(e);
                    if attempt < retry.max_retries && wrapped.is_retryable() {
                        attempt += 1;
                        let delay = retry.delay_for_attempt(attempt);
                        warn!("model service submit transport error, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(wrapped);
                }
            }
        }
    }

    async fn poll<Res>(
        &self,
        task_id: &str,
        timeout: Duration,
        correlation_id: &str,
        cancel: &CancellationToken,
    ) -> EtcResult<Res>
    where
        Res: DeserializeOwned,
    {
        let deadline = Instant::now() + timeout;
        let url = format!("{}/tasks/{}", self.config.base_url, task_id);
        let mut consecutive_errors = 0u32;
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(EtcError::Cancelled);
            }
            if Instant::now() >= deadline {
                return Err(EtcError::TaskTimeout(task_id.to_string()));
            }
            if attempts >= self.config.max_poll_attempts {
                return Err(EtcError::TaskTimeout(task_id.to_string()));
            }
            attempts += 1;

            let poll_result = self
                .http
                .get(&url)
                .header("x-correlation-id", correlation_id)
                .send()
                .await;

            let outcome = match poll_result {
                Ok(response) if response.status().is_success() => {
                    match response.json::<TaskEnvelope>().await {
                        Ok(envelope) => validate_envelope(envelope),
                        Err(e) => Err(EtcError::Network(e)),
                    }
                }
                Ok(response) => Err(EtcError::invalid_response(format!(
                    "task poll returned {}",
                    response.status()
                ))),
                Err(e) => Err(EtcError::Network(e)),
            };

            match outcome {
                Ok(record) => {
                    consecutive_errors = 0;
                    match record.status {
                        TaskStatus::Completed => {
                            let value = record.result.unwrap_or(serde_json::Value::Null);
                            return serde_json::from_value(value).map_err(EtcError::Json);
                        }
                        TaskStatus::Failed => {
                            return Err(EtcError::TaskFailed(
                                task_id.to_string(),
                                record.error.unwrap_or_else(|| "task failed".to_string()),
                            ));
                        }
                        TaskStatus::Timeout => {
                            return Err(EtcError::TaskTimeout(task_id.to_string()));
                        }
                        TaskStatus::Queued | TaskStatus::Processing => {}
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        error!(
                            "model service polling failed {} times in a row for task {}: {}",
                            consecutive_errors, task_id, e
                        );
                        return Err(EtcError::invalid_response(format!(
                            "systemic polling failure after {} consecutive errors: {}",
                            consecutive_errors, e
                        )));
                    }
                    debug!("poll error for task {} (attempt {}): {}", task_id, consecutive_errors, e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = cancel.cancelled() => return Err(EtcError::Cancelled),
            }
        }
    }
}

enum SubmitSettled<Res> {
    Immediate(Res),
    Accepted { task_id: String },
}

fn validate_envelope(envelope: TaskEnvelope) -> EtcResult<crate::types::TaskRecord> {
    if !envelope.success {
        return Err(EtcError::invalid_response("envelope success=false"));
    }
    envelope
        .data
        .map(|d| d.task)
        .ok_or_else(|| EtcError::invalid_response("missing data.task"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        let client = EtcClient::new(EtcConfig::default());
        assert!(client.is_ok());
    }
}
