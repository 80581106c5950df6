use anyhow::{Context, Result};
use kwr_contracts::{
    endpoints, urls, ProgressEventDto, RoadmapExportDto, RunDetailDto, RunSummaryDto,
    SubmitRunRequest,
};
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn submit_run(&self, request: SubmitRunRequest) -> Result<RunSummaryDto> {
        let url = urls::endpoint_url(&self.base_url, endpoints::RUNS);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send run submission request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Run submission failed with status {}: {}", status, text);
        }

        response
            .json::<RunSummaryDto>()
            .await
            .context("Failed to parse run submission response")
    }

    pub async fn get_run(&self, id: &str) -> Result<RunDetailDto> {
        let url = urls::run_by_id(&self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send run status request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Run status request failed with status {}: {}", status, text);
        }

        response
            .json::<RunDetailDto>()
            .await
            .context("Failed to parse run status response")
    }

    pub async fn list_runs(&self) -> Result<Vec<RunSummaryDto>> {
        let url = urls::endpoint_url(&self.base_url, endpoints::RUNS);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send run list request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Run list request failed with status {}: {}", status, text);
        }

        response
            .json::<Vec<RunSummaryDto>>()
            .await
            .context("Failed to parse run list response")
    }

    pub async fn get_roadmap(&self, id: &str) -> Result<RoadmapExportDto> {
        let url = urls::run_roadmap(&self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send roadmap export request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Roadmap export failed with status {}: {}", status, text);
        }

        response
            .json::<RoadmapExportDto>()
            .await
            .context("Failed to parse roadmap export response")
    }

    pub async fn cancel_run(&self, id: &str) -> Result<RunSummaryDto> {
        let url = urls::endpoint_url(&self.base_url, &endpoints::run_cancel(id));

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send run cancel request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Run cancel failed with status {}: {}", status, text);
        }

        response
            .json::<RunSummaryDto>()
            .await
            .context("Failed to parse run cancel response")
    }

    pub async fn resume_run(&self, id: &str) -> Result<RunSummaryDto> {
        let url = urls::endpoint_url(&self.base_url, &endpoints::run_resume(id));

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send run resume request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Run resume failed with status {}: {}", status, text);
        }

        response
            .json::<RunSummaryDto>()
            .await
            .context("Failed to parse run resume response")
    }

    #[allow(dead_code)]
    pub async fn progress_events(&self, id: &str) -> Result<Vec<ProgressEventDto>> {
        let url = urls::endpoint_url(&self.base_url, &endpoints::run_progress(id));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send progress request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Progress request failed with status {}: {}", status, text);
        }

        response
            .json::<Vec<ProgressEventDto>>()
            .await
            .context("Failed to parse progress response")
    }

    pub async fn health_check(&self) -> Result<bool> {
        let url = urls::endpoint_url(&self.base_url, endpoints::HEALTHZ);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
