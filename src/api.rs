use crate::types::{DrawRecord, LottoNumberResponse, NUMBERS_PER_DRAW};
use crate::utils::extract_latest_draw_no;
use anyhow::{Result, anyhow};
use std::time::Duration;
use tracing::{debug, warn};

/// Where draw results come from.
///
/// `fetch_draw` answers `Ok(None)` when the authority has no usable result for
/// the draw; `Err` is reserved for transport and decoding failures.
#[allow(async_fn_in_trait)]
pub trait DrawSource {
    async fn latest_index(&self) -> Result<u32>;
    async fn fetch_draw(&self, draw_no: u32) -> Result<Option<DrawRecord>>;
}

pub struct DhLotteryClient {
    client: reqwest::Client,
    base_url: String,
}

impl DhLotteryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl DrawSource for DhLotteryClient {
    async fn latest_index(&self) -> Result<u32> {
        let html = self
            .client
            .get(&self.base_url)
            .query(&[("method", "main")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        extract_latest_draw_no(&html)
            .ok_or_else(|| anyhow!("latest draw number not found on the landing page"))
    }

    async fn fetch_draw(&self, draw_no: u32) -> Result<Option<DrawRecord>> {
        let draw_param = draw_no.to_string();
        let response: LottoNumberResponse = self
            .client
            .get(&self.base_url)
            .query(&[("method", "getLottoNumber"), ("drwNo", draw_param.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.is_success() {
            debug!("draw {} reported {:?}", draw_no, response.return_value);
            return Ok(None);
        }

        let found = response.main_numbers().len();
        let record = response.into_draw_record(draw_no);
        if record.is_none() {
            warn!(
                "⚠ draw {}: could not extract {} valid main numbers (got {}), skipping",
                draw_no, NUMBERS_PER_DRAW, found
            );
        }
        Ok(record)
    }
}
