use std::future::Future;

use async_stream::try_stream;
use billing_client::domain::{HourlyConsumption, HourlyMarketPrice};
use futures::{Stream, StreamExt};

use crate::context::RunContext;
use crate::error::{BillingError, Result};
use crate::period::TimeRange;
use crate::sources::{PageRequest, TimeSeriesSource};

/// Reads complete time series page by page.
///
/// The loop asks for the next page until one comes back shorter than the page
/// size, so it needs no total-count from the store. Any failed page fails the
/// whole fetch; a partial range is never returned.
pub struct TimeSeriesFetcher<'a, S: ?Sized> {
    source: &'a S,
    page_size: usize,
}

impl<'a, S> TimeSeriesFetcher<'a, S>
where
    S: TimeSeriesSource + ?Sized,
{
    pub fn new(source: &'a S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    pub async fn fetch_consumption(
        &self,
        facility_id: &str,
        range: TimeRange,
        ctx: &RunContext,
    ) -> Result<Vec<HourlyConsumption>> {
        let pages = self.pages(ctx, "consumption", |page| {
            self.source.consumption_page(facility_id, range, page)
        });
        collect_pages(pages).await
    }

    pub async fn fetch_market_prices(&self, range: TimeRange, ctx: &RunContext) -> Result<Vec<HourlyMarketPrice>> {
        let pages = self.pages(ctx, "market_price", |page| self.source.market_price_page(range, page));
        collect_pages(pages).await
    }

    /// Stream of pages. Each page request is raced against the run's
    /// cancellation and deadline.
    pub fn pages<'s, T, F, Fut>(
        &'s self,
        ctx: &'s RunContext,
        series: &'static str,
        mut fetch_page: F,
    ) -> impl Stream<Item = Result<Vec<T>>> + 's
    where
        T: 's,
        F: FnMut(PageRequest) -> Fut + 's,
        Fut: Future<Output = Result<Vec<T>>> + 's,
    {
        let page_size = self.page_size;
        try_stream! {
            let mut offset: usize = 0;
            loop {
                let request = PageRequest {
                    offset: offset as i64,
                    limit: page_size as i64,
                };
                let rows = ctx.guard(fetch_page(request)).await?;
                let received = rows.len();

                metrics::counter!("fetch_pages_total", "series" => series).increment(1);
                metrics::counter!("fetch_rows_total", "series" => series).increment(received as u64);
                tracing::debug!(series, offset, received, "fetched page");

                if received > page_size {
                    Err(BillingError::DataUnavailable(format!(
                        "{series} page at offset {offset} returned {received} rows for a limit of {page_size}"
                    )))?;
                }

                yield rows;

                if received < page_size {
                    break;
                }
                offset += received;
            }
        }
    }
}

async fn collect_pages<T>(pages: impl Stream<Item = Result<Vec<T>>>) -> Result<Vec<T>> {
    futures::pin_mut!(pages);
    let mut rows = Vec::new();
    while let Some(page) = pages.next().await {
        rows.extend(page?);
    }
    Ok(rows)
}
