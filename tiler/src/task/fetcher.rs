//! Single-tile HTTP fetch: URL template expansion, the GET itself, and
//! payload post-processing.

use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode, header, redirect};
use std::time::Duration;
use tiler_core::{Blob, TileCoord, TileFormat, utils::compress_gzip};

/// Fixed User-Agent sent with every tile request.
pub const USER_AGENT: &str =
	"Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Expands `{x}`, `{y}`, `{z}` and `{-y}` (the TMS row) in a URL template.
///
/// Unknown placeholders are left untouched; brace escaping is the caller's
/// concern.
pub fn expand_url(template: &str, coord: &TileCoord) -> String {
	template
		.replace("{x}", &coord.x.to_string())
		.replace("{y}", &coord.y.to_string())
		.replace("{z}", &coord.z.to_string())
		.replace("{-y}", &coord.flip_y().to_string())
}

/// A shared HTTP client for tile downloads.
///
/// Redirects are not followed; only status 200 is accepted. Vector tiles
/// (`Pbf`) are gzip-wrapped before they reach the sink, everything else is
/// stored verbatim.
pub struct Fetcher {
	client: Client,
	referer: Option<String>,
	format: TileFormat,
}

impl Fetcher {
	pub fn new(format: TileFormat, referer: Option<String>) -> Result<Fetcher> {
		let client = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(REQUEST_TIMEOUT)
			.redirect(redirect::Policy::none())
			.tcp_keepalive(Duration::from_secs(600))
			.use_rustls_tls()
			.build()
			.context("unable to build http client")?;
		Ok(Fetcher {
			client,
			referer,
			format,
		})
	}

	/// Fetches one tile body. `Ok(None)` is an empty body (a "nil tile").
	pub async fn fetch(&self, url: &str) -> Result<Option<Blob>> {
		let mut request = self.client.get(url);
		if let Some(referer) = &self.referer {
			request = request.header(header::REFERER, referer);
		}

		let response = request
			.send()
			.await
			.with_context(|| format!("request to {url} failed"))?;
		let status = response.status();
		if status != StatusCode::OK {
			bail!("unexpected status {status} from {url}");
		}

		let bytes = response
			.bytes()
			.await
			.with_context(|| format!("unable to read body from {url}"))?;
		if bytes.is_empty() {
			return Ok(None);
		}

		let blob = Blob::from(bytes.to_vec());
		if self.format == TileFormat::Pbf {
			return Ok(Some(compress_gzip(&blob)?));
		}
		Ok(Some(blob))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_coordinates() {
		let coord = TileCoord::new(2, 1, 0).unwrap();
		assert_eq!(
			expand_url("http://h/{z}/{x}/{y}.png", &coord),
			"http://h/2/1/0.png"
		);
	}

	#[test]
	fn expands_tms_row() {
		let coord = TileCoord::new(2, 1, 0).unwrap();
		assert_eq!(
			expand_url("http://h/{z}/{x}/{-y}.png", &coord),
			"http://h/2/1/3.png"
		);
	}

	#[test]
	fn repeated_and_unknown_placeholders() {
		let coord = TileCoord::new(3, 4, 5).unwrap();
		assert_eq!(
			expand_url("http://h/{z}/{x}/{y}?copy={y}&style={s}", &coord),
			"http://h/3/4/5?copy=5&style={s}"
		);
	}

	#[test]
	fn empty_template_stays_empty() {
		let coord = TileCoord::new(0, 0, 0).unwrap();
		assert_eq!(expand_url("", &coord), "");
	}
}
