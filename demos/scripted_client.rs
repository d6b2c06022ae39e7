//! Drives the client against an in-memory transport that rejects every credential except the one
//! issued by the renewer.
//!
//! 1. Implement [`Transport`] for the in-memory service.
//! 2. Wrap an async closure in [`RenewWith`] so the gate can obtain fresh credentials.
//! 3. Build the client from a JSON [`ClientConfig`] and issue concurrent requests; the first
//!    `401` triggers one shared renewal.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use serde_json::{Value, json};
// self
use resilient_http::{
	client::Client,
	config::ClientConfig,
	error::TransportError,
	headers::{AUTHORIZATION_HEADER, Payload},
	http::{HttpMethod, RequestOptions, ResponseRecord, Transport, TransportFuture},
	renewal::{RenewWith, TokenSecret},
};

const ISSUED_TOKEN: &str = "issued-token";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::from_json_str(
		r#"{
			"base_url": "https://inventory.example.com/api/",
			"client_identifier": "inventory-demo",
			"retry": { "max_retries": 2 },
			"renewal": { "timeout_secs": 5 }
		}"#,
	)?;
	let renewals = Arc::new(AtomicUsize::new(0));
	let renewer = {
		let renewals = renewals.clone();

		RenewWith(move || {
			renewals.fetch_add(1, Ordering::SeqCst);

			async { Ok::<_, std::io::Error>(TokenSecret::new(ISSUED_TOKEN)) }
		})
	};
	let client: Client<InventoryService> =
		Client::from_config(&config, InventoryService::default(), Arc::new(renewer));
	let body = json!({ "sku": "A-100" });
	let (items, created) = tokio::join!(
		client.get::<Vec<Value>>("items", "limit=2"),
		client.post_json::<Value, _>("items", &body),
	);

	println!("Listed items: {}.", Value::from(items?));
	println!("Created item: {}.", created?);
	println!(
		"Renewals performed: {}; requests served: {}.",
		renewals.load(Ordering::SeqCst),
		client.transport.served.load(Ordering::SeqCst)
	);

	let execution = client.execute(HttpMethod::Get, "missing", Payload::None).await;

	for attempt in execution.attempts() {
		println!(
			"Attempt {} stopped at {:?} with {:?}.",
			attempt.retry_count,
			attempt.stage(),
			attempt.error_kind()
		);
	}

	Ok(())
}

/// In-memory service accepting only [`ISSUED_TOKEN`].
#[derive(Debug, Default)]
struct InventoryService {
	served: AtomicUsize,
}
impl Transport for InventoryService {
	fn perform(&self, options: RequestOptions) -> TransportFuture<'_> {
		Box::pin(async move {
			self.served.fetch_add(1, Ordering::SeqCst);

			let expected = format!("Bearer {ISSUED_TOKEN}");

			if options.header(AUTHORIZATION_HEADER) != Some(expected.as_str()) {
				return Ok::<_, TransportError>(ResponseRecord::new(401, None));
			}

			let response = match (options.method.as_str(), options.url.path()) {
				("GET", "/api/items") => ResponseRecord::new(
					200,
					Some(json!([{ "sku": "A-001" }, { "sku": "A-002" }])),
				),
				("POST", "/api/items") =>
					ResponseRecord::new(201, Some(json!({ "item": options.body, "created": true }))),
				_ => ResponseRecord::new(404, Some(json!({ "error": "not found" }))),
			};

			Ok(response)
		})
	}
}
