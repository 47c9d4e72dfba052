//! uplift-client: HTTP and WebSocket client library
//!
//! # Examples
//!
//! ```no_run
//! use uplift_client::HttpClient;
//! use uplift_api::requests::UpgradeRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("http://localhost:8081")?;
//!
//! let accepted = client
//!     .trigger_upgrade(&UpgradeRequest {
//!         host_id: "1".into(),
//!         component_name: "Java".into(),
//!         target_version: "11.0.12".into(),
//!         actor: "ops".into(),
//!     })
//!     .await?;
//! println!("{} {} -> {}", accepted.component_name, accepted.from_version, accepted.target_version);
//!
//! for record in client.history(Some("1")).await? {
//!     println!("{} {}", record.timestamp, record.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod ws;

pub use error::{ClientError, Result};
pub use http::HttpClient;
pub use ws::WsClient;
