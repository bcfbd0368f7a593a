//! Domain layer of the Showroom dialogue gateway: wire protocol, session
//! state, and the rule-based intent normalizer.
//!
//! ```
//! use showroom_core::intent::normalize_product_intent;
//! use showroom_core::record::encode_product;
//!
//! let intent = normalize_product_intent("sofa under 900", &serde_json::json!({}));
//! assert!(encode_product(&intent).starts_with("suggest=true;category=sofa;"));
//! ```

pub mod catalog;
pub mod config;
pub mod constraint;
pub mod error;
pub mod intent;
pub mod protocol;
pub mod record;
pub mod session;

// Re-export common error type
pub use error::ShowroomError;
