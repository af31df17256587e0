//! # Auditrail Entity
//!
//! Per-type audit configuration for Auditrail. Entity settings declare
//! which properties to leave out of an audit record and which to force to
//! a fixed value. Settings exist at three precedence levels (attribute,
//! instance, global) and merge into one effective record per type; cached
//! property descriptors then map an audited object into its "audit shadow"
//! without runtime introspection.
//!
//! ## Example
//!
//! ```
//! use auditrail_entity::{DescriptorRegistry, EntityDescriptor, EntitySettings};
//! use serde_json::json;
//!
//! struct Order {
//!     id: u32,
//!     status: String,
//!     card_number: String,
//! }
//!
//! let registry = DescriptorRegistry::new();
//! registry.register(
//!     EntityDescriptor::<Order>::new("Order")
//!         .property("id", |o| o.id.into())
//!         .property("status", |o| o.status.clone().into())
//!         .property("card_number", |o| o.card_number.clone().into()),
//! );
//!
//! let settings = EntitySettings::new()
//!     .ignore("card_number")
//!     .override_property("source", "web");
//!
//! let order = Order {
//!     id: 7,
//!     status: "open".to_string(),
//!     card_number: "4111-1111".to_string(),
//! };
//! let shadow = registry.shadow(&order, Some(&settings))?;
//!
//! assert_eq!(shadow["id"], json!(7));
//! assert_eq!(shadow["source"], json!("web"));
//! assert_eq!(shadow.get("card_number"), None);
//! # Ok::<(), auditrail_entity::EntityError>(())
//! ```

mod descriptor;
mod error;
mod merge;
mod registry;
mod settings;

// Public API
pub use descriptor::{EntityDescriptor, PropertyDescriptor};
pub use error::{EntityError, Result};
pub use merge::{merge_entity_settings, SettingsMap};
pub use registry::{DescriptorRegistry, EntityAuditConfig};
pub use settings::EntitySettings;
