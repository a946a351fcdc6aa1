//! # leadbot-crm
//!
//! Outbound CRM synchronization for leadbot.
//!
//! - [`CrmSync`] - the seam the conversation engine talks to
//! - [`DisabledCrm`] - used when no CRM is configured
//! - `OdooClient` - Odoo JSON-RPC backend (feature `odoo`)

pub mod error;
#[cfg(feature = "odoo")]
pub mod odoo;
pub mod sync;

pub use error::{CrmError, Result};
#[cfg(feature = "odoo")]
pub use odoo::{OdooClient, OdooConfig};
pub use sync::{CrmAppointment, CrmLead, CrmLeadUpdate, CrmSync, DisabledCrm};
